//! Append-only record of the numbers called this round.

use std::fmt;

use serde::Serialize;

use crate::card::Letter;
use crate::error::ProtocolViolation;

/// Number of entries in the recent-calls strip.
pub const RECENT_CALLS: usize = 4;

/// Highest number the coordinator can call.
pub const MAX_NUMBER: u8 = 75;

/// A number in 1..=75, displayed with its letter (`B7`, `I22`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CalledNumber(u8);

impl CalledNumber {
    /// Validate a raw wire value.
    pub fn new(value: i64) -> Result<Self, ProtocolViolation> {
        match u8::try_from(value) {
            Ok(n @ 1..=MAX_NUMBER) => Ok(Self(n)),
            _ => Err(ProtocolViolation::NumberOutOfRange(value)),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn letter(self) -> Letter {
        // The constructor guarantees the range, so `of` always matches.
        Letter::of(i64::from(self.0)).unwrap_or(Letter::O)
    }
}

impl fmt::Display for CalledNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter(), self.0)
    }
}

/// Map a raw number to its letter bucket.
pub fn bucket_of(number: i64) -> Option<Letter> {
    Letter::of(number)
}

/// Ordered, duplicate-free sequence of called numbers.
///
/// Arrival order is the only order kept. The ledger refuses duplicates and
/// out-of-range values rather than trusting the coordinator blindly.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    calls: Vec<CalledNumber>,
    /// Bit `n` is set once `n` has been called.
    seen: u128,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a called number.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolViolation`] and leaves the ledger unchanged when the
    /// value is outside 1..=75 or was already called.
    pub fn record(&mut self, value: i64) -> Result<CalledNumber, ProtocolViolation> {
        let number = CalledNumber::new(value)?;
        let bit = 1u128 << number.value();
        if self.seen & bit != 0 {
            return Err(ProtocolViolation::DuplicateNumber(number.value()));
        }
        self.seen |= bit;
        self.calls.push(number);
        Ok(number)
    }

    pub fn contains(&self, number: u8) -> bool {
        number <= MAX_NUMBER && self.seen & (1u128 << number) != 0
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// All calls in arrival order.
    pub fn calls(&self) -> &[CalledNumber] {
        &self.calls
    }

    pub fn last(&self) -> Option<CalledNumber> {
        self.calls.last().copied()
    }

    /// The last `k` calls, most recent first.
    pub fn recent(&self, k: usize) -> Vec<CalledNumber> {
        self.calls.iter().rev().take(k).copied().collect()
    }

    /// Calls under one letter, in arrival order.
    pub fn called_under(&self, letter: Letter) -> impl Iterator<Item = CalledNumber> + '_ {
        self.calls.iter().copied().filter(move |n| n.letter() == letter)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn values(calls: &[CalledNumber]) -> Vec<u8> {
        calls.iter().map(|n| n.value()).collect()
    }

    #[test]
    fn keeps_arrival_order_not_numeric_order() {
        let mut ledger = Ledger::new();
        for n in [40, 3, 75, 16] {
            ledger.record(n).unwrap();
        }
        assert_eq!(values(ledger.calls()), vec![40, 3, 75, 16]);
        assert_eq!(ledger.last().map(CalledNumber::value), Some(16));
    }

    #[test]
    fn duplicate_is_rejected_without_mutation() {
        let mut ledger = Ledger::new();
        ledger.record(9).unwrap();
        let err = ledger.record(9).unwrap_err();
        assert_eq!(err, ProtocolViolation::DuplicateNumber(9));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn out_of_range_is_rejected_without_mutation() {
        let mut ledger = Ledger::new();
        for bad in [0, 76, -3, 300, i64::MAX] {
            assert_eq!(
                ledger.record(bad).unwrap_err(),
                ProtocolViolation::NumberOutOfRange(bad)
            );
        }
        assert!(ledger.is_empty());
        assert!(!ledger.contains(0));
        assert!(!ledger.contains(200));
    }

    #[test]
    fn recent_is_capped_and_most_recent_first() {
        let mut ledger = Ledger::new();
        assert!(ledger.recent(RECENT_CALLS).is_empty());

        for n in 1..=10 {
            ledger.record(n).unwrap();
            let recent = ledger.recent(RECENT_CALLS);
            assert!(recent.len() <= RECENT_CALLS);
            assert_eq!(recent[0].value() as i64, n);
            assert!(recent.windows(2).all(|w| w[0] > w[1]));
        }
        assert_eq!(values(&ledger.recent(RECENT_CALLS)), vec![10, 9, 8, 7]);
    }

    #[test]
    fn displays_with_letter_prefix() {
        assert_eq!(CalledNumber::new(7).unwrap().to_string(), "B7");
        assert_eq!(CalledNumber::new(22).unwrap().to_string(), "I22");
        assert_eq!(CalledNumber::new(45).unwrap().to_string(), "N45");
        assert_eq!(CalledNumber::new(46).unwrap().to_string(), "G46");
        assert_eq!(CalledNumber::new(75).unwrap().to_string(), "O75");
        assert_eq!(bucket_of(31), Some(Letter::N));
    }

    #[test]
    fn called_under_filters_by_letter() {
        let mut ledger = Ledger::new();
        for n in [2, 20, 14, 70] {
            ledger.record(n).unwrap();
        }
        assert_eq!(
            ledger.called_under(Letter::B).map(|n| n.value()).collect::<Vec<_>>(),
            vec![2, 14]
        );
        assert!(ledger.contains(70));
        assert!(!ledger.contains(71));
    }
}
