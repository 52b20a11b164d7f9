//! Countdown that closes the purchase window.
//!
//! The timer is driven by ticks alone. It knows nothing about cards or
//! the session phase, and it reports the close exactly once.

/// Ticks in the purchase window unless configured otherwise.
pub const DEFAULT_PURCHASE_TICKS: u32 = 20;

/// Result of advancing the countdown by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// The window is still open with `remaining` ticks left.
    Running { remaining: u32 },
    /// This tick closed the window. Reported once.
    Closed,
    /// The window closed on an earlier tick.
    Expired,
}

#[derive(Debug, Clone)]
pub struct PhaseTimer {
    remaining: u32,
    closed: bool,
}

impl PhaseTimer {
    pub fn new(ticks: u32) -> Self {
        Self {
            remaining: ticks,
            closed: false,
        }
    }

    /// Ticks left before the window closes.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Advance by one tick.
    pub fn tick(&mut self) -> Countdown {
        if self.closed {
            return Countdown::Expired;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.closed = true;
            Countdown::Closed
        } else {
            Countdown::Running {
                remaining: self.remaining,
            }
        }
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new(DEFAULT_PURCHASE_TICKS)
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

    #[test]
    fn closes_exactly_once_on_the_twentieth_tick() {
        let mut timer = PhaseTimer::default();
        for tick in 1..DEFAULT_PURCHASE_TICKS {
            assert_eq!(
                timer.tick(),
                Countdown::Running {
                    remaining: DEFAULT_PURCHASE_TICKS - tick
                },
                "tick {tick}"
            );
            assert!(!timer.is_closed());
        }
        assert_eq!(timer.tick(), Countdown::Closed);
        assert!(timer.is_closed());
        assert_eq!(timer.remaining(), 0);

        for _ in 0..5 {
            assert_eq!(timer.tick(), Countdown::Expired);
        }
    }

    #[test]
    fn zero_length_window_closes_on_first_tick() {
        let mut timer = PhaseTimer::new(0);
        assert_eq!(timer.tick(), Countdown::Closed);
        assert_eq!(timer.tick(), Countdown::Expired);
    }
}
