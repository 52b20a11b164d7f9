//! Events delivered to the projection layer.

use crate::card::Card;
use crate::ledger::CalledNumber;
use crate::protocol::CardId;
use crate::session::{Phase, WinnerAnnouncement};

/// Something the player should see change.
///
/// Events are notifications only. The authoritative view is the
/// [`SessionSnapshot`](crate::session::SessionSnapshot) published alongside.
#[derive(Debug, Clone, PartialEq)]
pub enum BingoEvent {
    /// The transport loop is running.
    Connected,
    /// One countdown tick of the purchase window elapsed.
    CountdownTick { remaining: u32 },
    /// The session moved to a new phase.
    PhaseChanged { phase: Phase },
    /// A buy request left for the coordinator.
    PurchaseRequested { card_id: CardId },
    /// A win claim left for the coordinator.
    ClaimSubmitted,
    /// The coordinator confirmed our card.
    CardAssigned { card: Card, balance: f64 },
    /// Another player took a card.
    CardTaken { card_id: CardId },
    /// A number was called and recorded.
    NumberCalled { number: CalledNumber },
    /// The local player is disqualified for this round.
    Banned,
    /// The round ended with a winner.
    Winner(WinnerAnnouncement),
    /// The winner popup was hidden, by timeout or by the player.
    WinnerDismissed,
    /// A non-fatal message from the coordinator.
    ServerError { message: String },
    /// The transport loop has exited. Always the last event.
    Disconnected { reason: Option<String> },
}
