//! Wire-compatible message types for the bingo coordination channel.
//!
//! Every frame is a single UTF-8 JSON object whose `type` field selects the
//! variant. Field names match the coordinator's JSON exactly (`card_id`,
//! `msg`, `names`, ...), so the enums below serialize with an internal
//! `type` tag rather than the adjacent `type`/`data` layout.

use serde::{Deserialize, Serialize};

use crate::card::Grid;

// ── Type aliases ────────────────────────────────────────────────────

/// Identifier of a card in the coordinator's pool (`1..=pool size`).
pub type CardId = u32;

/// Identifier of one round.
pub type GameId = i64;

/// Stable identifier of the connecting player, supplied by the identity provider.
pub type PlayerId = i64;

/// Stake tier of the room the round is played in.
pub type Stake = u32;

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask to own the given card for this round.
    Buy { card_id: CardId },
    /// Claim a win. Arbitration is entirely the coordinator's.
    Bingo,
}

/// Message types sent from coordinator to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Card assignment confirming a purchase, with the updated balance.
    Card {
        card: Grid,
        balance: f64,
        /// Not every coordinator echoes the id back; the pending purchase
        /// fills the gap when it is absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        card_id: Option<CardId>,
    },
    /// Another player now owns this card.
    Taken { card_id: CardId },
    /// A number was called. Kept wide so out-of-range values reach the
    /// ledger instead of failing the whole frame.
    Number { value: i64 },
    /// The local player is disqualified for the rest of the round.
    Banned,
    /// The round is over.
    Winner { names: String, amount: f64 },
    /// Non-fatal error to show to the player.
    Error { msg: String },
}

impl ServerMessage {
    /// Wire name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Card { .. } => "card",
            Self::Taken { .. } => "taken",
            Self::Number { .. } => "number",
            Self::Banned => "banned",
            Self::Winner { .. } => "winner",
            Self::Error { .. } => "error",
        }
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
    fn buy_serializes_flat_with_type_tag() {
        let json = serde_json::to_value(ClientMessage::Buy { card_id: 42 }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "buy", "card_id": 42 }));
    }

    #[test]
    fn bingo_serializes_as_bare_tag() {
        let json = serde_json::to_value(ClientMessage::Bingo).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "bingo" }));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = serde_json::from_str::<ServerMessage>(r#"{"type":"jackpot"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn kind_matches_wire_tag() {
        let msg = ServerMessage::Error { msg: "nope".into() };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], msg.kind());
    }
}
