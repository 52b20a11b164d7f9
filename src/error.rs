//! Error types for the bingo client.

use thiserror::Error;

use crate::protocol::CardId;

/// Errors that can occur when using the bingo client.
#[derive(Debug, Error)]
pub enum BingoError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The session loop has exited, so intents can no longer be delivered.
    #[error("not connected to server")]
    NotConnected,

    /// The launch parameters handed over by the room selector are unusable.
    #[error("invalid launch parameters: {0}")]
    InvalidLaunchParams(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for bingo client operations.
pub type Result<T> = std::result::Result<T, BingoError>;

/// An inbound message that contradicts what the session already knows.
///
/// These never surface to the player. The session logs them and leaves its
/// state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// The coordinator announced a number that was already called this round.
    #[error("number {0} was already called")]
    DuplicateNumber(u8),

    /// The coordinator announced a number outside 1..=75.
    #[error("number {0} is outside the 1..=75 call range")]
    NumberOutOfRange(i64),

    /// A second card assignment arrived after the first one was accepted.
    #[error("card already assigned (held {held:?}, offered {offered:?})")]
    DuplicateAssignment {
        /// Id of the card already owned.
        held: Option<CardId>,
        /// Id carried by the rejected assignment.
        offered: Option<CardId>,
    },

    /// The assigned grid does not follow the B-I-N-G-O column layout.
    #[error("malformed card grid: {0}")]
    MalformedCard(String),
}
