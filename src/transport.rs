//! Transport abstraction for the bingo coordination channel.
//!
//! The [`Transport`] trait is a bidirectional text message channel between
//! the client and the coordinator. Every frame is one JSON object, so each
//! implementation handles framing internally (WebSocket frames, a test
//! script, ...).
//!
//! Connection setup is not part of this trait. Build a connected transport
//! for the channel URL from
//! [`LaunchParams::channel_url`](crate::config::LaunchParams::channel_url),
//! then hand it to `BingoClient::start`.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use bingo_client::error::BingoError;
//! use bingo_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), BingoError> {
//!         unimplemented!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, BingoError>> {
//!         // Return None when the connection is closed cleanly
//!         unimplemented!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), BingoError> {
//!         unimplemented!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::BingoError;

/// A bidirectional text message transport.
///
/// Frames must be yielded by [`recv`](Transport::recv) in the order they
/// arrived. The protocol has no sequence numbers, so arrival order is the
/// only ordering the session ever sees.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because it is polled
/// inside `tokio::select!`. Dropping a pending `recv` must not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one JSON text message.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::TransportSend`] if the message could not be sent.
    async fn send(&mut self, message: String) -> Result<(), BingoError>;

    /// Receive the next JSON text message.
    ///
    /// Returns:
    /// - `Some(Ok(text))` — a complete message was received
    /// - `Some(Err(e))` — a transport error occurred
    /// - `None` — the connection was closed cleanly
    async fn recv(&mut self) -> Option<Result<String, BingoError>>;

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release resources.
    async fn close(&mut self) -> Result<(), BingoError>;
}
