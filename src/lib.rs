//! # Bingo Client
//!
//! Player-side runtime for a real-time multiplayer bingo round.
//!
//! A client holds one persistent channel to the game coordinator, buys a
//! card during a fixed purchase window, records the numbers the coordinator
//! calls, and may claim a win that the coordinator arbitrates.
//!
//! ## Layout
//!
//! - [`session::Session`]: the state machine. Runtime-free and fully
//!   testable without I/O.
//! - [`ledger`], [`registry`], [`timer`], [`card`]: the pieces the session
//!   is built from.
//! - [`protocol`]: wire messages, one JSON object per frame tagged by `type`.
//! - [`Transport`]: the channel abstraction; `WebSocketTransport` ships
//!   behind the default `transport-websocket` feature.
//! - `BingoClient` (feature `tokio-runtime`): runs a session over a transport
//!   on a single event loop and publishes snapshots and [`BingoEvent`]s.

pub mod card;
pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod timer;
pub mod transport;
pub mod transports;

#[cfg(feature = "tokio-runtime")]
pub mod client;

pub use config::{BingoConfig, LaunchParams};
pub use error::{BingoError, ProtocolViolation};
pub use event::BingoEvent;
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{Phase, Session, SessionSnapshot};
pub use transport::Transport;

#[cfg(feature = "tokio-runtime")]
pub use client::BingoClient;

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
