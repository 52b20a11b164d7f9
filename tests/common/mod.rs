#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for bingo client integration tests.
//!
//! Provides a scripted [`MockTransport`] and helpers that build coordinator
//! frames the way the server sends them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bingo_client::card::{Cell, Grid, FREE_CELL, GRID_SIZE};
use bingo_client::config::{BingoConfig, LaunchParams};
use bingo_client::protocol::ServerMessage;
use bingo_client::{BingoError, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// Scripted server frames are consumed in order by `recv()`; everything the
/// client sends is recorded in `sent`.
pub struct MockTransport {
    incoming: VecDeque<Option<Result<String, BingoError>>>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(
        incoming: Vec<Option<Result<String, BingoError>>>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), BingoError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, BingoError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // Script exhausted: stay open until shutdown.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), BingoError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn launch() -> LaunchParams {
    LaunchParams::new(5, 1, 1001).unwrap()
}

pub fn config() -> BingoConfig {
    BingoConfig::new(launch())
}

/// A valid card: column `c` holds `15c+1 ..= 15c+5`, centre free.
pub fn sample_grid() -> Grid {
    let mut columns = [[Cell::Free; GRID_SIZE]; GRID_SIZE];
    for (c, column) in columns.iter_mut().enumerate() {
        for (r, cell) in column.iter_mut().enumerate() {
            if (c, r) != FREE_CELL {
                *cell = Cell::Number((c * 15 + r + 1) as u8);
            }
        }
    }
    Grid::from_columns(columns)
}

// ── JSON frame helpers ──────────────────────────────────────────────

pub fn card_json(balance: f64) -> String {
    serde_json::to_string(&ServerMessage::Card {
        card: sample_grid(),
        balance,
        card_id: None,
    })
    .unwrap()
}

pub fn taken_json(card_id: u32) -> String {
    format!(r#"{{"type":"taken","card_id":{card_id}}}"#)
}

pub fn number_json(value: i64) -> String {
    format!(r#"{{"type":"number","value":{value}}}"#)
}

pub fn banned_json() -> String {
    r#"{"type":"banned"}"#.to_string()
}

pub fn winner_json(names: &str, amount: f64) -> String {
    serde_json::to_string(&ServerMessage::Winner {
        names: names.into(),
        amount,
    })
    .unwrap()
}

pub fn error_json(msg: &str) -> String {
    serde_json::to_string(&ServerMessage::Error { msg: msg.into() }).unwrap()
}
