//! Async client that runs one bingo session over a [`Transport`].
//!
//! [`BingoClient`] is a thin handle. A background transport loop owns the
//! [`Session`] outright and is the only place it is mutated; the handle sends
//! intents to it over an unbounded MPSC channel. The loop publishes a fresh
//! [`SessionSnapshot`] on a `watch` channel after every change and emits
//! [`BingoEvent`]s on a bounded channel returned from [`BingoClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let launch = LaunchParams::from_query("room=10&game_id=3", player_id)?;
//! let (client, mut events) = BingoClient::connect(DEFAULT_SERVER_URL, BingoConfig::new(launch)).await?;
//!
//! client.purchase(42)?;
//! while let Some(event) = events.recv().await {
//!     match event {
//!         BingoEvent::NumberCalled { number } => println!("{number}"),
//!         BingoEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::config::BingoConfig;
use crate::error::{BingoError, Result};
use crate::event::BingoEvent;
use crate::protocol::{CardId, ClientMessage, ServerMessage};
use crate::session::{Session, SessionSnapshot};
use crate::transport::Transport;

/// Player actions forwarded from the handle to the transport loop.
#[derive(Debug, Clone, Copy)]
enum Intent {
    Purchase(CardId),
    ClaimBingo,
    ToggleMark { column: usize, row: usize },
    DismissWinner,
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to a running bingo session.
///
/// Intent methods queue the action and return immediately. Whether it is
/// legal is decided by the session inside the loop; illegal intents are
/// dropped there without reaching the coordinator.
pub struct BingoClient {
    cmd_tx: mpsc::UnboundedSender<Intent>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    connected: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl BingoClient {
    /// Start the transport loop and return a handle plus event receiver.
    ///
    /// The purchase countdown starts immediately.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        config: BingoConfig,
    ) -> (Self, mpsc::Receiver<BingoEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Intent>();
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<BingoEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let session = Session::from_config(&config);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
        let connected = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(transport_loop(
            transport,
            session,
            LoopTiming {
                tick_interval: config.tick_interval,
                winner_display: config.winner_display,
            },
            LoopChannels {
                cmd_rx,
                event_tx,
                snapshot_tx,
                shutdown_rx,
                connected: Arc::clone(&connected),
            },
        ));

        let client = Self {
            cmd_tx,
            snapshot_rx,
            connected,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    /// Connect to the coordinator over WebSocket and start the session.
    ///
    /// The channel URL is built from `base_url` and the launch parameters;
    /// the handshake is bounded by [`BingoConfig::connect_timeout`].
    ///
    /// # Errors
    ///
    /// [`BingoError::InvalidLaunchParams`] if `base_url` is not a WebSocket
    /// URL, or any error
    /// [`WebSocketTransport::connect`](crate::WebSocketTransport::connect)
    /// returns.
    #[cfg(feature = "transport-websocket")]
    pub async fn connect(
        base_url: &str,
        config: BingoConfig,
    ) -> Result<(Self, mpsc::Receiver<BingoEvent>)> {
        let channel = config.launch.channel_url(base_url)?;
        let transport =
            crate::transports::WebSocketTransport::connect(&channel, config.connect_timeout)
                .await?;
        Ok(Self::start(transport, config))
    }

    // ── Intents ─────────────────────────────────────────────────────

    /// Ask to buy the given card.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::NotConnected`] if the loop has exited.
    pub fn purchase(&self, card_id: CardId) -> Result<()> {
        self.send(Intent::Purchase(card_id))
    }

    /// Claim bingo.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::NotConnected`] if the loop has exited.
    pub fn claim_bingo(&self) -> Result<()> {
        self.send(Intent::ClaimBingo)
    }

    /// Toggle the local mark on a cell of our card.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::NotConnected`] if the loop has exited.
    pub fn toggle_mark(&self, column: usize, row: usize) -> Result<()> {
        self.send(Intent::ToggleMark { column, row })
    }

    /// Hide the winner popup before its timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::NotConnected`] if the loop has exited.
    pub fn dismiss_winner(&self) -> Result<()> {
        self.send(Intent::DismissWinner)
    }

    // ── State accessors ─────────────────────────────────────────────

    /// The latest published state of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// A receiver that wakes on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Returns `true` while the transport loop is running.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Close the transport and stop the loop.
    ///
    /// The loop gets the configured shutdown timeout to close gracefully and
    /// emit `Disconnected`; after that it is aborted.
    pub async fn shutdown(&mut self) {
        debug!("BingoClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("transport loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("transport loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("transport loop aborted: {join_err}");
                    }
                }
            }
        }

        self.connected.store(false, Ordering::Release);
    }

    fn send(&self, intent: Intent) -> Result<()> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(BingoError::NotConnected);
        }
        self.cmd_tx
            .send(intent)
            .map_err(|_| BingoError::NotConnected)
    }
}

impl std::fmt::Debug for BingoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BingoClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for BingoClient {
    fn drop(&mut self) {
        // No executor is available to drive a graceful close here.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

struct LoopTiming {
    tick_interval: Duration,
    winner_display: Duration,
}

struct LoopChannels {
    cmd_rx: mpsc::UnboundedReceiver<Intent>,
    event_tx: mpsc::Sender<BingoEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    shutdown_rx: oneshot::Receiver<()>,
    connected: Arc<AtomicBool>,
}

/// The session's single event loop.
///
/// Inbound frames, intents, countdown ticks and the winner popup deadline are
/// handled one at a time, so every session mutation is atomic with respect
/// to the others. Exits on shutdown, handle drop, or transport failure.
async fn transport_loop(
    mut transport: impl Transport,
    mut session: Session,
    timing: LoopTiming,
    channels: LoopChannels,
) {
    let LoopChannels {
        mut cmd_rx,
        event_tx,
        snapshot_tx,
        mut shutdown_rx,
        connected,
    } = channels;

    debug!(
        game_id = session.launch().game_id,
        player_id = session.launch().player_id,
        "transport loop started"
    );
    emit_event(&event_tx, BingoEvent::Connected).await;

    let mut next_tick: Option<Instant> = Some(Instant::now() + timing.tick_interval);
    let mut dismiss_at: Option<Instant> = None;

    let reason = loop {
        tokio::select! {
            // Branch 1: player intent from the handle
            cmd = cmd_rx.recv() => {
                let Some(intent) = cmd else {
                    debug!("command channel closed, shutting down transport loop");
                    let _ = transport.close().await;
                    break Some("client shut down".to_string());
                };
                let (outbound, events) = apply_intent(&mut session, intent, &mut dismiss_at);
                if let Some(msg) = outbound {
                    if let Err(e) = send_message(&mut transport, &msg).await {
                        error!("transport send error: {e}");
                        break Some(format!("transport send error: {e}"));
                    }
                }
                publish(&snapshot_tx, &session);
                emit_all(&event_tx, events).await;
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                break Some("client shut down".to_string());
            }

            // Branch 3: inbound frame from the coordinator
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(msg) => {
                            debug!(kind = msg.kind(), "received server message");
                            let events = session.apply(msg);
                            if events.iter().any(|e| matches!(e, BingoEvent::Winner(_))) {
                                dismiss_at = Some(Instant::now() + timing.winner_display);
                            }
                            publish(&snapshot_tx, &session);
                            emit_all(&event_tx, events).await;
                        }
                        Err(e) => {
                            warn!("failed to deserialize server message: {e} — raw: {text}");
                        }
                    },
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        break Some(format!("transport receive error: {e}"));
                    }
                    None => {
                        debug!("transport closed by server");
                        break None;
                    }
                }
            }

            // Branch 4: purchase countdown
            _ = sleep_until_due(next_tick), if next_tick.is_some() => {
                let events = session.tick();
                next_tick = if events.is_empty() {
                    None
                } else {
                    next_tick.map(|at| at + timing.tick_interval)
                };
                publish(&snapshot_tx, &session);
                emit_all(&event_tx, events).await;
            }

            // Branch 5: winner popup timeout
            _ = sleep_until_due(dismiss_at), if dismiss_at.is_some() => {
                dismiss_at = None;
                if session.dismiss_winner() {
                    publish(&snapshot_tx, &session);
                    emit_event(&event_tx, BingoEvent::WinnerDismissed).await;
                }
            }
        }
    };

    let events = session.terminate();
    publish(&snapshot_tx, &session);
    emit_all(&event_tx, events).await;
    emit_disconnected(&event_tx, &connected, reason).await;
    debug!("transport loop exited");
}

/// Run one intent against the session. Returns the outbound message, if
/// any, and the events to report.
fn apply_intent(
    session: &mut Session,
    intent: Intent,
    dismiss_at: &mut Option<Instant>,
) -> (Option<ClientMessage>, Vec<BingoEvent>) {
    match intent {
        Intent::Purchase(card_id) => match session.purchase(card_id) {
            Some(msg) => (Some(msg), vec![BingoEvent::PurchaseRequested { card_id }]),
            None => (None, Vec::new()),
        },
        Intent::ClaimBingo => match session.claim_bingo() {
            Some(msg) => (Some(msg), vec![BingoEvent::ClaimSubmitted]),
            None => (None, Vec::new()),
        },
        Intent::ToggleMark { column, row } => {
            session.toggle_mark(column, row);
            (None, Vec::new())
        }
        Intent::DismissWinner => {
            *dismiss_at = None;
            if session.dismiss_winner() {
                (None, vec![BingoEvent::WinnerDismissed])
            } else {
                (None, Vec::new())
            }
        }
    }
}

async fn send_message(transport: &mut impl Transport, msg: &ClientMessage) -> Result<()> {
    let json = serde_json::to_string(msg)?;
    debug!(%json, "sending client message");
    transport.send(json).await
}

async fn sleep_until_due(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn publish(snapshot_tx: &watch::Sender<SessionSnapshot>, session: &Session) {
    snapshot_tx.send_replace(session.snapshot());
}

async fn emit_all(event_tx: &mpsc::Sender<BingoEvent>, events: Vec<BingoEvent>) {
    for event in events {
        emit_event(event_tx, event).await;
    }
}

/// Emit an event. If the channel is full, log a warning and drop the event
/// rather than stall the loop.
async fn emit_event(event_tx: &mpsc::Sender<BingoEvent>, event: BingoEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit `Disconnected` and mark the handle disconnected.
///
/// Uses a blocking `send` because `Disconnected` is always the last event and
/// must never be dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<BingoEvent>,
    connected: &AtomicBool,
    reason: Option<String>,
) {
    connected.store(false, Ordering::Release);
    if event_tx
        .send(BingoEvent::Disconnected { reason })
        .await
        .is_err()
    {
        debug!("event channel closed, receiver dropped");
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
    use crate::config::LaunchParams;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Transport that never delivers anything and records what is sent.
    struct SilentTransport {
        sent: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for SilentTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), BingoError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, BingoError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), BingoError> {
            Ok(())
        }
    }

    fn config() -> BingoConfig {
        BingoConfig::new(LaunchParams::new(5, 1, 1001).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn intents_are_serialized_through_the_loop() {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let transport = SilentTransport {
            sent: Arc::clone(&sent),
        };
        let (mut client, mut events) = BingoClient::start(transport, config());
        assert_eq!(events.recv().await, Some(BingoEvent::Connected));

        client.purchase(42).unwrap();
        client.purchase(42).unwrap();
        assert_eq!(
            events.recv().await,
            Some(BingoEvent::PurchaseRequested { card_id: 42 })
        );

        assert_eq!(
            sent.lock().unwrap().as_slice(),
            [r#"{"type":"buy","card_id":42}"#.to_string()]
        );
        assert_eq!(client.snapshot().pending_purchase, Some(42));

        client.shutdown().await;
        assert!(!client.is_connected());
        assert!(matches!(
            client.claim_bingo(),
            Err(BingoError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn debug_shows_connection_state() {
        let transport = SilentTransport {
            sent: Arc::new(StdMutex::new(Vec::new())),
        };
        let (mut client, _events) = BingoClient::start(transport, config());
        let debug = format!("{client:?}");
        assert!(debug.contains("connected: true"));
        client.shutdown().await;
    }
}
