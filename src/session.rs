//! The session state machine.
//!
//! [`Session`] owns everything this client knows about the round: phase,
//! ban flag, balance, the called-number [`Ledger`], the [`CardRegistry`] and
//! the winner announcement. Inbound messages go through [`Session::apply`],
//! player intents through [`Session::purchase`] and [`Session::claim_bingo`],
//! and countdown ticks through [`Session::tick`]. None of these block or
//! fail; illegal input is logged and dropped.
//!
//! The projection layer reads [`SessionSnapshot`]s and never touches the
//! session directly.

use serde::Serialize;
use tracing::{debug, warn};

use crate::card::Card;
use crate::config::{BingoConfig, LaunchParams};
use crate::event::BingoEvent;
use crate::ledger::{CalledNumber, Ledger, RECENT_CALLS};
use crate::protocol::{CardId, ClientMessage, GameId, PlayerId, ServerMessage, Stake};
use crate::registry::CardRegistry;
use crate::timer::{Countdown, PhaseTimer};

/// Where the round stands from this client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The purchase window is open.
    Buying,
    /// Numbers are being called.
    Playing,
    /// A winner was announced or the channel failed. Terminal.
    Ended,
}

/// The coordinator's end-of-round broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinnerAnnouncement {
    pub names: String,
    pub amount: f64,
}

impl WinnerAnnouncement {
    /// Prize amount with two decimals, e.g. `120.50`.
    pub fn amount_display(&self) -> String {
        format!("{:.2}", self.amount)
    }
}

/// Read-only view of a [`Session`] for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub room: Stake,
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub phase: Phase,
    /// Ticks left in the purchase window.
    pub countdown: u32,
    pub balance: Option<f64>,
    /// Called numbers in arrival order.
    pub called: Vec<CalledNumber>,
    /// Up to four most recent calls, newest first.
    pub recent: Vec<CalledNumber>,
    /// Cards owned by other players, ascending.
    pub taken: Vec<CardId>,
    pub card: Option<Card>,
    pub pending_purchase: Option<CardId>,
    pub banned: bool,
    pub claim_outstanding: bool,
    pub winner: Option<WinnerAnnouncement>,
    pub winner_visible: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    launch: LaunchParams,
    phase: Phase,
    timer: PhaseTimer,
    banned: bool,
    balance: Option<f64>,
    ledger: Ledger,
    registry: CardRegistry,
    winner: Option<WinnerAnnouncement>,
    winner_visible: bool,
    claim_outstanding: bool,
}

impl Session {
    /// A fresh session in the buying phase with default timing and pool size.
    pub fn new(launch: LaunchParams) -> Self {
        Self::from_config(&BingoConfig::new(launch))
    }

    pub fn from_config(config: &BingoConfig) -> Self {
        Self {
            launch: config.launch.clone(),
            phase: Phase::Buying,
            timer: PhaseTimer::new(config.purchase_ticks),
            banned: false,
            balance: None,
            ledger: Ledger::new(),
            registry: CardRegistry::new(config.card_pool_size),
            winner: None,
            winner_visible: false,
            claim_outstanding: false,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn launch(&self) -> &LaunchParams {
        &self.launch
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_banned(&self) -> bool {
        self.banned
    }

    pub fn balance(&self) -> Option<f64> {
        self.balance
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    pub fn winner(&self) -> Option<&WinnerAnnouncement> {
        self.winner.as_ref()
    }

    pub fn is_winner_visible(&self) -> bool {
        self.winner_visible
    }

    pub fn is_claim_outstanding(&self) -> bool {
        self.claim_outstanding
    }

    pub fn countdown(&self) -> u32 {
        self.timer.remaining()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            room: self.launch.room,
            game_id: self.launch.game_id,
            player_id: self.launch.player_id,
            phase: self.phase,
            countdown: self.timer.remaining(),
            balance: self.balance,
            called: self.ledger.calls().to_vec(),
            recent: self.ledger.recent(RECENT_CALLS),
            taken: self.registry.taken().collect(),
            card: self.registry.my_card().cloned(),
            pending_purchase: self.registry.pending(),
            banned: self.banned,
            claim_outstanding: self.claim_outstanding,
            winner: self.winner.clone(),
            winner_visible: self.winner_visible,
        }
    }

    // ── Inbound ─────────────────────────────────────────────────────

    /// Apply one inbound message, in delivery order.
    ///
    /// Returns the events the projection should hear about; an empty vector
    /// means the message was ignored.
    pub fn apply(&mut self, msg: ServerMessage) -> Vec<BingoEvent> {
        match msg {
            ServerMessage::Card {
                card,
                balance,
                card_id,
            } => match self.registry.on_assigned(card_id, card) {
                Ok(card) => {
                    debug!(card_id = ?card.id, balance, "card assigned");
                    let card = card.clone();
                    self.balance = Some(balance);
                    vec![BingoEvent::CardAssigned { card, balance }]
                }
                Err(violation) => {
                    warn!(%violation, "ignoring card assignment");
                    Vec::new()
                }
            },

            ServerMessage::Taken { card_id } => {
                if self.registry.on_taken(card_id) {
                    vec![BingoEvent::CardTaken { card_id }]
                } else {
                    debug!(card_id, "taken notice needs no update");
                    Vec::new()
                }
            }

            // Late calls after the round ended are still recorded so the
            // board stays complete.
            ServerMessage::Number { value } => match self.ledger.record(value) {
                Ok(number) => {
                    debug!(%number, called = self.ledger.len(), "number called");
                    vec![BingoEvent::NumberCalled { number }]
                }
                Err(violation) => {
                    warn!(%violation, "ignoring called number");
                    Vec::new()
                }
            },

            ServerMessage::Banned => {
                if self.banned {
                    debug!("already banned");
                    return Vec::new();
                }
                if self.phase == Phase::Ended {
                    warn!("ban arrived after the round ended; ignoring");
                    return Vec::new();
                }
                self.banned = true;
                self.claim_outstanding = false;
                debug!("session banned for the rest of the round");
                vec![BingoEvent::Banned]
            }

            ServerMessage::Winner { names, amount } => {
                if self.phase == Phase::Ended {
                    warn!(%names, "winner arrived after the round ended; ignoring");
                    return Vec::new();
                }
                let announcement = WinnerAnnouncement { names, amount };
                debug!(
                    names = %announcement.names,
                    amount = %announcement.amount_display(),
                    "round won"
                );
                self.phase = Phase::Ended;
                self.claim_outstanding = false;
                self.winner = Some(announcement.clone());
                self.winner_visible = true;
                vec![
                    BingoEvent::PhaseChanged { phase: Phase::Ended },
                    BingoEvent::Winner(announcement),
                ]
            }

            // Error frames are not tied to a request, so an outstanding
            // claim stays outstanding.
            ServerMessage::Error { msg } => {
                debug!(%msg, "coordinator error");
                vec![BingoEvent::ServerError { message: msg }]
            }
        }
    }

    /// Advance the purchase countdown by one tick.
    pub fn tick(&mut self) -> Vec<BingoEvent> {
        match self.timer.tick() {
            Countdown::Running { remaining } => vec![BingoEvent::CountdownTick { remaining }],
            Countdown::Closed => {
                let mut events = vec![BingoEvent::CountdownTick { remaining: 0 }];
                if self.phase == Phase::Buying {
                    self.phase = Phase::Playing;
                    debug!("purchase window closed");
                    events.push(BingoEvent::PhaseChanged {
                        phase: Phase::Playing,
                    });
                }
                events
            }
            Countdown::Expired => Vec::new(),
        }
    }

    /// The channel is gone; nothing more can happen this round.
    pub fn terminate(&mut self) -> Vec<BingoEvent> {
        if self.phase == Phase::Ended {
            return Vec::new();
        }
        self.phase = Phase::Ended;
        vec![BingoEvent::PhaseChanged { phase: Phase::Ended }]
    }

    // ── Intents ─────────────────────────────────────────────────────

    /// Ask for a card. `None` when buying is not allowed right now.
    pub fn purchase(&mut self, card_id: CardId) -> Option<ClientMessage> {
        if self.banned || self.phase != Phase::Buying {
            debug!(card_id, phase = ?self.phase, banned = self.banned, "purchase not allowed");
            return None;
        }
        let msg = self.registry.purchase(card_id);
        if msg.is_none() {
            debug!(card_id, "purchase refused by registry");
        }
        msg
    }

    /// Claim a win. `None` without a card, after a ban, or once ended.
    ///
    /// The card is not checked against the ledger; the coordinator decides.
    pub fn claim_bingo(&mut self) -> Option<ClientMessage> {
        if self.banned || self.phase == Phase::Ended || self.registry.my_card().is_none() {
            debug!(phase = ?self.phase, banned = self.banned, "claim not allowed");
            return None;
        }
        self.claim_outstanding = true;
        Some(ClientMessage::Bingo)
    }

    /// Toggle the local mark on a cell of our card. No protocol effect.
    pub fn toggle_mark(&mut self, column: usize, row: usize) -> Option<bool> {
        self.registry.my_card_mut()?.toggle_mark(column, row)
    }

    /// Hide the winner popup. Returns `true` if it was showing.
    pub fn dismiss_winner(&mut self) -> bool {
        std::mem::replace(&mut self.winner_visible, false)
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
    use crate::card::tests::sample_grid;

    fn session() -> Session {
        Session::new(LaunchParams::new(5, 1, 1001).unwrap())
    }

    fn assign(session: &mut Session, card_id: Option<CardId>) -> Vec<BingoEvent> {
        session.apply(ServerMessage::Card {
            card: sample_grid(),
            balance: 50.0,
            card_id,
        })
    }

    fn close_window(session: &mut Session) {
        while session.phase() == Phase::Buying {
            session.tick();
        }
    }

    #[test]
    fn starts_buying_with_full_countdown() {
        let s = session();
        assert_eq!(s.phase(), Phase::Buying);
        assert_eq!(s.countdown(), 20);
        assert!(!s.is_banned());
    }

    #[test]
    fn countdown_moves_to_playing_once() {
        let mut s = session();
        let mut phase_changes = 0;
        for _ in 0..40 {
            phase_changes += s
                .tick()
                .iter()
                .filter(|e| matches!(e, BingoEvent::PhaseChanged { .. }))
                .count();
        }
        assert_eq!(phase_changes, 1);
        assert_eq!(s.phase(), Phase::Playing);
    }

    #[test]
    fn window_closes_even_without_a_card() {
        let mut s = session();
        close_window(&mut s);
        assert_eq!(s.phase(), Phase::Playing);
        assert!(s.registry().my_card().is_none());
    }

    #[test]
    fn purchase_after_window_closes_is_a_no_op() {
        let mut s = session();
        close_window(&mut s);
        assert_eq!(s.purchase(42), None);
    }

    #[test]
    fn claim_requires_a_card() {
        let mut s = session();
        assert_eq!(s.claim_bingo(), None);
        assign(&mut s, Some(3));
        assert_eq!(s.claim_bingo(), Some(ClientMessage::Bingo));
        assert!(s.is_claim_outstanding());
    }

    #[test]
    fn ban_disables_purchase_and_claim_permanently() {
        let mut s = session();
        assert_eq!(s.apply(ServerMessage::Banned), vec![BingoEvent::Banned]);
        assert!(s.apply(ServerMessage::Banned).is_empty());
        assert_eq!(s.purchase(1), None);

        assign(&mut s, Some(1));
        s.apply(ServerMessage::Error { msg: "retry".into() });
        assert_eq!(s.claim_bingo(), None);
        assert!(s.is_banned());
    }

    #[test]
    fn banned_session_keeps_recording_numbers() {
        let mut s = session();
        s.apply(ServerMessage::Banned);
        s.apply(ServerMessage::Number { value: 12 });
        assert_eq!(s.ledger().len(), 1);
    }

    #[test]
    fn winner_ends_round_and_blocks_intents() {
        let mut s = session();
        assign(&mut s, Some(8));
        let events = s.apply(ServerMessage::Winner {
            names: "Abebe".into(),
            amount: 120.5,
        });
        assert_eq!(events.len(), 2);
        assert_eq!(s.phase(), Phase::Ended);
        assert!(s.is_winner_visible());
        assert_eq!(s.winner().unwrap().amount_display(), "120.50");
        assert_eq!(s.claim_bingo(), None);
        assert_eq!(s.purchase(9), None);

        // A second winner and a late ban are ignored.
        assert!(s
            .apply(ServerMessage::Winner {
                names: "Other".into(),
                amount: 1.0
            })
            .is_empty());
        assert!(s.apply(ServerMessage::Banned).is_empty());
        assert!(!s.is_banned());
        assert_eq!(s.winner().unwrap().names, "Abebe");
    }

    #[test]
    fn timer_close_after_winner_keeps_phase_ended() {
        let mut s = session();
        s.apply(ServerMessage::Winner {
            names: "A".into(),
            amount: 1.0,
        });
        for _ in 0..25 {
            s.tick();
        }
        assert_eq!(s.phase(), Phase::Ended);
    }

    #[test]
    fn late_numbers_are_recorded_after_end() {
        let mut s = session();
        s.apply(ServerMessage::Winner {
            names: "A".into(),
            amount: 1.0,
        });
        assert_eq!(s.apply(ServerMessage::Number { value: 70 }).len(), 1);
        assert!(s.ledger().contains(70));
    }

    #[test]
    fn error_surfaces_without_state_change() {
        let mut s = session();
        let before = s.snapshot();
        let events = s.apply(ServerMessage::Error {
            msg: "card taken".into(),
        });
        assert_eq!(
            events,
            vec![BingoEvent::ServerError {
                message: "card taken".into()
            }]
        );
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn error_leaves_outstanding_claim_untouched() {
        let mut s = session();
        assert!(s.purchase(1).is_some());
        assign(&mut s, None);
        assert_eq!(s.claim_bingo(), Some(ClientMessage::Bingo));

        let before = s.snapshot();
        s.apply(ServerMessage::Error {
            msg: "insufficient balance".into(),
        });
        assert_eq!(s.snapshot(), before);
        assert!(s.is_claim_outstanding());
        assert_eq!(
            serde_json::to_vec(&s.snapshot()).unwrap(),
            serde_json::to_vec(&before).unwrap()
        );
    }

    #[test]
    fn dismiss_winner_reports_visibility_once() {
        let mut s = session();
        assert!(!s.dismiss_winner());
        s.apply(ServerMessage::Winner {
            names: "A".into(),
            amount: 3.0,
        });
        assert!(s.dismiss_winner());
        assert!(!s.dismiss_winner());
        assert!(s.winner().is_some());
    }

    #[test]
    fn toggle_mark_needs_a_card() {
        let mut s = session();
        assert_eq!(s.toggle_mark(0, 0), None);
        assign(&mut s, None);
        assert_eq!(s.toggle_mark(0, 0), Some(true));
        assert!(s.snapshot().card.unwrap().is_marked(0, 0));
    }

    #[test]
    fn terminate_ends_once() {
        let mut s = session();
        assert_eq!(s.terminate().len(), 1);
        assert!(s.terminate().is_empty());
        assert_eq!(s.phase(), Phase::Ended);
    }
}
