#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Headless session tests: inbound frames decoded from JSON and fed straight
//! into a [`Session`], with no transport or runtime involved.

mod common;

use bingo_client::card::Letter;
use bingo_client::ledger::{bucket_of, CalledNumber, RECENT_CALLS};
use bingo_client::protocol::{ClientMessage, ServerMessage};
use bingo_client::{BingoEvent, Phase, Session};
use proptest::prelude::*;

use common::{
    banned_json, card_json, error_json, launch, number_json, sample_grid, taken_json, winner_json,
};

fn feed(session: &mut Session, frame: &str) -> Vec<BingoEvent> {
    let msg: ServerMessage = serde_json::from_str(frame).expect("frame decodes");
    session.apply(msg)
}

// ════════════════════════════════════════════════════════════════════
// End-to-end scenarios
// ════════════════════════════════════════════════════════════════════

#[test]
fn scenario_card_then_two_calls() {
    let mut session = Session::new(launch());
    feed(&mut session, &card_json(50.0));
    feed(&mut session, &number_json(7));
    feed(&mut session, &number_json(22));

    let called: Vec<u8> = session.ledger().calls().iter().map(|n| n.value()).collect();
    assert_eq!(called, vec![7, 22]);
    assert_eq!(CalledNumber::new(7).unwrap().to_string(), "B7");
    assert_eq!(CalledNumber::new(22).unwrap().to_string(), "I22");
    assert_eq!(bucket_of(22), Some(Letter::I));
    assert_eq!(session.balance(), Some(50.0));
    assert_eq!(session.snapshot().balance, Some(50.0));
}

#[test]
fn scenario_purchase_emits_buy_exactly_once() {
    let mut session = Session::new(launch());
    let first = session.purchase(42);
    assert_eq!(first, Some(ClientMessage::Buy { card_id: 42 }));
    assert_eq!(
        serde_json::to_value(first.unwrap()).unwrap(),
        serde_json::json!({ "type": "buy", "card_id": 42 })
    );
    assert_eq!(session.purchase(42), None);
    assert_eq!(session.purchase(43), None);
}

#[test]
fn scenario_banned_then_winner() {
    let mut session = Session::new(launch());
    feed(&mut session, &banned_json());
    assert!(session.is_banned());

    let events = feed(&mut session, &winner_json("Abebe", 120.5));
    assert!(session.is_banned());
    assert_eq!(session.phase(), Phase::Ended);
    assert!(events.contains(&BingoEvent::PhaseChanged {
        phase: Phase::Ended
    }));

    let winner = session.winner().unwrap();
    assert_eq!(winner.names, "Abebe");
    assert_eq!(winner.amount_display(), "120.50");
}

// ════════════════════════════════════════════════════════════════════
// Ownership properties
// ════════════════════════════════════════════════════════════════════

#[test]
fn second_assignment_does_not_overwrite_card() {
    let mut session = Session::new(launch());
    session.purchase(10);
    assert_eq!(feed(&mut session, &card_json(40.0)).len(), 1);

    let second = serde_json::to_string(&ServerMessage::Card {
        card: sample_grid(),
        balance: 5.0,
        card_id: Some(99),
    })
    .unwrap();
    assert!(feed(&mut session, &second).is_empty());

    let card = session.registry().my_card().unwrap();
    assert_eq!(card.id, Some(10));
    assert_eq!(session.balance(), Some(40.0));
}

#[test]
fn taken_notice_for_own_card_is_not_recorded() {
    let mut session = Session::new(launch());
    session.purchase(42);
    feed(&mut session, &card_json(50.0));

    assert!(feed(&mut session, &taken_json(42)).is_empty());
    assert!(session.snapshot().taken.is_empty());

    assert_eq!(
        feed(&mut session, &taken_json(7)),
        vec![BingoEvent::CardTaken { card_id: 7 }]
    );
    assert_eq!(session.snapshot().taken, vec![7]);
}

#[test]
fn ban_survives_error_and_later_frames() {
    let mut session = Session::new(launch());
    session.purchase(3);
    feed(&mut session, &card_json(10.0));
    feed(&mut session, &banned_json());

    for frame in [
        error_json("appeal accepted"),
        number_json(5),
        taken_json(8),
        banned_json(),
    ] {
        feed(&mut session, &frame);
        assert!(session.is_banned());
        assert_eq!(session.claim_bingo(), None);
        assert_eq!(session.purchase(9), None);
    }
}

#[test]
fn error_frame_leaves_session_unchanged_even_with_claim_outstanding() {
    let mut session = Session::new(launch());
    session.purchase(1);
    feed(&mut session, &card_json(10.0));
    assert_eq!(session.claim_bingo(), Some(ClientMessage::Bingo));

    let before = session.snapshot();
    let events = feed(&mut session, &error_json("insufficient balance"));
    assert_eq!(
        events,
        vec![BingoEvent::ServerError {
            message: "insufficient balance".into()
        }]
    );
    assert_eq!(session.snapshot(), before);
    assert!(session.is_claim_outstanding());
}

#[test]
fn known_taken_card_cannot_be_bought() {
    let mut session = Session::new(launch());
    feed(&mut session, &taken_json(17));
    assert_eq!(session.purchase(17), None);
    assert_eq!(session.snapshot().pending_purchase, None);
    assert_eq!(session.snapshot().taken, vec![17]);
}

#[test]
fn unanswered_claim_stays_outstanding() {
    let mut session = Session::new(launch());
    session.purchase(1);
    feed(&mut session, &card_json(10.0));
    session.claim_bingo();
    for n in 1..=30 {
        feed(&mut session, &number_json(n));
        session.tick();
    }
    assert!(session.is_claim_outstanding());
    assert_eq!(session.phase(), Phase::Playing);
}

// ════════════════════════════════════════════════════════════════════
// Properties over generated frame sequences
// ════════════════════════════════════════════════════════════════════

fn frame_strategy() -> impl Strategy<Value = ServerMessage> {
    prop_oneof![
        (0.0f64..500.0, proptest::option::of(1u32..=1000)).prop_map(
            |(balance, card_id)| ServerMessage::Card {
                card: sample_grid(),
                balance,
                card_id,
            }
        ),
        (1u32..=1000).prop_map(|card_id| ServerMessage::Taken { card_id }),
        (-5i64..85).prop_map(|value| ServerMessage::Number { value }),
        Just(ServerMessage::Banned),
        ("[A-Za-z]{1,8}", 0.0f64..1000.0)
            .prop_map(|(names, amount)| ServerMessage::Winner { names, amount }),
        "[a-z ]{0,16}".prop_map(|msg| ServerMessage::Error { msg }),
    ]
}

proptest! {
    #[test]
    fn ledger_never_holds_duplicates_and_keeps_arrival_order(
        values in prop::collection::vec(-5i64..85, 0..200)
    ) {
        let mut session = Session::new(launch());
        let mut accepted: Vec<u8> = Vec::new();
        for value in values {
            let events = feed(&mut session, &number_json(value));
            let fresh = (1..=75).contains(&value) && !accepted.contains(&(value as u8));
            prop_assert_eq!(events.len(), usize::from(fresh));
            if fresh {
                accepted.push(value as u8);
            }

            let recent: Vec<u8> = session.snapshot().recent.iter().map(|n| n.value()).collect();
            prop_assert!(recent.len() <= RECENT_CALLS);
            let expected: Vec<u8> = accepted.iter().rev().take(RECENT_CALLS).copied().collect();
            prop_assert_eq!(recent, expected);
        }

        let called: Vec<u8> = session.ledger().calls().iter().map(|n| n.value()).collect();
        prop_assert_eq!(called, accepted);
    }

    #[test]
    fn first_assignment_wins(
        purchase in proptest::option::of(1u32..=1000),
        offers in prop::collection::vec(
            (proptest::option::of(1u32..=1000), 0.0f64..500.0),
            1..6,
        ),
    ) {
        let mut session = Session::new(launch());
        if let Some(id) = purchase {
            prop_assert!(session.purchase(id).is_some());
        }

        for (i, (card_id, balance)) in offers.iter().enumerate() {
            let events = session.apply(ServerMessage::Card {
                card: sample_grid(),
                balance: *balance,
                card_id: *card_id,
            });
            prop_assert_eq!(events.len(), usize::from(i == 0));
        }

        let (first_id, first_balance) = offers[0];
        let card = session.registry().my_card().unwrap();
        prop_assert_eq!(card.id, first_id.or(purchase));
        prop_assert_eq!(session.balance(), Some(first_balance));
        prop_assert_eq!(session.registry().pending(), None);
    }

    #[test]
    fn ban_is_permanent_whatever_follows(
        frames in prop::collection::vec((frame_strategy(), 1u32..=1000), 0..40)
    ) {
        let mut session = Session::new(launch());
        session.purchase(3);
        session.apply(ServerMessage::Card {
            card: sample_grid(),
            balance: 10.0,
            card_id: None,
        });
        session.apply(ServerMessage::Banned);

        for (frame, card_id) in frames {
            session.apply(frame);
            session.tick();
            prop_assert!(session.is_banned());
            prop_assert_eq!(session.claim_bingo(), None);
            prop_assert_eq!(session.purchase(card_id), None);
            prop_assert!(!session.snapshot().claim_outstanding);
        }
    }
}

#[test]
fn purchase_window_closes_on_the_twentieth_tick() {
    let mut session = Session::new(launch());
    for tick in 1..=19 {
        let events = session.tick();
        assert_eq!(
            events,
            vec![BingoEvent::CountdownTick {
                remaining: 20 - tick
            }]
        );
        assert_eq!(session.phase(), Phase::Buying);
    }
    assert_eq!(
        session.tick(),
        vec![
            BingoEvent::CountdownTick { remaining: 0 },
            BingoEvent::PhaseChanged {
                phase: Phase::Playing
            }
        ]
    );
    assert!(session.tick().is_empty());
}
