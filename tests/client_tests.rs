#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration tests for `BingoClient` over the scripted `MockTransport`.
//!
//! Timer-driven behaviour runs on a paused tokio clock, which auto-advances
//! whenever the loop is idle.

mod common;

use std::time::Duration;

use bingo_client::protocol::ClientMessage;
use bingo_client::{BingoClient, BingoError, BingoEvent, Phase};
use tokio::sync::mpsc::Receiver;
use tokio_test::{assert_err, assert_ok};

use common::{
    banned_json, card_json, config, error_json, number_json, taken_json, winner_json,
    MockTransport,
};

#[allow(clippy::type_complexity)]
fn start_client(
    incoming: Vec<Option<Result<String, BingoError>>>,
) -> (
    BingoClient,
    Receiver<BingoEvent>,
    std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    std::sync::Arc<std::sync::atomic::AtomicBool>,
) {
    let (transport, sent, closed) = MockTransport::new(incoming);
    let (client, events) = BingoClient::start(transport, config());
    (client, events, sent, closed)
}

/// Receive events until one matches, skipping countdown ticks and anything
/// else in between.
async fn next_matching(
    events: &mut Receiver<BingoEvent>,
    pred: impl Fn(&BingoEvent) -> bool,
) -> BingoEvent {
    loop {
        let ev = events.recv().await.expect("event channel closed early");
        if pred(&ev) {
            return ev;
        }
    }
}

fn sent_messages(sent: &std::sync::Mutex<Vec<String>>) -> Vec<ClientMessage> {
    sent.lock()
        .unwrap()
        .iter()
        .map(|s| serde_json::from_str(s).expect("client sent valid JSON"))
        .collect()
}

// ════════════════════════════════════════════════════════════════════
// Inbound ordering
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn inbound_frames_are_applied_in_delivery_order() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(card_json(50.0))),
        Some(Ok(number_json(7))),
        Some(Ok(number_json(22))),
    ]);

    assert_eq!(events.recv().await, Some(BingoEvent::Connected));
    let ev = events.recv().await.unwrap();
    assert!(matches!(ev, BingoEvent::CardAssigned { balance, .. } if balance == 50.0));
    let ev = events.recv().await.unwrap();
    assert!(matches!(ev, BingoEvent::NumberCalled { number } if number.to_string() == "B7"));
    let ev = events.recv().await.unwrap();
    assert!(matches!(ev, BingoEvent::NumberCalled { number } if number.to_string() == "I22"));

    let snapshot = client.snapshot();
    let called: Vec<u8> = snapshot.called.iter().map(|n| n.value()).collect();
    assert_eq!(called, vec![7, 22]);
    assert_eq!(snapshot.balance, Some(50.0));
    assert!(snapshot.card.is_some());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_do_not_stop_the_loop() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok("garbage".into())),
        Some(Ok(r#"{"type":"jackpot"}"#.into())),
        Some(Ok(number_json(7))),
        Some(Ok(number_json(7))),
        Some(Ok(number_json(90))),
        Some(Ok(number_json(8))),
    ]);

    next_matching(&mut events, |e| matches!(e, BingoEvent::NumberCalled { .. })).await;
    let ev = next_matching(&mut events, |e| matches!(e, BingoEvent::NumberCalled { .. })).await;
    assert!(matches!(ev, BingoEvent::NumberCalled { number } if number.value() == 8));

    let called: Vec<u8> = client.snapshot().called.iter().map(|n| n.value()).collect();
    assert_eq!(called, vec![7, 8]);
    assert!(client.is_connected());

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Outbound intents
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn purchase_sends_buy_once() {
    let (mut client, mut events, sent, _closed) = start_client(vec![]);
    assert_eq!(events.recv().await, Some(BingoEvent::Connected));

    assert_ok!(client.purchase(42));
    assert_ok!(client.purchase(42));
    next_matching(&mut events, |e| {
        matches!(e, BingoEvent::PurchaseRequested { card_id: 42 })
    })
    .await;

    // Let the loop drain the second intent.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        sent_messages(&sent),
        vec![ClientMessage::Buy { card_id: 42 }]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn claim_without_card_is_not_sent() {
    let (mut client, mut events, sent, _closed) = start_client(vec![]);
    assert_eq!(events.recv().await, Some(BingoEvent::Connected));

    assert_ok!(client.claim_bingo());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(sent.lock().unwrap().is_empty());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn claim_after_assignment_is_sent() {
    let (mut client, mut events, sent, _closed) = start_client(vec![Some(Ok(card_json(20.0)))]);
    next_matching(&mut events, |e| matches!(e, BingoEvent::CardAssigned { .. })).await;

    assert_ok!(client.toggle_mark(0, 0));
    assert_ok!(client.claim_bingo());
    next_matching(&mut events, |e| matches!(e, BingoEvent::ClaimSubmitted)).await;

    assert_eq!(sent_messages(&sent), vec![ClientMessage::Bingo]);
    let snapshot = client.snapshot();
    assert!(snapshot.claim_outstanding);
    assert!(snapshot.card.unwrap().is_marked(0, 0));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn banned_player_cannot_claim() {
    let (mut client, mut events, sent, _closed) = start_client(vec![
        Some(Ok(card_json(20.0))),
        Some(Ok(banned_json())),
        Some(Ok(error_json("still banned"))),
    ]);
    next_matching(&mut events, |e| matches!(e, BingoEvent::Banned)).await;
    next_matching(&mut events, |e| matches!(e, BingoEvent::ServerError { .. })).await;

    assert_ok!(client.claim_bingo());
    assert_ok!(client.purchase(3));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(sent.lock().unwrap().is_empty());
    assert!(client.snapshot().banned);

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Timing
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn countdown_closes_purchase_window_after_twenty_ticks() {
    let (mut client, mut events, sent, _closed) = start_client(vec![]);
    assert_eq!(events.recv().await, Some(BingoEvent::Connected));

    let started = tokio::time::Instant::now();
    for remaining in (0..20).rev() {
        assert_eq!(
            events.recv().await,
            Some(BingoEvent::CountdownTick { remaining })
        );
    }
    assert_eq!(
        events.recv().await,
        Some(BingoEvent::PhaseChanged {
            phase: Phase::Playing
        })
    );
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(21));
    assert_eq!(client.snapshot().phase, Phase::Playing);

    // The window is closed: buying does nothing.
    assert_ok!(client.purchase(5));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(sent.lock().unwrap().is_empty());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn winner_popup_dismisses_itself() {
    let (mut client, mut events, _sent, _closed) =
        start_client(vec![Some(Ok(winner_json("Abebe", 120.5)))]);

    let ev = next_matching(&mut events, |e| matches!(e, BingoEvent::Winner(_))).await;
    let BingoEvent::Winner(announcement) = ev else {
        unreachable!()
    };
    assert_eq!(announcement.amount_display(), "120.50");

    let shown = tokio::time::Instant::now();
    let snapshot = client.snapshot();
    assert_eq!(snapshot.phase, Phase::Ended);
    assert!(snapshot.winner_visible);

    next_matching(&mut events, |e| matches!(e, BingoEvent::WinnerDismissed)).await;
    let elapsed = shown.elapsed();
    assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
    let snapshot = client.snapshot();
    assert!(!snapshot.winner_visible);
    assert_eq!(snapshot.winner.unwrap().names, "Abebe");

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn winner_popup_can_be_dismissed_early() {
    let (mut client, mut events, _sent, _closed) =
        start_client(vec![Some(Ok(winner_json("Sara", 30.0)))]);
    next_matching(&mut events, |e| matches!(e, BingoEvent::Winner(_))).await;

    let shown = tokio::time::Instant::now();
    assert_ok!(client.dismiss_winner());
    next_matching(&mut events, |e| matches!(e, BingoEvent::WinnerDismissed)).await;
    assert!(shown.elapsed() < Duration::from_secs(10));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn server_close_ends_session_and_disconnects() {
    let (mut client, mut events, _sent, _closed) =
        start_client(vec![Some(Ok(taken_json(9))), None]);

    next_matching(&mut events, |e| matches!(e, BingoEvent::CardTaken { card_id: 9 })).await;
    assert_eq!(
        events.recv().await,
        Some(BingoEvent::PhaseChanged { phase: Phase::Ended })
    );
    assert_eq!(
        events.recv().await,
        Some(BingoEvent::Disconnected { reason: None })
    );
    assert_eq!(events.recv().await, None);

    assert!(!client.is_connected());
    assert_eq!(client.snapshot().phase, Phase::Ended);
    assert_eq!(client.snapshot().taken, vec![9]);
    assert_err!(client.purchase(1));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn receive_error_is_reported_as_disconnect_reason() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![Some(Err(
        BingoError::TransportReceive("reset by peer".into()),
    ))]);

    let ev = next_matching(&mut events, |e| matches!(e, BingoEvent::Disconnected { .. })).await;
    let BingoEvent::Disconnected { reason } = ev else {
        unreachable!()
    };
    assert!(reason.unwrap().contains("reset by peer"));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_transport() {
    let (mut client, mut events, _sent, closed) = start_client(vec![]);
    assert_eq!(events.recv().await, Some(BingoEvent::Connected));

    client.shutdown().await;
    assert!(closed.load(std::sync::atomic::Ordering::Relaxed));
    assert!(!client.is_connected());

    let ev = next_matching(&mut events, |e| matches!(e, BingoEvent::Disconnected { .. })).await;
    assert_eq!(
        ev,
        BingoEvent::Disconnected {
            reason: Some("client shut down".into())
        }
    );
}
