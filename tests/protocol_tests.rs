#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests: JSON fixtures shaped like real coordinator frames.

use bingo_client::card::Cell;
use bingo_client::protocol::{ClientMessage, ServerMessage};

// ════════════════════════════════════════════════════════════════════
// Inbound fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn card_fixture_decodes() {
    let json = r#"{
        "type": "card",
        "card": [[3,7,11,1,14],[20,18,30,16,22],[33,40,"F",31,45],[50,46,59,60,48],[61,75,70,66,63]],
        "balance": 50
    }"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    let ServerMessage::Card {
        card,
        balance,
        card_id,
    } = msg
    else {
        panic!("expected Card, got {msg:?}");
    };
    assert_eq!(balance, 50.0);
    assert_eq!(card_id, None);
    assert_eq!(card.cell(0, 1), Some(Cell::Number(7)));
    assert_eq!(card.cell(2, 2), Some(Cell::Free));
    assert!(card.validate().is_ok());
}

#[test]
fn card_fixture_with_echoed_id_decodes() {
    let json = r#"{"type":"card","card_id":42,"balance":12.75,
        "card":[[1,2,3,4,5],[16,17,18,19,20],[31,32,"F",34,35],[46,47,48,49,50],[61,62,63,64,65]]}"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    assert!(matches!(
        msg,
        ServerMessage::Card {
            card_id: Some(42),
            ..
        }
    ));
}

#[test]
fn card_with_short_column_is_rejected() {
    let json = r#"{"type":"card","balance":1,
        "card":[[1,2,3,4],[16,17,18,19,20],[31,32,"F",34,35],[46,47,48,49,50],[61,62,63,64,65]]}"#;
    assert!(serde_json::from_str::<ServerMessage>(json).is_err());
}

#[test]
fn simple_fixtures_decode() {
    let cases: Vec<(&str, ServerMessage)> = vec![
        (
            r#"{"type":"taken","card_id":17}"#,
            ServerMessage::Taken { card_id: 17 },
        ),
        (
            r#"{"type":"number","value":64}"#,
            ServerMessage::Number { value: 64 },
        ),
        (r#"{"type":"banned"}"#, ServerMessage::Banned),
        (
            r#"{"type":"winner","names":"Abebe, Sara","amount":240}"#,
            ServerMessage::Winner {
                names: "Abebe, Sara".into(),
                amount: 240.0,
            },
        ),
        (
            r#"{"type":"error","msg":"Card already taken"}"#,
            ServerMessage::Error {
                msg: "Card already taken".into(),
            },
        ),
    ];
    for (json, expected) in cases {
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, expected, "fixture {json}");
    }
}

#[test]
fn out_of_range_number_still_decodes() {
    // Range enforcement is the ledger's job, not the decoder's.
    let msg: ServerMessage = serde_json::from_str(r#"{"type":"number","value":99}"#).unwrap();
    assert_eq!(msg, ServerMessage::Number { value: 99 });
}

#[test]
fn extra_fields_are_ignored() {
    let msg: ServerMessage =
        serde_json::from_str(r#"{"type":"banned","reason":"false bingo"}"#).unwrap();
    assert_eq!(msg, ServerMessage::Banned);
}

#[test]
fn malformed_frames_are_rejected() {
    for json in [
        "",
        "not json",
        "{}",
        r#"{"type":"number"}"#,
        r#"{"type":"number","value":"7"}"#,
        r#"{"type":"taken","card_id":-1}"#,
        r#"{"type":"winner","names":"A"}"#,
        r#"{"type":"buy","card_id":1}"#,
    ] {
        assert!(
            serde_json::from_str::<ServerMessage>(json).is_err(),
            "expected {json:?} to be rejected"
        );
    }
}

// ════════════════════════════════════════════════════════════════════
// Outbound shapes
// ════════════════════════════════════════════════════════════════════

#[test]
fn outbound_messages_match_wire_shapes() {
    assert_eq!(
        serde_json::to_string(&ClientMessage::Buy { card_id: 42 }).unwrap(),
        r#"{"type":"buy","card_id":42}"#
    );
    assert_eq!(
        serde_json::to_string(&ClientMessage::Bingo).unwrap(),
        r#"{"type":"bingo"}"#
    );
}
