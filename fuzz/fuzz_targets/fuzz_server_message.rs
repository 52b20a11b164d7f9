#![no_main]

use bingo_client::config::LaunchParams;
use bingo_client::protocol::ServerMessage;
use bingo_client::Session;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Launch queries come from an untrusted page URL too.
    if let Ok(launch) = LaunchParams::from_query(text, 1) {
        assert!(launch.room > 0);
        let _ = launch.channel_url("ws://127.0.0.1:8000");
    }

    let Ok(msg) = serde_json::from_str::<ServerMessage>(text) else {
        return;
    };

    // Whatever decodes must re-encode under the same frame type.
    let kind = msg.kind();
    let encoded = serde_json::to_string(&msg).expect("decoded frame re-encodes");
    let again: ServerMessage = serde_json::from_str(&encoded).expect("re-encoded frame decodes");
    assert_eq!(again.kind(), kind);

    // A fresh session must take any decoded frame without panicking, and a
    // card it accepts must be one that validates.
    let grid_ok = match &msg {
        ServerMessage::Card { card, .. } => Some(card.validate().is_ok()),
        _ => None,
    };
    let mut session = Session::new(LaunchParams::new(5, 1, 1).expect("valid launch"));
    session.apply(msg);
    if let Some(valid) = grid_ok {
        assert_eq!(session.registry().my_card().is_some(), valid);
    }
});
