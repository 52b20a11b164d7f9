#![no_main]

use bingo_client::config::LaunchParams;
use bingo_client::protocol::ServerMessage;
use bingo_client::Session;
use libfuzzer_sys::fuzz_target;

// Newline-separated frames go through one session; whatever decodes is
// applied. Intents are interleaved so every path sees arbitrary state.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(launch) = LaunchParams::new(5, 1, 1) else {
        return;
    };
    let mut session = Session::new(launch);
    for (i, line) in text.lines().enumerate() {
        if let Ok(msg) = serde_json::from_str::<ServerMessage>(line) {
            session.apply(msg);
        }
        match i % 4 {
            0 => {
                let _ = session.purchase(i as u32);
            }
            1 => {
                let _ = session.claim_bingo();
            }
            2 => {
                let _ = session.tick();
            }
            _ => {
                let _ = session.toggle_mark(i % 5, i % 7);
            }
        }

        let snapshot = session.snapshot();
        assert!(snapshot.recent.len() <= 4);
        if let Some(own) = snapshot.card.as_ref().and_then(|card| card.id) {
            assert!(!snapshot.taken.contains(&own));
        }
    }
});
