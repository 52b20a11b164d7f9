//! # Play Example
//!
//! Joins one bingo round from the terminal:
//!
//! 1. Connect to the coordinator channel for (room, game, player)
//! 2. Buy a card during the purchase window
//! 3. Print called numbers as they arrive, with the recent-calls strip
//! 4. Claim bingo when the player presses Enter
//! 5. Shut down on Ctrl+C, on winner, or on disconnect
//!
//! ## Running
//!
//! ```sh
//! BINGO_PLAYER_ID=123456 BINGO_LAUNCH_QUERY="room=10&game_id=3" \
//!     BINGO_CARD_ID=42 cargo run --example play
//! ```

use bingo_client::config::DEFAULT_SERVER_URL;
use bingo_client::{BingoClient, BingoConfig, BingoEvent, LaunchParams};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("BINGO_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
    let player_id: i64 = std::env::var("BINGO_PLAYER_ID")
        .unwrap_or_else(|_| "1".to_string())
        .parse()?;
    let query = std::env::var("BINGO_LAUNCH_QUERY").unwrap_or_default();
    let card_id: u32 = std::env::var("BINGO_CARD_ID")
        .unwrap_or_else(|_| "1".to_string())
        .parse()?;

    let launch = LaunchParams::from_query(&query, player_id)?;
    tracing::info!(room = launch.room, game_id = launch.game_id, "joining round");

    // ── Connect ─────────────────────────────────────────────────────
    let (mut client, mut events) = BingoClient::connect(&url, BingoConfig::new(launch)).await?;
    client.purchase(card_id)?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    BingoEvent::CountdownTick { remaining } if remaining % 5 == 0 => {
                        tracing::info!("purchase window: {remaining}s left");
                    }
                    BingoEvent::CardAssigned { card, balance } => {
                        tracing::info!("card {:?} assigned, balance {balance}", card.id);
                        for row in 0..5 {
                            let cells: Vec<String> =
                                card.grid().row(row).map(|c| format!("{:>3}", c.to_string())).collect();
                            println!("{}", cells.join(" "));
                        }
                        println!("Press Enter to claim bingo.");
                    }
                    BingoEvent::NumberCalled { number } => {
                        let recent: Vec<String> = client
                            .snapshot()
                            .recent
                            .iter()
                            .map(ToString::to_string)
                            .collect();
                        println!("called {number}   recent: {}", recent.join(" "));
                    }
                    BingoEvent::Banned => println!("False bingo! You are banned for this round."),
                    BingoEvent::Winner(winner) => {
                        println!("WINNER: {} +{} birr", winner.names, winner.amount_display());
                    }
                    BingoEvent::ServerError { message } => println!("{message}"),
                    BingoEvent::Disconnected { reason } => {
                        tracing::info!(?reason, "disconnected");
                        break;
                    }
                    other => tracing::debug!(?other, "event"),
                }
            }

            line = stdin.next_line() => {
                if let Ok(Some(_)) = line {
                    client.claim_bingo()?;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
