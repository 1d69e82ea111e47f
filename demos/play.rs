//! # Terminal Play Example
//!
//! Plays one game of four-in-a-row against whoever (or whatever) the server
//! pairs you with:
//!
//! 1. Fetch the standings and connect as the given username
//! 2. Redraw the board every time the session view changes
//! 3. Read column numbers (`0`-`6`) from stdin and drop discs
//! 4. Shut down on Ctrl+C, end of input, or when the server closes the game
//!
//! ## Running
//!
//! ```sh
//! # Start the game server on localhost:8080, then:
//! FOUR_IN_A_ROW_USER=alice cargo run --example play
//!
//! # Override the server URL:
//! FOUR_IN_A_ROW_URL=https://games.example.com cargo run --example play
//! ```

use four_in_a_row_client::{
    Cell, ConnectionStatus, GameSession, Outcome, SessionConfig, SessionView,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Default server URL when `FOUR_IN_A_ROW_URL` is not set.
const DEFAULT_URL: &str = "http://localhost:8080";

fn render(view: &SessionView) {
    println!();
    for row in &view.board.cells {
        let line: String = row
            .iter()
            .map(|cell| match cell {
                Cell::Empty => " .",
                Cell::PlayerOne => " X",
                Cell::PlayerTwo => " O",
            })
            .collect();
        println!("{line}");
    }
    println!(" 0 1 2 3 4 5 6");

    if !view.opponent.is_empty() {
        println!("vs {}", view.opponent);
    }
    println!("{}", view.status);
    if !view.notice.is_empty() {
        println!("({})", view.notice);
    }

    if !view.leaderboard.is_empty() {
        println!("-- leaderboard --");
        for entry in view.leaderboard.iter().take(5) {
            println!("{:>4}  {}", entry.wins, entry.username);
        }
    }
    if view.can_drop() {
        println!("column> ");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("FOUR_IN_A_ROW_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let username = std::env::var("FOUR_IN_A_ROW_USER").unwrap_or_else(|_| "player".to_string());
    tracing::info!("Connecting to {url} as {username}");

    // ── Connect ─────────────────────────────────────────────────────
    let (mut session, mut view) = GameSession::start_websocket(SessionConfig::new(url))?;
    session.connect(&username).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seen_game = false;

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                render(&current);

                seen_game |= !current.game_id.is_empty();
                if seen_game && current.connection == ConnectionStatus::Disconnected {
                    tracing::info!("Game connection closed");
                    break;
                }
                if current.outcome.is_terminal() {
                    if current.outcome == Outcome::Decided {
                        // Give the leaderboard refresh a moment to land.
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        render(&session.view());
                    }
                    break;
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("End of input, leaving");
                    break;
                };
                match line.trim().parse::<i32>() {
                    Ok(column) => {
                        if !session.drop_disc(column) {
                            println!("not your turn");
                        }
                    }
                    Err(_) => println!("enter a column number"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    session.shutdown().await;
    Ok(())
}
