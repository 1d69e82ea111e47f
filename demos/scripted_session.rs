//! # Scripted Session Example
//!
//! Shows how to plug a custom [`Connector`] and [`LeaderboardSource`] into a
//! [`GameSession`]. The connector hands out an in-process loopback transport
//! whose server half is driven by this program, so a whole game can be played
//! without a network. Useful for testing UI code and for adapting other I/O
//! layers.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example scripted_session
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use four_in_a_row_client::{
    Connector, GameSession, LeaderboardEntry, LeaderboardSource, SessionConfig, SessionError,
    Transport,
};
use serde_json::json;
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: A channel-based loopback transport
// ─────────────────────────────────────────────────────────────────────

/// Client half of the loopback.
struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Server half of the loopback.
struct LoopbackServer {
    /// What the client sent.
    rx: mpsc::UnboundedReceiver<String>,
    /// Frames delivered to the client.
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        self.tx
            .send(message)
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }

    /// `None` once the server half is dropped.
    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: A connector that parks the server half for main to pick up
// ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct LoopbackConnector {
    server: Arc<Mutex<Option<LoopbackServer>>>,
}

impl LoopbackConnector {
    fn take_server(&self) -> Option<LoopbackServer> {
        self.server.lock().ok()?.take()
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, SessionError> {
        tracing::info!("loopback connect to {url}");
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();

        let mut slot = self
            .server
            .lock()
            .map_err(|e| SessionError::TransportSend(e.to_string()))?;
        *slot = Some(LoopbackServer {
            rx: server_rx,
            tx: server_tx,
        });

        Ok(Box::new(LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        }))
    }
}

/// Fixed standings.
struct StaticLeaderboard(Vec<LeaderboardEntry>);

#[async_trait]
impl LeaderboardSource for StaticLeaderboard {
    async fn fetch(&self) -> Result<Vec<LeaderboardEntry>, SessionError> {
        Ok(self.0.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: Play a scripted game
// ─────────────────────────────────────────────────────────────────────

fn snapshot(cells: &serde_json::Value, turn: u8, winner: u8, done: bool) -> serde_json::Value {
    json!({
        "id": "demo",
        "board": {"cells": cells},
        "players": [{"username": "alice", "isBot": false}, {"username": "bot", "isBot": true}],
        "turn": turn,
        "winner": winner,
        "done": done,
        "moves": null,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let connector = LoopbackConnector::default();
    let leaderboard = StaticLeaderboard(vec![LeaderboardEntry {
        username: "alice".into(),
        wins: 1,
    }]);

    let (mut session, mut view) = GameSession::start(
        SessionConfig::new("http://loopback"),
        connector.clone(),
        leaderboard,
    );
    session.connect("alice").await?;
    let Some(mut server) = connector.take_server() else {
        return Err("connector did not open a loopback".into());
    };

    // alice stacks column 0 while the bot plays column 1.
    let mut cells = json!(vec![vec![0; 7]; 6]);
    server.tx.send(
        json!({"type": "state", "gameId": "demo", "yourTurn": true, "opponent": "bot",
               "state": snapshot(&cells, 1, 0, false)})
        .to_string(),
    )?;

    for round in 0..4usize {
        view.wait_for(|v| v.can_drop() && v.board.disc_count() == round * 2)
            .await?;
        tracing::info!("round {round}: {}", view.borrow().status);
        session.drop_disc(0);

        let Some(frame) = server.rx.recv().await else {
            return Err("client hung up".into());
        };
        tracing::info!("server received: {frame}");

        let row = 5 - round;
        cells[row][0] = json!(1);
        if round == 3 {
            server.tx.send(
                json!({"type": "state", "gameId": "demo", "opponent": "bot",
                       "state": snapshot(&cells, 2, 1, true)})
                .to_string(),
            )?;
            break;
        }
        cells[row][1] = json!(2);
        server.tx.send(
            json!({"type": "state", "gameId": "demo", "yourTurn": true, "opponent": "bot",
                   "state": snapshot(&cells, 1, 0, false)})
            .to_string(),
        )?;
    }

    let finished = view.wait_for(|v| v.outcome.is_terminal()).await?.clone();
    tracing::info!("final status: {}", finished.status);

    // The decided game triggers a standings refresh.
    let refreshed = view
        .wait_for(|v| !v.leaderboard.is_empty())
        .await?
        .leaderboard
        .clone();
    for entry in &refreshed {
        tracing::info!("{}: {} win(s)", entry.username, entry.wins);
    }

    session.shutdown().await;
    Ok(())
}
