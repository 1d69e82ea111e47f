#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for the session integration tests.
//!
//! Provides a channel-driven [`MockConnector`] whose every connection hands
//! back a [`MockServer`] for pushing frames and inspecting what the client
//! sent, a scripted [`MockLeaderboard`], and JSON frame builders.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use four_in_a_row_client::{
    Connector, LeaderboardEntry, LeaderboardSource, SessionError, Transport,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;

type Scripted = Option<Result<String, SessionError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// Client half of a mock connection.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Scripted>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::TransportClosed);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        match self.incoming.recv().await {
            // `Some(None)` is a scripted clean close.
            Some(item) => item,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// ── MockServer ──────────────────────────────────────────────────────

/// Server half of a mock connection.
#[derive(Clone)]
pub struct MockServer {
    /// The endpoint URL the client connected to.
    pub url: String,
    tx: mpsc::UnboundedSender<Scripted>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockServer {
    /// Deliver a text frame to the client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.tx.send(Some(Ok(frame.into())));
    }

    /// Close the connection from the server side.
    pub fn hang_up(&self) {
        let _ = self.tx.send(None);
    }

    /// Fail the connection with a receive error.
    pub fn fail(&self, reason: &str) {
        let _ = self
            .tx
            .send(Some(Err(SessionError::TransportReceive(reason.into()))));
    }

    /// Frames the client sent, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Frames the client sent, decoded as JSON.
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .map(|frame| serde_json::from_str(frame).unwrap())
            .collect()
    }

    /// Whether the client closed this connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Records every connection it opens. Clone it before handing it to the
/// session to keep access to the servers.
#[derive(Clone, Default)]
pub struct MockConnector {
    servers: Arc<StdMutex<Vec<MockServer>>>,
    refuse: Arc<AtomicBool>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `connect` fail.
    pub fn refuse_connections(&self) {
        self.refuse.store(true, Ordering::Release);
    }

    /// Number of connections opened so far.
    pub fn connections(&self) -> usize {
        self.servers.lock().unwrap().len()
    }

    /// The server side of the `index`-th connection.
    pub fn server(&self, index: usize) -> MockServer {
        self.servers.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, SessionError> {
        if self.refuse.load(Ordering::Acquire) {
            return Err(SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        let (tx, incoming) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));

        self.servers.lock().unwrap().push(MockServer {
            url: url.to_string(),
            tx,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        });

        Ok(Box::new(MockTransport {
            incoming,
            sent,
            closed,
        }))
    }
}

// ── MockLeaderboard ─────────────────────────────────────────────────

/// Replays scripted standings; once the script runs out it keeps returning
/// the last response.
#[derive(Clone, Default)]
pub struct MockLeaderboard {
    calls: Arc<AtomicUsize>,
    script: Arc<StdMutex<VecDeque<Result<Vec<LeaderboardEntry>, String>>>>,
}

impl MockLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn then_ok(self, entries: Vec<LeaderboardEntry>) -> Self {
        self.script.lock().unwrap().push_back(Ok(entries));
        self
    }

    /// Queue a failed response.
    pub fn then_fail(self, reason: &str) -> Self {
        self.script.lock().unwrap().push_back(Err(reason.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeaderboardSource for MockLeaderboard {
    async fn fetch(&self) -> Result<Vec<LeaderboardEntry>, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match next {
            Some(Ok(entries)) => Ok(entries),
            Some(Err(reason)) => Err(SessionError::Leaderboard(reason)),
            None => Ok(Vec::new()),
        }
    }
}

pub fn entry(username: &str, wins: u32) -> LeaderboardEntry {
    LeaderboardEntry {
        username: username.into(),
        wins,
    }
}

// ── JSON frame builders ─────────────────────────────────────────────

/// A `GameState` between alice (seat 1) and bob (seat 2) on an empty board.
pub fn game(id: &str, winner: i64, done: bool) -> Value {
    json!({
        "id": id,
        "players": [{"username": "alice"}, {"username": "bob"}],
        "board": {"cells": vec![vec![0; 7]; 6]},
        "turn": 1,
        "winner": winner,
        "done": done,
    })
}

/// A `state` frame addressed to the client.
pub fn state_frame(your_turn: bool, opponent: Option<&str>, state: Value) -> String {
    let mut msg = json!({"type": "state", "yourTurn": your_turn, "state": state});
    if let Some(opponent) = opponent {
        msg["opponent"] = json!(opponent);
    }
    msg.to_string()
}

pub fn error_frame(error: &str) -> String {
    json!({"type": "error", "error": error}).to_string()
}
