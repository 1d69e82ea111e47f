//! The game session: connection lifecycle and move dispatch.
//!
//! [`GameSession`] owns at most one live connection. Each connection runs a
//! background transport loop that feeds socket events into the shared
//! [`SessionView`] through a single entry point, which runs the pure reducer
//! ([`SessionView::apply`]) under the lock of a `tokio::sync::watch` channel.
//! Socket events and leaderboard completions therefore never interleave, and
//! the view layer observes every change through the receiver returned by
//! [`GameSession::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let config = SessionConfig::new("http://localhost:8080");
//! let (mut session, mut view) = GameSession::start_websocket(config)?;
//!
//! session.connect("alice").await?;
//! while view.changed().await.is_ok() {
//!     let current = view.borrow_and_update().clone();
//!     if current.can_drop() {
//!         session.drop_disc(3);
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::leaderboard::LeaderboardSource;
use crate::protocol::ClientMessage;
use crate::transport::{Connector, Transport};
use crate::view::{Effect, SessionEvent, SessionView};

// ── Shared state ────────────────────────────────────────────────────

/// State shared between the session handle, its transport loop and
/// leaderboard fetch tasks.
struct Shared {
    view_tx: watch::Sender<SessionView>,
    leaderboard: Arc<dyn LeaderboardSource>,
}

impl Shared {
    /// Run `event` through the reducer and execute the resulting effects.
    ///
    /// Watchers are only notified when the view actually changed.
    fn dispatch(self: &Arc<Self>, event: SessionEvent) {
        let mut effects = Vec::new();
        self.view_tx.send_if_modified(|view| {
            let transition = view.apply(event);
            effects = transition.effects;
            if transition.view == *view {
                false
            } else {
                *view = transition.view;
                true
            }
        });

        for effect in effects {
            match effect {
                Effect::FetchLeaderboard => {
                    debug!("game decided, refreshing leaderboard");
                    self.spawn_leaderboard_fetch();
                }
            }
        }
    }

    fn spawn_leaderboard_fetch(self: &Arc<Self>) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            match shared.leaderboard.fetch().await {
                Ok(entries) => {
                    debug!(entries = entries.len(), "leaderboard refreshed");
                    shared.dispatch(SessionEvent::LeaderboardLoaded(entries));
                }
                Err(e) => warn!("keeping previous leaderboard: {e}"),
            }
        })
    }
}

/// The single live connection of a session.
struct Connection {
    /// Encoded outbound frames for the transport loop.
    cmd_tx: mpsc::UnboundedSender<String>,
    /// Cleared by the transport loop when the socket closes.
    open: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Connection {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

// ── Session handle ──────────────────────────────────────────────────

/// Client-side game session.
///
/// Created via [`GameSession::start`], which also kicks off the initial
/// leaderboard fetch. Must be created inside a tokio runtime.
pub struct GameSession {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    connection: Option<Connection>,
}

impl GameSession {
    /// Create a session and return it with a receiver of the published view.
    ///
    /// The leaderboard is fetched once immediately, whether or not a
    /// connection is ever opened.
    #[must_use = "the view receiver is how state changes are observed"]
    pub fn start(
        config: SessionConfig,
        connector: impl Connector,
        leaderboard: impl LeaderboardSource,
    ) -> (Self, watch::Receiver<SessionView>) {
        let (view_tx, view_rx) = watch::channel(SessionView::default());
        let shared = Arc::new(Shared {
            view_tx,
            leaderboard: Arc::new(leaderboard),
        });
        shared.spawn_leaderboard_fetch();

        let session = Self {
            config,
            connector: Arc::new(connector),
            shared,
            connection: None,
        };
        (session, view_rx)
    }

    /// [`start`](Self::start) with the WebSocket connector and the HTTP
    /// leaderboard derived from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidEndpoint`] if the server URL is unusable.
    #[cfg(feature = "transport-websocket")]
    pub fn start_websocket(config: SessionConfig) -> Result<(Self, watch::Receiver<SessionView>)> {
        let leaderboard = crate::leaderboard::HttpLeaderboard::new(&config)?;
        Ok(Self::start(
            config,
            crate::transports::WebSocketConnector,
            leaderboard,
        ))
    }

    // ── Actions ─────────────────────────────────────────────────────

    /// Open a game connection for `username`.
    ///
    /// Any existing connection is closed first and its close is applied to
    /// the view before the new socket is opened, so at most one connection
    /// is ever live. There is no automatic reconnection.
    ///
    /// # Errors
    ///
    /// - [`SessionError::EmptyUsername`] if `username` is blank (nothing is
    ///   closed or opened).
    /// - [`SessionError::InvalidEndpoint`] if no endpoint can be derived.
    /// - [`SessionError::Timeout`] or the connector's error if the handshake
    ///   fails; the view is then in its disconnected state.
    pub async fn connect(&mut self, username: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(SessionError::EmptyUsername);
        }
        let url = self.config.game_endpoint(username)?;

        self.disconnect().await;
        self.shared.dispatch(SessionEvent::Connecting {
            username: username.to_string(),
        });

        info!(username = %username, "opening game connection");
        let opened =
            tokio::time::timeout(self.config.connect_timeout, self.connector.connect(url.as_str()))
                .await
                .unwrap_or_else(|_| Err(SessionError::Timeout));
        let transport = match opened {
            Ok(transport) => transport,
            Err(e) => {
                warn!("game connection failed: {e}");
                self.shared.dispatch(SessionEvent::Closed {
                    reason: Some(e.to_string()),
                });
                return Err(e);
            }
        };

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<String>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let open = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(transport_loop(
            transport,
            cmd_rx,
            Arc::clone(&self.shared),
            Arc::clone(&open),
            shutdown_rx,
        ));

        self.connection = Some(Connection {
            cmd_tx,
            open,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
        });
        Ok(())
    }

    /// Drop a disc into `column`.
    ///
    /// Sent only if a connection is open, it is our turn and the game has no
    /// winner; otherwise this is a silent no-op. The column is passed through
    /// as-is since the server decides legality. Returns whether a move frame
    /// was queued.
    pub fn drop_disc(&self, column: i32) -> bool {
        if !self.is_connected() {
            debug!(column, "move suppressed: not connected");
            return false;
        }
        if !self.shared.view_tx.borrow().can_drop() {
            debug!(column, "move suppressed: not our turn or game over");
            return false;
        }
        match self.send(&ClientMessage::Move { column }) {
            Ok(()) => true,
            Err(e) => {
                debug!(column, "move not queued: {e}");
                false
            }
        }
    }

    /// Send a heartbeat ping.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] if no connection is open.
    pub fn ping(&self) -> Result<()> {
        self.send(&ClientMessage::Ping)
    }

    /// Ask the server to restart its reconnect grace window for this player,
    /// postponing a forfeit after a dropped socket.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] if no connection is open.
    pub fn refresh_reconnect_window(&self) -> Result<()> {
        self.send(&ClientMessage::Reconnect)
    }

    /// Encode `message` and queue it on the live connection.
    fn send(&self, message: &ClientMessage) -> Result<()> {
        let connection = self
            .connection
            .as_ref()
            .filter(|c| c.is_open())
            .ok_or(SessionError::NotConnected)?;
        let frame = message.to_frame()?;
        connection
            .cmd_tx
            .send(frame)
            .map_err(|_| SessionError::NotConnected)
    }

    /// Re-read the standings. Runs in the background; the returned handle
    /// completes once the result (or failure) has been applied.
    pub fn fetch_leaderboard(&self) -> JoinHandle<()> {
        self.shared.spawn_leaderboard_fetch()
    }

    /// Close the live connection, if any, and apply the close to the view.
    pub async fn disconnect(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        debug!("closing game connection");

        if let Some(tx) = connection.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // The loop applies the close itself when it exits normally. If it
        // has to be aborted, apply it here.
        let Some(mut task) = connection.task.take() else {
            return;
        };
        match tokio::time::timeout(self.config.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => {
                warn!("transport loop terminated with join error: {join_err}");
                mark_closed(&self.shared, &connection.open, Some(join_err.to_string()));
            }
            Err(_) => {
                warn!("transport loop did not exit within timeout; aborting task");
                task.abort();
                if let Err(join_err) = task.await {
                    debug!("transport loop aborted: {join_err}");
                }
                mark_closed(&self.shared, &connection.open, Some("close timed out".into()));
            }
        }
    }

    /// Close the connection for good. Equivalent to [`disconnect`](Self::disconnect).
    pub async fn shutdown(&mut self) {
        self.disconnect().await;
    }

    // ── State accessors ─────────────────────────────────────────────

    /// A snapshot of the current view.
    pub fn view(&self) -> SessionView {
        self.shared.view_tx.borrow().clone()
    }

    /// A new receiver of view changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.shared.view_tx.subscribe()
    }

    /// Returns `true` while a connection is open.
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_open)
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("server_url", &self.config.server_url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        // No executor to drive a graceful close from `Drop`; abort instead.
        if let Some(task) = self.connection.as_mut().and_then(|c| c.task.take()) {
            task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Background loop owning one connection's transport.
///
/// Exits when:
/// - the shutdown signal fires or the command channel closes
/// - the transport returns `None` (server closed the socket)
/// - a transport error occurs
///
/// Every exit path marks the connection closed and applies
/// [`SessionEvent::Closed`].
async fn transport_loop(
    mut transport: Box<dyn Transport>,
    mut cmd_rx: mpsc::UnboundedReceiver<String>,
    shared: Arc<Shared>,
    open: Arc<AtomicBool>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("transport loop started");
    shared.dispatch(SessionEvent::Opened);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(frame) => {
                        if let Err(e) = transport.send(frame).await {
                            error!("transport send error: {e}");
                            mark_closed(&shared, &open, Some(format!("transport send error: {e}")));
                            break;
                        }
                    }
                    None => {
                        debug!("command channel closed, shutting down transport loop");
                        let _ = transport.close().await;
                        mark_closed(&shared, &open, Some("session dropped".into()));
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                mark_closed(&shared, &open, Some("disconnected by client".into()));
                break;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => shared.dispatch(SessionEvent::Frame(text)),
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        mark_closed(&shared, &open, Some(format!("transport receive error: {e}")));
                        break;
                    }
                    None => {
                        info!("game connection closed by server");
                        mark_closed(&shared, &open, None);
                        break;
                    }
                }
            }
        }
    }

    debug!("transport loop exited");
}

/// Flag the connection closed, then reset the view.
fn mark_closed(shared: &Arc<Shared>, open: &AtomicBool, reason: Option<String>) {
    open.store(false, Ordering::Release);
    debug!(
        reason = reason.as_deref().unwrap_or("closed by server"),
        "game connection closed"
    );
    shared.dispatch(SessionEvent::Closed { reason });
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use crate::protocol::LeaderboardEntry;
    use crate::view::{ConnectionStatus, STATUS_AWAITING_OPPONENT, STATUS_DISCONNECTED};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    // ── Mocks ───────────────────────────────────────────────────────

    /// A transport whose `recv` never yields and whose `close` hangs, to
    /// exercise the abort path.
    struct StuckTransport;

    #[async_trait]
    impl Transport for StuckTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), SessionError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, SessionError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), SessionError> {
            std::future::pending().await
        }
    }

    struct StuckConnector;

    #[async_trait]
    impl Connector for StuckConnector {
        async fn connect(
            &self,
            _url: &str,
        ) -> std::result::Result<Box<dyn Transport>, SessionError> {
            Ok(Box::new(StuckTransport))
        }
    }

    /// Never completes the handshake.
    struct HangingConnector;

    #[async_trait]
    impl Connector for HangingConnector {
        async fn connect(
            &self,
            _url: &str,
        ) -> std::result::Result<Box<dyn Transport>, SessionError> {
            std::future::pending().await
        }
    }

    #[derive(Clone, Default)]
    struct CountingLeaderboard {
        calls: Arc<AtomicUsize>,
        entries: Arc<StdMutex<Vec<LeaderboardEntry>>>,
    }

    #[async_trait]
    impl LeaderboardSource for CountingLeaderboard {
        async fn fetch(&self) -> Result<Vec<LeaderboardEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.lock().unwrap().clone())
        }
    }

    fn config() -> SessionConfig {
        SessionConfig::new("http://localhost:8080")
            .with_connect_timeout(Duration::from_millis(50))
            .with_shutdown_timeout(Duration::from_millis(50))
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn start_fetches_leaderboard_once() {
        let leaderboard = CountingLeaderboard::default();
        leaderboard.entries.lock().unwrap().push(LeaderboardEntry {
            username: "carol".into(),
            wins: 2,
        });
        let (session, mut view) = GameSession::start(config(), StuckConnector, leaderboard.clone());

        let current = view.wait_for(|v| !v.leaderboard.is_empty()).await.unwrap().clone();
        assert_eq!(current.leaderboard[0].username, "carol");
        assert_eq!(leaderboard.calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn blank_username_is_rejected_without_io() {
        let (mut session, _view) =
            GameSession::start(config(), StuckConnector, CountingLeaderboard::default());
        let err = session.connect("   ").await.unwrap_err();
        assert!(matches!(err, SessionError::EmptyUsername));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn handshake_timeout_resets_view() {
        let (mut session, _view) =
            GameSession::start(config(), HangingConnector, CountingLeaderboard::default());
        let err = session.connect("alice").await.unwrap_err();
        assert!(matches!(err, SessionError::Timeout));

        let view = session.view();
        assert_eq!(view.connection, ConnectionStatus::Disconnected);
        assert_eq!(view.status, STATUS_DISCONNECTED);
        assert_eq!(view.username, "alice");
        assert!(!session.is_connected());
        assert!(!session.drop_disc(0));
    }

    #[tokio::test]
    async fn stuck_loop_is_aborted_and_view_reset() {
        let (mut session, mut view) =
            GameSession::start(config(), StuckConnector, CountingLeaderboard::default());
        session.connect("alice").await.unwrap();
        view.wait_for(|v| v.status == STATUS_AWAITING_OPPONENT)
            .await
            .unwrap();

        session.disconnect().await;
        assert!(!session.is_connected());
        assert_eq!(session.view().status, STATUS_DISCONNECTED);
        assert!(session.ping().is_err());
    }
}
