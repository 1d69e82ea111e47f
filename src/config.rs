//! Session configuration and endpoint derivation.

use std::time::Duration;

use reqwest::Url;

use crate::error::{Result, SessionError};

/// Default path of the game WebSocket endpoint.
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Default path of the standings endpoint.
pub const DEFAULT_LEADERBOARD_PATH: &str = "/leaderboard";

/// Default timeout for opening the game connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the graceful shutdown of a connection.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a [`GameSession`](crate::GameSession).
///
/// The only required field is `server_url`, the HTTP base URL of the game
/// server (e.g. `http://localhost:8080`). The game socket endpoint is derived
/// from it by switching the scheme to `ws`/`wss`.
///
/// # Example
///
/// ```
/// use four_in_a_row_client::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::new("https://play.example.com")
///     .with_connect_timeout(Duration::from_secs(3));
///
/// let url = config.game_endpoint("alice").unwrap();
/// assert_eq!(url.as_str(), "wss://play.example.com/ws?username=alice");
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the game server (`http`, `https`, `ws` or `wss`).
    pub server_url: String,
    /// Path of the game socket endpoint. Defaults to `/ws`.
    pub ws_path: String,
    /// Path of the standings endpoint. Defaults to `/leaderboard`.
    pub leaderboard_path: String,
    /// How long `connect` waits for the socket handshake.
    ///
    /// Defaults to **10 seconds**.
    pub connect_timeout: Duration,
    /// How long a replaced or disconnected connection gets to close
    /// gracefully before its transport loop is aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl SessionConfig {
    /// Create a new configuration for the given server with default values.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ws_path: DEFAULT_WS_PATH.to_string(),
            leaderboard_path: DEFAULT_LEADERBOARD_PATH.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_ws_path(mut self, path: impl Into<String>) -> Self {
        self.ws_path = path.into();
        self
    }

    #[must_use]
    pub fn with_leaderboard_path(mut self, path: impl Into<String>) -> Self {
        self.leaderboard_path = path.into();
        self
    }

    /// Set the connect timeout. A zero duration is raised to 1 ms.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Set the graceful shutdown timeout. Zero aborts immediately.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// The game socket URL for `username`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidEndpoint`] if `server_url` does not
    /// parse or uses an unsupported scheme.
    pub fn game_endpoint(&self, username: &str) -> Result<Url> {
        let mut url = self.base_url()?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(SessionError::InvalidEndpoint(format!(
                    "unsupported scheme `{other}` in {}",
                    self.server_url
                )))
            }
        };
        url.set_scheme(scheme).map_err(|()| {
            SessionError::InvalidEndpoint(format!("cannot use {scheme} for {}", self.server_url))
        })?;
        url.set_path(&self.ws_path);
        url.query_pairs_mut()
            .clear()
            .append_pair("username", username);
        Ok(url)
    }

    /// The standings URL.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidEndpoint`] if `server_url` does not
    /// parse or uses an unsupported scheme.
    pub fn leaderboard_endpoint(&self) -> Result<Url> {
        let mut url = self.base_url()?;
        let scheme = match url.scheme() {
            "http" | "ws" => "http",
            "https" | "wss" => "https",
            other => {
                return Err(SessionError::InvalidEndpoint(format!(
                    "unsupported scheme `{other}` in {}",
                    self.server_url
                )))
            }
        };
        url.set_scheme(scheme).map_err(|()| {
            SessionError::InvalidEndpoint(format!("cannot use {scheme} for {}", self.server_url))
        })?;
        url.set_path(&self.leaderboard_path);
        url.set_query(None);
        Ok(url)
    }

    fn base_url(&self) -> Result<Url> {
        Url::parse(&self.server_url)
            .map_err(|e| SessionError::InvalidEndpoint(format!("{}: {e}", self.server_url)))
    }
}

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

    #[test]
    fn defaults() {
        let config = SessionConfig::new("http://localhost:8080");
        assert_eq!(config.ws_path, "/ws");
        assert_eq!(config.leaderboard_path, "/leaderboard");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn game_endpoint_switches_scheme() {
        let plain = SessionConfig::new("http://localhost:8080");
        assert_eq!(
            plain.game_endpoint("alice").unwrap().as_str(),
            "ws://localhost:8080/ws?username=alice"
        );

        let tls = SessionConfig::new("https://example.com");
        assert_eq!(
            tls.game_endpoint("alice").unwrap().as_str(),
            "wss://example.com/ws?username=alice"
        );

        let direct = SessionConfig::new("ws://127.0.0.1:9000");
        assert_eq!(
            direct.game_endpoint("bob").unwrap().as_str(),
            "ws://127.0.0.1:9000/ws?username=bob"
        );
    }

    #[test]
    fn game_endpoint_encodes_username() {
        let config = SessionConfig::new("http://localhost:8080");
        let url = config.game_endpoint("al ice&x=1").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("username".into(), "al ice&x=1".into())]);
    }

    #[test]
    fn game_endpoint_replaces_existing_path_and_query() {
        let config = SessionConfig::new("http://localhost:8080/lobby?debug=1").with_ws_path("/game");
        assert_eq!(
            config.game_endpoint("alice").unwrap().as_str(),
            "ws://localhost:8080/game?username=alice"
        );
    }

    #[test]
    fn leaderboard_endpoint_uses_http() {
        let config = SessionConfig::new("wss://example.com");
        assert_eq!(
            config.leaderboard_endpoint().unwrap().as_str(),
            "https://example.com/leaderboard"
        );
    }

    #[test]
    fn invalid_server_urls_are_rejected() {
        let err = SessionConfig::new("not a url")
            .game_endpoint("alice")
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidEndpoint(_)));

        let err = SessionConfig::new("ftp://example.com")
            .leaderboard_endpoint()
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidEndpoint(_)));
    }

    #[test]
    fn zero_connect_timeout_is_clamped() {
        let config = SessionConfig::new("http://x").with_connect_timeout(Duration::ZERO);
        assert_eq!(config.connect_timeout, Duration::from_millis(1));
    }
}
