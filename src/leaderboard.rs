//! Standings side-channel.
//!
//! The leaderboard is read over plain HTTP (`GET /leaderboard`), separately
//! from the game socket. The session fetches it once at start and again after
//! every decided game; failures are logged and the previous standings stay
//! in place.

use async_trait::async_trait;
use reqwest::Url;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::protocol::LeaderboardEntry;

/// A source of standings.
#[async_trait]
pub trait LeaderboardSource: Send + Sync + 'static {
    /// Fetch the current standings in server rank order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Leaderboard`] on network, status or decode
    /// failure.
    async fn fetch(&self) -> Result<Vec<LeaderboardEntry>>;
}

/// Reads standings from the game server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLeaderboard {
    client: reqwest::Client,
    url: Url,
}

impl HttpLeaderboard {
    /// Build a fetcher for the standings endpoint of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidEndpoint`] if the server URL is unusable.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Like [`new`](Self::new) but reuses an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidEndpoint`] if the server URL is unusable.
    pub fn with_client(client: reqwest::Client, config: &SessionConfig) -> Result<Self> {
        Ok(Self {
            client,
            url: config.leaderboard_endpoint()?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl LeaderboardSource for HttpLeaderboard {
    async fn fetch(&self) -> Result<Vec<LeaderboardEntry>> {
        tracing::debug!(url = %self.url, "fetching leaderboard");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SessionError::Leaderboard(e.to_string()))?;

        // The server encodes an empty table as `null`.
        let entries = response
            .json::<Option<Vec<LeaderboardEntry>>>()
            .await
            .map_err(|e| SessionError::Leaderboard(e.to_string()))?;

        Ok(entries.unwrap_or_default())
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
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response and return the base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut tcp, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = tcp.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            tcp.write_all(response.as_bytes()).await.unwrap();
            tcp.shutdown().await.unwrap();
        });

        format!("http://{addr}")
    }

    #[test]
    fn url_is_derived_from_config() {
        let fetcher = HttpLeaderboard::new(&SessionConfig::new("ws://localhost:8080")).unwrap();
        assert_eq!(fetcher.url().as_str(), "http://localhost:8080/leaderboard");
    }

    #[tokio::test]
    async fn fetch_preserves_server_order() {
        let base = serve_once(
            "200 OK",
            r#"[{"username":"carol","wins":9},{"username":"alice","wins":4}]"#,
        )
        .await;
        let fetcher = HttpLeaderboard::new(&SessionConfig::new(base)).unwrap();

        let entries = fetcher.fetch().await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["carol", "alice"]);
        assert_eq!(entries[0].wins, 9);
    }

    #[tokio::test]
    async fn null_body_is_an_empty_table() {
        let base = serve_once("200 OK", "null").await;
        let fetcher = HttpLeaderboard::new(&SessionConfig::new(base)).unwrap();
        assert!(fetcher.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let base = serve_once("500 Internal Server Error", "").await;
        let fetcher = HttpLeaderboard::new(&SessionConfig::new(base)).unwrap();
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, SessionError::Leaderboard(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let base = serve_once("200 OK", r#"{"not":"a list"}"#).await;
        let fetcher = HttpLeaderboard::new(&SessionConfig::new(base)).unwrap();
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, SessionError::Leaderboard(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_reported() {
        let fetcher = HttpLeaderboard::new(&SessionConfig::new("http://127.0.0.1:1")).unwrap();
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, SessionError::Leaderboard(_)));
    }
}
