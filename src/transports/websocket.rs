//! Game socket over `tokio-tungstenite`.
//!
//! `ws://` and `wss://` endpoints both work; TLS goes through
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream). Only text frames
//! carry protocol messages. Binary frames are logged and skipped, and
//! control frames are left to tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::transport::{Connector, Transport};

/// The stream type produced by [`tokio_tungstenite::connect_async`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Handshake failures surface as [`SessionError::Io`], keeping the I/O kind
/// when tungstenite has one.
fn handshake_error(err: tungstenite::Error) -> SessionError {
    let kind = match &err {
        tungstenite::Error::Io(io) => io.kind(),
        _ => std::io::ErrorKind::Other,
    };
    SessionError::Io(std::io::Error::new(kind, err))
}

/// One open game socket.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a socket to `url` (already carrying the `username` query).
    ///
    /// # Errors
    ///
    /// [`SessionError::Io`] if the URL is malformed or the handshake fails.
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        debug!(url = %url, "opening game socket");
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(handshake_error)?;
        info!(url = %url, status = %response.status(), "game socket open");
        Ok(Self::from_stream(stream))
    }

    /// Adopt a stream opened elsewhere, e.g. with custom TLS or headers.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }

    // `StreamExt::next` is cancel-safe, so this is too.
    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        while let Some(next) = self.stream.next().await {
            match next {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "server sent close frame");
                    return None;
                }
                Ok(Message::Binary(bytes)) => {
                    warn!(len = bytes.len(), "skipping binary frame");
                }
                // Ping/pong and raw frames.
                Ok(_) => {}
                Err(e) => return Some(Err(SessionError::TransportReceive(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.stream
            .close(None)
            .await
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }
}

/// Opens a [`WebSocketTransport`] for every `connect`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, SessionError> {
        Ok(Box::new(WebSocketTransport::connect(url).await?))
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
    use crate::config::SessionConfig;
    use crate::leaderboard::LeaderboardSource;
    use crate::protocol::LeaderboardEntry;
    use crate::session::GameSession;
    use crate::view::ConnectionStatus;

    use serde_json::json;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
    use tokio_tungstenite::WebSocketStream;

    type ServerSocket = WebSocketStream<TcpStream>;

    /// Accept one socket, hand the request path+query to `handler` along
    /// with the stream, and return the base address.
    async fn serve_once<F, Fut>(handler: F) -> String
    where
        F: FnOnce(String, ServerSocket) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut target = String::new();
            let ws = tokio_tungstenite::accept_hdr_async(tcp, |req: &Request, resp: Response| {
                target = req.uri().to_string();
                Ok(resp)
            })
            .await
            .unwrap();
            handler(target, ws).await;
        });

        addr.to_string()
    }

    struct NoStandings;

    #[async_trait]
    impl LeaderboardSource for NoStandings {
        async fn fetch(&self) -> Result<Vec<LeaderboardEntry>, SessionError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn malformed_url_is_io_error() {
        let err = WebSocketTransport::connect("definitely not a url")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }

    #[tokio::test]
    async fn refused_connection_keeps_io_kind() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1")
            .await
            .unwrap_err();
        let SessionError::Io(io) = err else {
            panic!("expected Io, got {err:?}");
        };
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
    }

    #[tokio::test]
    async fn text_frames_arrive_in_order_and_binary_is_skipped() {
        let addr = serve_once(|_, mut ws| async move {
            ws.send(Message::Text(r#"{"type":"pong"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"error","error":"x"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&format!("ws://{addr}"))
            .await
            .unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), r#"{"type":"pong"}"#);
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"error","error":"x"}"#
        );
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_is_rejected() {
        let addr =
            serve_once(|_, mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&format!("ws://{addr}"))
            .await
            .unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("late".to_string()).await.unwrap_err();
        assert!(matches!(err, SessionError::TransportClosed));
    }

    #[tokio::test]
    async fn session_plays_a_move_over_websocket() {
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel::<(String, String)>();
        let addr = serve_once(|target, mut ws| async move {
            let state = json!({
                "type": "state",
                "gameId": "g1",
                "yourTurn": true,
                "opponent": "bob",
                "state": {
                    "id": "g1",
                    "board": {"cells": vec![vec![0; 7]; 6]},
                    "players": [{"username": "alice", "isBot": false}, {"username": "bob", "isBot": false}],
                    "turn": 1,
                    "winner": 0,
                    "done": false,
                    "moves": null,
                },
            });
            ws.send(Message::Text(state.to_string().into())).await.unwrap();
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = seen_tx.send((target, text.as_str().to_owned()));
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let config = SessionConfig::new(format!("http://{addr}"));
        let (mut session, mut view) = GameSession::start(config, WebSocketConnector, NoStandings);
        session.connect("alice").await.unwrap();

        view.wait_for(|v| v.can_drop()).await.unwrap();
        assert!(session.drop_disc(3));

        let (target, frame) = seen_rx.await.unwrap();
        assert_eq!(target, "/ws?username=alice");
        assert_eq!(frame, r#"{"type":"move","column":3}"#);

        // The server closes after the move.
        view.wait_for(|v| v.connection == ConnectionStatus::Disconnected)
            .await
            .unwrap();
        assert!(!session.is_connected());
    }
}
