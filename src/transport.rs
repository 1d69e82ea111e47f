//! Seams between the session and the network.
//!
//! A [`Connector`] opens one [`Transport`] per explicit `connect`, given the
//! per-user endpoint URL. The session's transport loop then owns that
//! transport until the socket closes. Frames are JSON text; framing is the
//! transport's business.
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use four_in_a_row_client::{Connector, SessionError, Transport};
//!
//! struct Loopback;
//!
//! #[async_trait]
//! impl Transport for Loopback {
//!     async fn send(&mut self, _frame: String) -> Result<(), SessionError> {
//!         Ok(())
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, SessionError>> {
//!         None
//!     }
//!
//!     async fn close(&mut self) -> Result<(), SessionError> {
//!         Ok(())
//!     }
//! }
//!
//! struct LoopbackConnector;
//!
//! #[async_trait]
//! impl Connector for LoopbackConnector {
//!     async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>, SessionError> {
//!         Ok(Box::new(Loopback))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::SessionError;

/// One open, bidirectional text connection.
///
/// `recv` is polled inside `tokio::select!` next to the command channel, so
/// it must be cancel-safe: dropping its future must not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one JSON frame.
    ///
    /// # Errors
    ///
    /// [`SessionError::TransportSend`] on failure, or
    /// [`SessionError::TransportClosed`] once [`close`](Transport::close) ran.
    async fn send(&mut self, message: String) -> Result<(), SessionError>;

    /// Next JSON frame from the server; `None` once the server closed the
    /// connection, `Some(Err(_))` on a transport failure.
    async fn recv(&mut self) -> Option<Result<String, SessionError>>;

    /// Close gracefully. Idempotent.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens transports to the game endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Complete a handshake with `url`, which already carries the
    /// `username` query parameter.
    ///
    /// # Errors
    ///
    /// Whatever prevented the handshake.
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, SessionError>;
}
