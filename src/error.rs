//! Error types for the four-in-a-row session engine.

use thiserror::Error;

/// Errors that can occur while running a game session.
///
/// None of these are fatal to the process. Transport failures leave the
/// session in a clean disconnected state and the caller may simply
/// [`connect`](crate::GameSession::connect) again.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to send a frame through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was already closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires a live connection.
    #[error("not connected to server")]
    NotConnected,

    /// `connect` was called without a username.
    #[error("username must not be empty")]
    EmptyUsername,

    /// The configured server URL cannot be turned into a game endpoint.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The standings request failed (network, HTTP status, or decode).
    #[error("leaderboard fetch failed: {0}")]
    Leaderboard(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
