//! Transport implementations for the game socket.
//!
//! | Feature                | Transport              | Connector              |
//! |------------------------|------------------------|------------------------|
//! | `transport-websocket`  | [`WebSocketTransport`] | [`WebSocketConnector`] |
//!
//! # Example
//!
//! ```rust,ignore
//! # async fn example() -> Result<(), four_in_a_row_client::SessionError> {
//! use four_in_a_row_client::{Transport, WebSocketTransport};
//!
//! let mut ws = WebSocketTransport::connect("ws://localhost:8080/ws?username=alice").await?;
//! ws.send(r#"{"type":"ping"}"#.to_string()).await?;
//!
//! if let Some(Ok(msg)) = ws.recv().await {
//!     println!("server said: {msg}");
//! }
//!
//! ws.close().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};
