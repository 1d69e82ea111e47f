//! # Four-in-a-Row Client
//!
//! Client-side session engine for real-time four-in-a-row games.
//!
//! A [`GameSession`] owns the connection to the game server, turns every
//! inbound frame into an updated [`SessionView`] (board, turn flag, status
//! text, opponent, winner, standings), and gates outbound moves on the
//! current turn and outcome. The server stays authoritative; the session only
//! mirrors its snapshots.
//!
//! ## Features
//!
//! - **Pure reducer**: [`SessionView::apply`] derives the next view from a
//!   [`SessionEvent`] with no I/O, so game logic is testable without a network
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for
//!   any backend
//! - **WebSocket built-in**: the default `transport-websocket` feature
//!   provides [`WebSocketConnector`]
//! - **Leaderboard**: standings are read over HTTP at start and after every
//!   decided game
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), four_in_a_row_client::SessionError> {
//! use four_in_a_row_client::{GameSession, SessionConfig};
//!
//! let config = SessionConfig::new("http://localhost:8080");
//! let (mut session, mut view) = GameSession::start_websocket(config)?;
//! session.connect("alice").await?;
//!
//! while view.changed().await.is_ok() {
//!     let current = view.borrow_and_update().clone();
//!     println!("{}", current.status);
//!     if current.can_drop() {
//!         session.drop_disc(3);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod interpreter;
pub mod leaderboard;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod transports;
pub mod view;

// Re-export primary types for ergonomic imports.
pub use config::SessionConfig;
pub use error::SessionError;
pub use leaderboard::{HttpLeaderboard, LeaderboardSource};
pub use protocol::{Board, Cell, ClientMessage, GameState, LeaderboardEntry, Player, ServerMessage};
pub use session::GameSession;
pub use transport::{Connector, Transport};
pub use view::{ConnectionStatus, Outcome, SessionEvent, SessionView};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
