//! Wire-compatible protocol types for the four-in-a-row game server.
//!
//! Every frame is a JSON object tagged by a `"type"` field. Field names follow
//! the server's camelCase spelling (`gameId`, `yourTurn`, `isBot`, ...).
//!
//! The board is decoded into a fixed `6 × 7` array of [`Cell`]s, so a snapshot
//! with the wrong shape or an unknown cell value fails to decode instead of
//! reaching the session state.

use serde::{Deserialize, Deserializer, Serialize};

/// Number of rows on the board.
pub const ROWS: usize = 6;

/// Number of columns on the board.
pub const COLUMNS: usize = 7;

// ── Board ───────────────────────────────────────────────────────────

/// A single board cell. Encoded on the wire as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Cell {
    /// No disc.
    #[default]
    Empty,
    /// Disc of the first player (`players[0]`).
    PlayerOne,
    /// Disc of the second player (`players[1]`).
    PlayerTwo,
}

impl Cell {
    /// Returns `true` if no disc occupies this cell.
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

impl TryFrom<u8> for Cell {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Cell::Empty),
            1 => Ok(Cell::PlayerOne),
            2 => Ok(Cell::PlayerTwo),
            other => Err(format!("invalid cell value {other}, expected 0, 1 or 2")),
        }
    }
}

impl From<Cell> for u8 {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => 0,
            Cell::PlayerOne => 1,
            Cell::PlayerTwo => 2,
        }
    }
}

/// The 6×7 grid, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board {
    pub cells: [[Cell; COLUMNS]; ROWS],
}

impl Board {
    /// Returns the cell at `(row, column)`, or `None` if out of bounds.
    pub fn cell(&self, row: usize, column: usize) -> Option<Cell> {
        self.cells.get(row)?.get(column).copied()
    }

    /// Number of discs on the board.
    pub fn disc_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| !cell.is_empty())
            .count()
    }

    /// Returns `true` if the board holds no discs.
    pub fn is_empty(&self) -> bool {
        self.disc_count() == 0
    }
}

// ── Game snapshot ───────────────────────────────────────────────────

/// A participant in a game.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    /// Set by the server when the seat is filled by its bot.
    #[serde(default, rename = "isBot")]
    pub is_bot: bool,
}

impl Player {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_bot: false,
        }
    }
}

/// A move recorded in the game history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub column: i32,
    pub by: String,
}

/// Authoritative game snapshot pushed by the server.
///
/// Snapshots always replace the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub id: String,
    pub players: [Player; 2],
    pub board: Board,
    /// Player whose move it is: `1` or `2`.
    pub turn: i32,
    /// `0` while undecided (or on a draw), otherwise a 1-based index into `players`.
    pub winner: i32,
    pub done: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub moves: Vec<Move>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl GameState {
    /// Resolves the 1-based `winner` field against `players`.
    ///
    /// Returns `None` when there is no winner or when the index does not
    /// name one of the two seats.
    pub fn winning_player(&self) -> Option<&Player> {
        let index = usize::try_from(self.winner).ok()?.checked_sub(1)?;
        self.players.get(index)
    }

    /// Returns `true` if `winner` is neither `0` nor a valid seat index.
    pub fn has_invalid_winner(&self) -> bool {
        self.winner != 0 && self.winning_player().is_none()
    }
}

/// One row of the standings returned by `GET /leaderboard`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub wins: u32,
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Drop a disc into `column`. The server validates the column.
    Move { column: i32 },
    /// Heartbeat; answered with [`ServerMessage::Pong`].
    Ping,
    /// Restart the server's reconnect grace window for this player.
    Reconnect,
}

impl ClientMessage {
    /// Encode as one JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Serialization`](crate::SessionError::Serialization)
    /// if encoding fails.
    pub fn to_frame(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Message types sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full game snapshot addressed to this client.
    State {
        #[serde(rename = "gameId", default, skip_serializing_if = "Option::is_none")]
        game_id: Option<String>,
        /// The server omits this field when it is `false`.
        #[serde(rename = "yourTurn", default)]
        your_turn: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opponent: Option<String>,
        state: Box<GameState>,
        /// Set when the player rejoined a game that was already running.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        reconnect: bool,
        /// Why the snapshot was broadcast, e.g. `"forfeit"`. Omitted for
        /// ordinary moves.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A request was rejected (illegal move, unknown message, ...).
    Error { error: String },
    /// Reply to [`ClientMessage::Ping`].
    Pong,
    /// Any message kind this client does not understand.
    #[serde(other)]
    Unknown,
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
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

    fn game(winner: i32) -> GameState {
        GameState {
            id: "g1".into(),
            players: [Player::new("alice"), Player::new("bob")],
            board: Board::default(),
            turn: 1,
            winner,
            done: winner != 0,
            moves: vec![],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn winning_player_resolves_one_based_index() {
        assert!(game(0).winning_player().is_none());
        assert_eq!(game(1).winning_player().unwrap().username, "alice");
        assert_eq!(game(2).winning_player().unwrap().username, "bob");
    }

    #[test]
    fn winning_player_is_bounds_checked() {
        for winner in [-1, 3, i32::MAX, i32::MIN] {
            let state = game(winner);
            assert!(state.winning_player().is_none(), "winner={winner}");
            assert!(state.has_invalid_winner(), "winner={winner}");
        }
        assert!(!game(0).has_invalid_winner());
        assert!(!game(2).has_invalid_winner());
    }

    #[test]
    fn cell_rejects_values_outside_range() {
        assert_eq!(Cell::try_from(2).unwrap(), Cell::PlayerTwo);
        assert!(Cell::try_from(3).is_err());
    }

    #[test]
    fn client_frames_match_server_shape() {
        assert_eq!(
            ClientMessage::Move { column: 0 }.to_frame().unwrap(),
            r#"{"type":"move","column":0}"#
        );
        assert_eq!(ClientMessage::Ping.to_frame().unwrap(), r#"{"type":"ping"}"#);
        assert_eq!(
            ClientMessage::Reconnect.to_frame().unwrap(),
            r#"{"type":"reconnect"}"#
        );
    }

    #[test]
    fn board_accessors() {
        let mut board = Board::default();
        assert!(board.is_empty());
        board.cells[5][3] = Cell::PlayerOne;
        board.cells[4][3] = Cell::PlayerTwo;
        assert_eq!(board.disc_count(), 2);
        assert_eq!(board.cell(5, 3), Some(Cell::PlayerOne));
        assert_eq!(board.cell(0, 0), Some(Cell::Empty));
        assert_eq!(board.cell(ROWS, 0), None);
        assert_eq!(board.cell(0, COLUMNS), None);
    }
}
