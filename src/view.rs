//! The session state model: a pure reducer from session events to the
//! published [`SessionView`].
//!
//! Every change to the view goes through [`SessionView::apply`]. The reducer
//! never performs I/O; side effects it wants (a leaderboard refresh) are
//! returned as [`Effect`]s for the caller to run.

use crate::interpreter::{interpret, Inbound, StateUpdate};
use crate::protocol::{Board, GameState, LeaderboardEntry};

/// Status shown before the first connect.
pub const STATUS_IDLE: &str = "Enter a username to start";
/// Status shown once the socket is open and no snapshot has arrived yet.
pub const STATUS_AWAITING_OPPONENT: &str = "awaiting opponent";
/// Status shown after the socket closed.
pub const STATUS_DISCONNECTED: &str = "disconnected";
pub const STATUS_YOUR_TURN: &str = "Your turn";
pub const STATUS_DRAW: &str = "Draw";
pub const STATUS_YOU_WON: &str = "You won!";
/// Status for a finished game whose winner index names no seat.
pub const STATUS_UNKNOWN_OUTCOME: &str = "Game over";

/// Whether the session currently holds an open socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

/// Result of the current game as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// No game, or the game is still running.
    #[default]
    Ongoing,
    /// Finished without a winner.
    Draw,
    /// Finished with a winner in one of the two seats.
    Decided,
    /// The server named a winner index outside `1..=2`.
    Unknown,
}

impl Outcome {
    /// Classify a snapshot.
    pub fn of(state: &GameState) -> Self {
        if state.has_invalid_winner() {
            Outcome::Unknown
        } else if !state.done {
            Outcome::Ongoing
        } else if state.winner == 0 {
            Outcome::Draw
        } else {
            Outcome::Decided
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::Ongoing)
    }
}

/// Everything the view layer renders, derived from protocol events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Local username supplied to the last `connect`.
    pub username: String,
    pub connection: ConnectionStatus,
    pub status: String,
    pub board: Board,
    pub game_id: String,
    pub your_turn: bool,
    /// Opponent's username, empty while unknown.
    pub opponent: String,
    /// Winner's username, empty while there is none.
    pub winner: String,
    pub outcome: Outcome,
    /// The server rejoined us to a game that was already running.
    pub reconnected: bool,
    /// Why the latest snapshot was broadcast (`"forfeit"` when the opponent
    /// left and the game was awarded), empty for ordinary moves.
    pub notice: String,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            username: String::new(),
            connection: ConnectionStatus::Disconnected,
            status: STATUS_IDLE.to_string(),
            board: Board::default(),
            game_id: String::new(),
            your_turn: false,
            opponent: String::new(),
            winner: String::new(),
            outcome: Outcome::Ongoing,
            reconnected: false,
            notice: String::new(),
            leaderboard: Vec::new(),
        }
    }
}

/// Inputs to the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// An explicit connect was issued for `username`.
    Connecting { username: String },
    /// The socket finished its handshake.
    Opened,
    /// A raw inbound frame.
    Frame(String),
    /// The socket closed, cleanly or not. The reason is for logging only;
    /// every close resets the view the same way.
    Closed { reason: Option<String> },
    /// A standings fetch completed successfully.
    LeaderboardLoaded(Vec<LeaderboardEntry>),
}

/// A side effect requested by the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    FetchLeaderboard,
}

/// The reducer's output: the next view plus any effects to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub view: SessionView,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(view: SessionView) -> Self {
        Self {
            view,
            effects: Vec::new(),
        }
    }
}

impl SessionView {
    /// Returns `true` if a move may be sent right now as far as the view knows.
    ///
    /// The session additionally requires an open socket.
    pub fn can_drop(&self) -> bool {
        self.connection == ConnectionStatus::Connected
            && self.your_turn
            && self.outcome == Outcome::Ongoing
            && self.winner.is_empty()
    }

    /// Compute the view that follows `event`.
    pub fn apply(&self, event: SessionEvent) -> Transition {
        match event {
            SessionEvent::Connecting { username } => Transition::to(Self {
                username,
                ..self.clone()
            }),
            SessionEvent::Opened => Transition::to(Self {
                connection: ConnectionStatus::Connected,
                status: STATUS_AWAITING_OPPONENT.to_string(),
                ..self.clone()
            }),
            SessionEvent::Frame(frame) => match interpret(&frame) {
                Some(Inbound::State(update)) => self.with_snapshot(update),
                Some(Inbound::ServerError(error)) => Transition::to(Self {
                    status: error,
                    ..self.clone()
                }),
                Some(Inbound::Ignored) | None => Transition::to(self.clone()),
            },
            SessionEvent::Closed { .. } => Transition::to(self.reset()),
            SessionEvent::LeaderboardLoaded(leaderboard) => Transition::to(Self {
                leaderboard,
                ..self.clone()
            }),
        }
    }

    /// Disconnected defaults, keeping the username and the standings.
    fn reset(&self) -> Self {
        Self {
            username: self.username.clone(),
            leaderboard: self.leaderboard.clone(),
            status: STATUS_DISCONNECTED.to_string(),
            ..Self::default()
        }
    }

    fn with_snapshot(&self, update: StateUpdate) -> Transition {
        let StateUpdate {
            game_id,
            your_turn,
            opponent,
            state,
            reconnect,
            message,
        } = update;

        let game_id = game_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| state.id.clone());
        let opponent = opponent.unwrap_or_default();
        let winner = state
            .winning_player()
            .map(|player| player.username.clone())
            .unwrap_or_default();
        let outcome = Outcome::of(&state);

        if outcome == Outcome::Unknown {
            tracing::warn!(
                game_id = %game_id,
                winner = state.winner,
                "snapshot names a winner outside the two seats"
            );
        }

        let status = match outcome {
            Outcome::Draw => STATUS_DRAW.to_string(),
            Outcome::Decided if winner == self.username => STATUS_YOU_WON.to_string(),
            Outcome::Decided => format!("{winner} won"),
            Outcome::Unknown => STATUS_UNKNOWN_OUTCOME.to_string(),
            Outcome::Ongoing if your_turn => STATUS_YOUR_TURN.to_string(),
            Outcome::Ongoing => {
                let waiting_on = if opponent.is_empty() {
                    "opponent"
                } else {
                    opponent.as_str()
                };
                format!("Waiting for {waiting_on}")
            }
        };

        // Only the transition into a decided game refreshes the standings; a
        // redelivered final snapshot of the same game does not.
        let newly_decided = outcome == Outcome::Decided
            && !(self.outcome == Outcome::Decided && self.game_id == game_id);

        let view = Self {
            username: self.username.clone(),
            connection: self.connection,
            status,
            board: state.board,
            game_id,
            your_turn,
            opponent,
            winner,
            outcome,
            reconnected: reconnect,
            notice: message.unwrap_or_default(),
            leaderboard: self.leaderboard.clone(),
        };

        Transition {
            view,
            effects: if newly_decided {
                vec![Effect::FetchLeaderboard]
            } else {
                Vec::new()
            },
        }
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
    use crate::protocol::Cell;
    use serde_json::json;

    fn snapshot(winner: i32, done: bool) -> serde_json::Value {
        json!({
            "id": "g1",
            "players": [{"username": "alice"}, {"username": "bob"}],
            "board": {"cells": vec![vec![0; 7]; 6]},
            "turn": 1,
            "winner": winner,
            "done": done,
        })
    }

    fn state_frame(your_turn: bool, opponent: Option<&str>, state: serde_json::Value) -> SessionEvent {
        let mut msg = json!({"type": "state", "yourTurn": your_turn, "state": state});
        if let Some(opponent) = opponent {
            msg["opponent"] = json!(opponent);
        }
        SessionEvent::Frame(msg.to_string())
    }

    /// A connected view for `alice`.
    fn alice() -> SessionView {
        let view = SessionView::default()
            .apply(SessionEvent::Connecting {
                username: "alice".into(),
            })
            .view;
        view.apply(SessionEvent::Opened).view
    }

    #[test]
    fn defaults_are_disconnected() {
        let view = SessionView::default();
        assert_eq!(view.connection, ConnectionStatus::Disconnected);
        assert_eq!(view.status, STATUS_IDLE);
        assert!(view.board.is_empty());
        assert!(!view.can_drop());
    }

    #[test]
    fn opened_awaits_opponent() {
        let view = alice();
        assert_eq!(view.username, "alice");
        assert_eq!(view.connection, ConnectionStatus::Connected);
        assert_eq!(view.status, STATUS_AWAITING_OPPONENT);
    }

    #[test]
    fn first_snapshot_populates_view() {
        let t = alice().apply(state_frame(true, Some("bob"), snapshot(0, false)));
        assert!(t.effects.is_empty());
        let view = t.view;
        assert!(view.board.is_empty());
        assert_eq!(view.game_id, "g1");
        assert_eq!(view.opponent, "bob");
        assert_eq!(view.status, "Your turn");
        assert_eq!(view.winner, "");
        assert_eq!(view.outcome, Outcome::Ongoing);
        assert!(view.can_drop());
    }

    #[test]
    fn waiting_status_names_opponent_or_falls_back() {
        let view = alice()
            .apply(state_frame(false, Some("bob"), snapshot(0, false)))
            .view;
        assert_eq!(view.status, "Waiting for bob");
        assert!(!view.can_drop());

        let view = alice().apply(state_frame(false, None, snapshot(0, false))).view;
        assert_eq!(view.status, "Waiting for opponent");

        let view = alice()
            .apply(state_frame(false, Some(""), snapshot(0, false)))
            .view;
        assert_eq!(view.status, "Waiting for opponent");
    }

    #[test]
    fn game_id_prefers_message_field() {
        let frame = json!({
            "type": "state", "gameId": "outer", "yourTurn": true, "state": snapshot(0, false)
        });
        let view = alice().apply(SessionEvent::Frame(frame.to_string())).view;
        assert_eq!(view.game_id, "outer");
    }

    #[test]
    fn board_is_replaced_wholesale() {
        let mut state = snapshot(0, false);
        state["board"]["cells"][5][0] = json!(1);
        state["board"]["cells"][5][1] = json!(2);
        let view = alice().apply(state_frame(true, Some("bob"), state)).view;
        assert_eq!(view.board.cells[5][0], Cell::PlayerOne);
        assert_eq!(view.board.cells[5][1], Cell::PlayerTwo);

        let view = view.apply(state_frame(true, Some("bob"), snapshot(0, false))).view;
        assert!(view.board.is_empty());
    }

    #[test]
    fn draw_has_no_winner_and_no_fetch() {
        let t = alice().apply(state_frame(false, Some("bob"), snapshot(0, true)));
        assert_eq!(t.view.status, "Draw");
        assert_eq!(t.view.winner, "");
        assert_eq!(t.view.outcome, Outcome::Draw);
        assert!(t.effects.is_empty());
        assert!(!t.view.can_drop());
    }

    #[test]
    fn local_win_and_remote_win() {
        let t = alice().apply(state_frame(false, Some("bob"), snapshot(1, true)));
        assert_eq!(t.view.status, "You won!");
        assert_eq!(t.view.winner, "alice");
        assert_eq!(t.effects, vec![Effect::FetchLeaderboard]);

        let t = alice().apply(state_frame(false, Some("bob"), snapshot(2, true)));
        assert_eq!(t.view.status, "bob won");
        assert_eq!(t.view.winner, "bob");
        assert_eq!(t.effects, vec![Effect::FetchLeaderboard]);
    }

    #[test]
    fn redelivered_final_snapshot_fetches_once() {
        let view = alice()
            .apply(state_frame(true, Some("bob"), snapshot(0, false)))
            .view;
        let first = view.apply(state_frame(false, Some("bob"), snapshot(2, true)));
        assert_eq!(first.effects, vec![Effect::FetchLeaderboard]);

        let again = first
            .view
            .apply(state_frame(false, Some("bob"), snapshot(2, true)));
        assert!(again.effects.is_empty());
        assert_eq!(again.view.status, "bob won");
    }

    #[test]
    fn new_game_after_a_win_fetches_again() {
        let view = alice()
            .apply(state_frame(false, Some("bob"), snapshot(1, true)))
            .view;
        let mut next = snapshot(2, true);
        next["id"] = json!("g2");
        let t = view.apply(state_frame(false, Some("bob"), next));
        assert_eq!(t.view.game_id, "g2");
        assert_eq!(t.effects, vec![Effect::FetchLeaderboard]);
    }

    #[test]
    fn out_of_range_winner_fails_closed() {
        for winner in [3, -1, 99] {
            let t = alice().apply(state_frame(true, Some("bob"), snapshot(winner, true)));
            assert_eq!(t.view.outcome, Outcome::Unknown, "winner={winner}");
            assert_eq!(t.view.winner, "");
            assert_eq!(t.view.status, STATUS_UNKNOWN_OUTCOME);
            assert!(t.effects.is_empty());
            assert!(!t.view.can_drop());
        }

        let t = alice().apply(state_frame(true, Some("bob"), snapshot(7, false)));
        assert_eq!(t.view.outcome, Outcome::Unknown);
        assert!(!t.view.can_drop());
    }

    #[test]
    fn server_error_only_touches_status() {
        let before = alice()
            .apply(state_frame(true, Some("bob"), snapshot(0, false)))
            .view;
        let after = before
            .apply(SessionEvent::Frame(
                r#"{"type":"error","error":"not your turn"}"#.into(),
            ))
            .view;
        assert_eq!(after.status, "not your turn");
        assert_eq!(
            SessionView {
                status: before.status.clone(),
                ..after
            },
            before
        );
    }

    #[test]
    fn malformed_frame_leaves_view_unchanged() {
        let before = alice()
            .apply(state_frame(true, Some("bob"), snapshot(0, false)))
            .view;
        for junk in ["{not json", "42", r#"{"type":"state"}"#, ""] {
            let t = before.apply(SessionEvent::Frame(junk.into()));
            assert_eq!(t.view, before, "frame {junk:?}");
            assert!(t.effects.is_empty());
        }
    }

    #[test]
    fn close_resets_game_but_keeps_identity_and_standings() {
        let standings = vec![LeaderboardEntry {
            username: "alice".into(),
            wins: 3,
        }];
        let view = alice()
            .apply(SessionEvent::LeaderboardLoaded(standings.clone()))
            .view
            .apply(state_frame(true, Some("bob"), snapshot(1, true)))
            .view;

        let closed = view
            .apply(SessionEvent::Closed {
                reason: Some("server went away".into()),
            })
            .view;
        assert_eq!(closed.connection, ConnectionStatus::Disconnected);
        assert_eq!(closed.status, STATUS_DISCONNECTED);
        assert!(closed.board.is_empty());
        assert_eq!(closed.game_id, "");
        assert_eq!(closed.opponent, "");
        assert_eq!(closed.winner, "");
        assert!(!closed.your_turn);
        assert_eq!(closed.outcome, Outcome::Ongoing);
        assert_eq!(closed.username, "alice");
        assert_eq!(closed.leaderboard, standings);
    }

    #[test]
    fn close_reason_does_not_change_the_reset() {
        let view = alice()
            .apply(state_frame(true, Some("bob"), snapshot(0, false)))
            .view;
        let clean = view.apply(SessionEvent::Closed { reason: None });
        let failed = view.apply(SessionEvent::Closed {
            reason: Some("transport receive error: reset".into()),
        });
        assert_eq!(clean, failed);
    }

    #[test]
    fn forfeit_notice_is_shown_and_replaced() {
        let mut forfeit = json!({
            "type": "state", "gameId": "g1", "opponent": "bob", "state": snapshot(2, true)
        });
        forfeit["message"] = json!("forfeit");
        let t = alice().apply(SessionEvent::Frame(forfeit.to_string()));
        assert_eq!(t.view.notice, "forfeit");
        assert_eq!(t.view.status, "bob won");
        assert_eq!(t.effects, vec![Effect::FetchLeaderboard]);

        // The next snapshot carries no message and clears the notice.
        let mut next = snapshot(0, false);
        next["id"] = json!("g2");
        let after = t.view.apply(state_frame(true, Some("bob"), next)).view;
        assert_eq!(after.notice, "");

        let closed = t.view.apply(SessionEvent::Closed { reason: None }).view;
        assert_eq!(closed.notice, "");
    }

    #[test]
    fn reconnect_flag_is_carried() {
        let frame = json!({
            "type": "state", "yourTurn": false, "reconnect": true, "state": snapshot(0, false)
        });
        let view = alice().apply(SessionEvent::Frame(frame.to_string())).view;
        assert!(view.reconnected);
    }
}
