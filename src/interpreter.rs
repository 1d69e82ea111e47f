//! Decoding of raw inbound frames into session inputs.
//!
//! [`interpret`] never fails loudly: a frame that does not decode is logged
//! and dropped, and the caller leaves its state untouched. Frames are not
//! buffered or retried.

use tracing::{debug, warn};

use crate::protocol::{GameState, ServerMessage};

/// A `state` frame, reduced to what the session model consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    pub game_id: Option<String>,
    pub your_turn: bool,
    pub opponent: Option<String>,
    pub state: GameState,
    pub reconnect: bool,
    /// Broadcast reason, e.g. `"forfeit"`.
    pub message: Option<String>,
}

/// A successfully decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A new authoritative snapshot.
    State(StateUpdate),
    /// The server rejected something; the text is shown verbatim.
    ServerError(String),
    /// A well-formed frame that carries nothing for the session view.
    Ignored,
}

/// Decode one inbound frame.
///
/// Returns `None` when the frame is malformed (not JSON, missing fields,
/// wrong board shape, ...).
pub fn interpret(frame: &str) -> Option<Inbound> {
    let message = match serde_json::from_str::<ServerMessage>(frame) {
        Ok(message) => message,
        Err(e) => {
            warn!("failed to deserialize server message: {e}; raw: {frame}");
            return None;
        }
    };

    Some(match message {
        ServerMessage::State {
            game_id,
            your_turn,
            opponent,
            state,
            reconnect,
            message,
        } => Inbound::State(StateUpdate {
            game_id,
            your_turn,
            opponent,
            state: *state,
            reconnect,
            message,
        }),
        ServerMessage::Error { error } => Inbound::ServerError(error),
        ServerMessage::Pong => {
            debug!("received pong");
            Inbound::Ignored
        }
        ServerMessage::Unknown => {
            debug!("ignoring unknown server message kind");
            Inbound::Ignored
        }
    })
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

    const EMPTY_ROW: &str = "[0,0,0,0,0,0,0]";

    fn board_json(rows: &[&str]) -> String {
        format!("{{\"cells\":[{}]}}", rows.join(","))
    }

    fn state_frame(board: &str) -> String {
        format!(
            r#"{{"type":"state","gameId":"g1","yourTurn":true,"opponent":"bob",
                "state":{{"id":"g1","players":[{{"username":"alice"}},{{"username":"bob"}}],
                "board":{board},"turn":1,"winner":0,"done":false}}}}"#
        )
    }

    #[test]
    fn state_frame_decodes() {
        let mut rows = vec![EMPTY_ROW; 6];
        rows[5] = "[0,0,0,1,0,0,0]";
        let frame = state_frame(&board_json(&rows));

        let Some(Inbound::State(update)) = interpret(&frame) else {
            panic!("expected state update");
        };
        assert_eq!(update.game_id.as_deref(), Some("g1"));
        assert!(update.your_turn);
        assert_eq!(update.opponent.as_deref(), Some("bob"));
        assert!(!update.reconnect);
        assert!(update.message.is_none());
        assert_eq!(update.state.board.cells[5][3], Cell::PlayerOne);
        assert_eq!(update.state.players[1].username, "bob");
    }

    #[test]
    fn forfeit_reason_is_carried() {
        let frame = state_frame(&board_json(&[EMPTY_ROW; 6]))
            .replacen(r#""type":"state","#, r#""type":"state","message":"forfeit","#, 1);
        let Some(Inbound::State(update)) = interpret(&frame) else {
            panic!("expected state update");
        };
        assert_eq!(update.message.as_deref(), Some("forfeit"));
    }

    #[test]
    fn error_frame_carries_literal_text() {
        let inbound = interpret(r#"{"type":"error","error":"column is full"}"#);
        assert_eq!(inbound, Some(Inbound::ServerError("column is full".into())));
    }

    #[test]
    fn pong_and_unknown_kinds_are_ignored() {
        assert_eq!(interpret(r#"{"type":"pong"}"#), Some(Inbound::Ignored));
        assert_eq!(
            interpret(r#"{"type":"chat","message":"hi"}"#),
            Some(Inbound::Ignored)
        );
    }

    #[test]
    fn malformed_frames_are_dropped() {
        assert_eq!(interpret("not json"), None);
        assert_eq!(interpret(""), None);
        assert_eq!(interpret(r#"{"no_type":true}"#), None);
        // `state` kind without the embedded snapshot.
        assert_eq!(interpret(r#"{"type":"state","yourTurn":true}"#), None);
    }

    #[test]
    fn board_with_wrong_shape_is_dropped() {
        let five_rows = board_json(&[EMPTY_ROW; 5]);
        assert_eq!(interpret(&state_frame(&five_rows)), None);

        let mut rows = vec![EMPTY_ROW; 6];
        rows[0] = "[0,0,0,0,0,0]";
        assert_eq!(interpret(&state_frame(&board_json(&rows))), None);
    }

    #[test]
    fn board_with_unknown_cell_value_is_dropped() {
        let mut rows = vec![EMPTY_ROW; 6];
        rows[2] = "[0,0,3,0,0,0,0]";
        assert_eq!(interpret(&state_frame(&board_json(&rows))), None);
    }
}
