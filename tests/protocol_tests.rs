#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Protocol serialization tests.
//!
//! Decodes JSON fixtures shaped like real server output (Go's `encoding/json`
//! spelling: omitted zero values, `null` slices, RFC 3339 timestamps) and pins
//! the exact text of every frame the client sends.

use four_in_a_row_client::interpreter::{interpret, Inbound};
use four_in_a_row_client::protocol::{Cell, ClientMessage, GameState, LeaderboardEntry, ServerMessage};

// ════════════════════════════════════════════════════════════════════
// Fixtures
// ════════════════════════════════════════════════════════════════════

/// A mid-game snapshot as the server writes it.
const MID_GAME_STATE: &str = r#"{
    "type": "state",
    "gameId": "4f1c2a",
    "state": {
        "id": "4f1c2a",
        "board": {"cells": [
            [0,0,0,0,0,0,0],
            [0,0,0,0,0,0,0],
            [0,0,0,0,0,0,0],
            [0,0,0,0,0,0,0],
            [0,0,0,2,0,0,0],
            [0,0,1,1,0,0,0]
        ]},
        "players": [
            {"username": "alice", "isBot": false},
            {"username": "bot", "isBot": true}
        ],
        "turn": 2,
        "winner": 0,
        "createdAt": "2024-05-01T12:00:00Z",
        "updatedAt": "2024-05-01T12:00:42.123456789Z",
        "done": false,
        "moves": [
            {"column": 2, "by": "alice"},
            {"column": 3, "by": "bot"},
            {"column": 3, "by": "alice"}
        ]
    },
    "opponent": "bot"
}"#;

fn empty_cells() -> String {
    let row = "[0,0,0,0,0,0,0]";
    format!("[{}]", vec![row; 6].join(","))
}

fn state_json(cells: &str, extra: &str) -> String {
    format!(
        r#"{{
            "id": "g1",
            "board": {{"cells": {cells}}},
            "players": [{{"username": "alice", "isBot": false}}, {{"username": "bob", "isBot": false}}],
            "turn": 1,
            "winner": 0,
            "done": false{extra}
        }}"#
    )
}

// ════════════════════════════════════════════════════════════════════
// ServerMessage fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn fixture_state_from_server() {
    let msg: ServerMessage = serde_json::from_str(MID_GAME_STATE).expect("deserialize");
    let ServerMessage::State {
        game_id,
        your_turn,
        opponent,
        state,
        reconnect,
        message,
    } = msg
    else {
        panic!("expected State");
    };

    assert_eq!(game_id.as_deref(), Some("4f1c2a"));
    // An ordinary move broadcast sends `message: ""`, which Go omits.
    assert!(message.is_none());
    // `yourTurn: false` is omitted by the server.
    assert!(!your_turn);
    assert_eq!(opponent.as_deref(), Some("bot"));
    assert!(!reconnect);

    assert_eq!(state.turn, 2);
    assert!(state.players[1].is_bot);
    assert_eq!(state.board.cell(5, 2), Some(Cell::PlayerOne));
    assert_eq!(state.board.cell(4, 3), Some(Cell::PlayerTwo));
    assert_eq!(state.board.disc_count(), 3);
    assert_eq!(state.moves.len(), 3);
    assert_eq!(state.moves[1].by, "bot");
    assert_eq!(state.created_at.as_deref(), Some("2024-05-01T12:00:00Z"));
}

#[test]
fn fixture_reconnect_state_from_server() {
    let json = format!(
        r#"{{"type":"state","gameId":"g1","yourTurn":true,"opponent":"bob","reconnect":true,"state":{}}}"#,
        state_json(&empty_cells(), "")
    );
    let msg: ServerMessage = serde_json::from_str(&json).expect("deserialize");
    assert!(matches!(
        msg,
        ServerMessage::State {
            your_turn: true,
            reconnect: true,
            ..
        }
    ));
}

#[test]
fn fixture_forfeit_broadcast_from_server() {
    // Sent to the remaining player when the opponent's reconnect window ran out.
    let state = state_json(&empty_cells(), "")
        .replace(r#""winner": 0"#, r#""winner": 1"#)
        .replace(r#""done": false"#, r#""done": true"#);
    let json = format!(
        r#"{{"type":"state","gameId":"g1","yourTurn":true,"opponent":"bob","message":"forfeit","state":{state}}}"#
    );
    let msg: ServerMessage = serde_json::from_str(&json).expect("deserialize");
    let ServerMessage::State { message, state, .. } = msg else {
        panic!("expected State");
    };
    assert_eq!(message.as_deref(), Some("forfeit"));
    assert!(state.done);
    assert_eq!(state.winning_player().unwrap().username, "alice");

    let Some(Inbound::State(update)) = interpret(&json) else {
        panic!("expected State");
    };
    assert_eq!(update.message.as_deref(), Some("forfeit"));
}

#[test]
fn fixture_state_without_game_id() {
    let json = format!(
        r#"{{"type":"state","state":{}}}"#,
        state_json(&empty_cells(), "")
    );
    let msg: ServerMessage = serde_json::from_str(&json).expect("deserialize");
    let ServerMessage::State {
        game_id, opponent, ..
    } = msg
    else {
        panic!("expected State");
    };
    assert!(game_id.is_none());
    assert!(opponent.is_none());
}

#[test]
fn fixture_error_from_server() {
    let json = r#"{"type": "error", "error": "not your turn"}"#;
    let msg: ServerMessage = serde_json::from_str(json).expect("deserialize");
    assert_eq!(
        msg,
        ServerMessage::Error {
            error: "not your turn".into()
        }
    );
}

#[test]
fn fixture_pong_from_server() {
    let msg: ServerMessage = serde_json::from_str(r#"{"type": "pong"}"#).expect("deserialize");
    assert_eq!(msg, ServerMessage::Pong);
}

#[test]
fn unknown_message_type_decodes_as_unknown() {
    let msg: ServerMessage =
        serde_json::from_str(r#"{"type": "spectate", "gameId": "g1"}"#).expect("deserialize");
    assert_eq!(msg, ServerMessage::Unknown);
}

#[test]
fn missing_type_is_rejected() {
    assert!(serde_json::from_str::<ServerMessage>(r#"{"error": "x"}"#).is_err());
}

// ════════════════════════════════════════════════════════════════════
// GameState edge cases
// ════════════════════════════════════════════════════════════════════

#[test]
fn null_moves_decode_as_empty_history() {
    let json = state_json(&empty_cells(), r#", "moves": null"#);
    let state: GameState = serde_json::from_str(&json).expect("deserialize");
    assert!(state.moves.is_empty());
}

#[test]
fn missing_optional_fields_use_defaults() {
    let json = r#"{
        "id": "g1",
        "board": {"cells": [[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0]]},
        "players": [{"username": "alice"}, {"username": ""}],
        "turn": 1,
        "winner": 0,
        "done": false
    }"#;
    let state: GameState = serde_json::from_str(json).expect("deserialize");
    assert!(!state.players[0].is_bot);
    assert_eq!(state.players[1].username, "");
    assert!(state.created_at.is_none());
    assert!(state.board.is_empty());
}

#[test]
fn board_with_too_few_rows_is_rejected() {
    let cells = format!("[{}]", vec!["[0,0,0,0,0,0,0]"; 5].join(","));
    let json = state_json(&cells, "");
    assert!(serde_json::from_str::<GameState>(&json).is_err());
}

#[test]
fn board_with_ragged_row_is_rejected() {
    let mut rows = vec!["[0,0,0,0,0,0,0]"; 6];
    rows[2] = "[0,0,0,0,0,0]";
    let json = state_json(&format!("[{}]", rows.join(",")), "");
    assert!(serde_json::from_str::<GameState>(&json).is_err());
}

#[test]
fn board_with_invalid_cell_is_rejected() {
    let mut rows = vec!["[0,0,0,0,0,0,0]"; 6];
    rows[5] = "[0,0,0,3,0,0,0]";
    let json = state_json(&format!("[{}]", rows.join(",")), "");
    let err = serde_json::from_str::<GameState>(&json).unwrap_err();
    assert!(err.to_string().contains("invalid cell value 3"));
}

#[test]
fn negative_cell_is_rejected() {
    let mut rows = vec!["[0,0,0,0,0,0,0]"; 6];
    rows[0] = "[-1,0,0,0,0,0,0]";
    let json = state_json(&format!("[{}]", rows.join(",")), "");
    assert!(serde_json::from_str::<GameState>(&json).is_err());
}

#[test]
fn three_players_are_rejected() {
    let json = state_json(&empty_cells(), "").replace(
        r#"{"username": "bob", "isBot": false}]"#,
        r#"{"username": "bob", "isBot": false}, {"username": "eve"}]"#,
    );
    assert!(serde_json::from_str::<GameState>(&json).is_err());
}

// ════════════════════════════════════════════════════════════════════
// ClientMessage wire text
// ════════════════════════════════════════════════════════════════════

#[test]
fn move_serializes_to_server_shape() {
    let json = serde_json::to_string(&ClientMessage::Move { column: 3 }).expect("serialize");
    assert_eq!(json, r#"{"type":"move","column":3}"#);
}

#[test]
fn move_to_column_zero_keeps_column_field() {
    let json = serde_json::to_string(&ClientMessage::Move { column: 0 }).expect("serialize");
    assert_eq!(json, r#"{"type":"move","column":0}"#);
}

#[test]
fn reconnect_serializes_to_server_shape() {
    let json = serde_json::to_string(&ClientMessage::Reconnect).expect("serialize");
    assert_eq!(json, r#"{"type":"reconnect"}"#);
}

#[test]
fn ping_serializes_to_server_shape() {
    let json = serde_json::to_string(&ClientMessage::Ping).expect("serialize");
    assert_eq!(json, r#"{"type":"ping"}"#);
}

// ════════════════════════════════════════════════════════════════════
// Leaderboard
// ════════════════════════════════════════════════════════════════════

#[test]
fn fixture_leaderboard_from_server() {
    let json = r#"[{"username":"carol","wins":12},{"username":"alice","wins":3}]"#;
    let entries: Vec<LeaderboardEntry> = serde_json::from_str(json).expect("deserialize");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].username, "carol");
    assert_eq!(entries[1].wins, 3);
}

// ════════════════════════════════════════════════════════════════════
// Interpreter over fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn interpret_mid_game_fixture() {
    let Some(Inbound::State(update)) = interpret(MID_GAME_STATE) else {
        panic!("expected State");
    };
    assert_eq!(update.game_id.as_deref(), Some("4f1c2a"));
    assert_eq!(update.opponent.as_deref(), Some("bot"));
    assert_eq!(update.state.board.disc_count(), 3);
}

#[test]
fn interpret_truncated_frame_is_dropped() {
    let truncated = &MID_GAME_STATE[..MID_GAME_STATE.len() / 2];
    assert!(interpret(truncated).is_none());
}
