#![no_main]

use four_in_a_row_client::interpreter::interpret;
use four_in_a_row_client::protocol::ServerMessage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw-byte path, including serde_json's own UTF-8 validation.
    let _ = serde_json::from_slice::<ServerMessage>(data);

    if let Ok(frame) = std::str::from_utf8(data) {
        // Anything that decodes must be bounds-safe to inspect.
        if let Ok(ServerMessage::State { state, .. }) = serde_json::from_str::<ServerMessage>(frame) {
            let _ = state.winning_player();
            let _ = state.board.disc_count();
        }
        let _ = interpret(frame);
    }
});
