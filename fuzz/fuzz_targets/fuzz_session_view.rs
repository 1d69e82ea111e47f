#![no_main]

use four_in_a_row_client::{SessionEvent, SessionView};
use libfuzzer_sys::fuzz_target;

// Splits the input on newlines and feeds each piece to the reducer as an
// inbound frame, with a connect/open prefix and a close in the middle.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut view = SessionView::default()
        .apply(SessionEvent::Connecting {
            username: "alice".into(),
        })
        .view
        .apply(SessionEvent::Opened)
        .view;

    for (i, frame) in text.split('\n').enumerate() {
        let event = if frame == "#close" {
            SessionEvent::Closed { reason: None }
        } else {
            SessionEvent::Frame(frame.to_string())
        };
        let transition = view.apply(event);
        // A decided game requests at most one refresh per snapshot.
        assert!(transition.effects.len() <= 1, "frame {i} produced multiple effects");
        view = transition.view;
        let _ = view.can_drop();
    }
});
