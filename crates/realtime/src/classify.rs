//! Replay-frame classification.
//!
//! A fixed decision table over `(event.type, event.data.source,
//! event.data.type)` tags each replay frame so the admin viewer can render
//! activity markers without decoding the payload.

use crate::protocol::ReplayEvent;

/// Classifies one replay frame.
pub fn classify_replay_event(event: &ReplayEvent) -> &'static str {
    let source = event.data.get("source").and_then(|v| v.as_i64());
    let data_type = event.data.get("type").and_then(|v| v.as_i64());

    match event.kind {
        // Full DOM snapshot.
        2 => "snapshot",
        // Incremental mutation.
        3 => match source {
            Some(1) => "mousemove",
            Some(2) if data_type == Some(2) => "click",
            Some(2) => "interaction",
            Some(3) => "scroll",
            Some(5) => "input",
            _ => "mutation",
        },
        // Meta event carries the page URL.
        4 => "navigation",
        _ => "unknown",
    }
}
