#![no_main]

use ferry_events::{classify_delivery, EventDisposition};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let Ok(body) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return;
    };
    match classify_delivery(&body) {
        EventDisposition::Challenge(_) | EventDisposition::Mention(_) => {}
        EventDisposition::Reaction(event) => {
            // Reactions never surface without target coordinates.
            assert!(!event.channel.is_empty());
            assert!(!event.message_ts.is_empty());
        }
        EventDisposition::Ignore { reason } => {
            assert!(!reason.as_str().trim().is_empty());
        }
    }
});
