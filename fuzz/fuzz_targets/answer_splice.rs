#![no_main]

use ferry_events::{splice_answer, SpliceOutcome};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let Ok(block) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return;
    };
    let mut blocks = vec![block.clone()];
    match splice_answer(&mut blocks, "fuzz answer") {
        SpliceOutcome::DirectText => {
            assert_eq!(blocks[0]["text"]["text"], "fuzz answer");
        }
        SpliceOutcome::AppendedInline => {
            let elements = blocks[0]["elements"][0]["elements"]
                .as_array()
                .expect("inline container");
            assert_eq!(
                elements.last().expect("appended element")["text"],
                "fuzz answer"
            );
        }
        SpliceOutcome::NoAnchor => {
            assert_eq!(blocks[0], block);
        }
    }
});
