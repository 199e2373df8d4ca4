#![no_main]

use ferry_slack::permalink_thread_ts;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Some(thread_ts) = permalink_thread_ts(&raw) {
        assert!(!thread_ts.is_empty());
        assert!(raw.contains(&thread_ts));
    }
});
