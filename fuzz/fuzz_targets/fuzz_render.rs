#![no_main]

use libfuzzer_sys::fuzz_target;
use weatherbot::render;
use weatherbot::weather::Snapshot;

// Any provider body must decode and render into a non-empty message.
fuzz_target!(|data: &[u8]| {
    if let Ok(body) = serde_json::from_slice::<serde_json::Value>(data) {
        let snapshot = Snapshot::from_value(&body);
        let message = render(Some(&snapshot));
        assert!(!message.text().is_empty());
    }
});
