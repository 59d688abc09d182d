#![no_main]

use libfuzzer_sys::fuzz_target;
use weatherbot::config::Config;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        if let Ok(config) = toml::from_str::<Config>(raw) {
            let _ = config.validate();
            let _ = config.summary();
        }
    }
});
