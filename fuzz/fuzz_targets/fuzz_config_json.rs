//! Fuzz target: `PropConfig::from_json`
//!
//! Arbitrary documents must either be rejected or produce a config that
//! passes validation again after a serialise/parse cycle.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use propctl::config::PropConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = PropConfig::from_json(text) else {
        return;
    };
    let json = serde_json::to_string(&config).unwrap();
    assert!(PropConfig::from_json(&json).is_ok());
});
