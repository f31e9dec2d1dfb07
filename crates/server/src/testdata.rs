//! Shared fixtures for unit tests.

use ict_core::Payload;

pub const SAMPLE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../testdata/sample_payload.json"
));

pub fn sample_payload() -> Payload {
    Payload::from_json(SAMPLE).unwrap()
}

pub fn sample_value() -> serde_json::Value {
    serde_json::from_str(SAMPLE).unwrap()
}
