use thiserror::Error;

/// Inbound alert failed to parse or violated a payload invariant.
///
/// Surfaced to webhook callers as HTTP 400; never enters the pipeline.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported schema version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("narr.score must be within 0..=100, got {0}")]
    ScoreOutOfRange(u8),

    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown delivery method: '{0}' (expected discord, telegram or both)")]
    UnknownDeliveryMethod(String),
}
