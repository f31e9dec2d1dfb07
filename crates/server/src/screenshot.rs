//! Lookup of chart images written by an external capturer.

use std::path::{Path, PathBuf};

use ict_core::Payload;

/// Owned handle to the screenshot directory, created at startup and handed
/// to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ScreenshotStore {
    dir: Option<PathBuf>,
}

impl ScreenshotStore {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// A store that never finds anything.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Expected file name for a payload: `{symbol}_{ts}.png`, symbol reduced
    /// to ASCII alphanumerics.
    pub fn file_name(payload: &Payload) -> String {
        let symbol: String = payload
            .symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        format!("{}_{}.png", symbol, payload.timestamp_ms)
    }

    /// Path to the payload's chart if it exists on disk.
    pub async fn resolve(&self, payload: &Payload) -> Option<PathBuf> {
        let dir: &Path = self.dir.as_deref()?;
        let path = dir.join(Self::file_name(payload));
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(path),
            Ok(false) => {
                tracing::debug!(path = %path.display(), "No screenshot for alert");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Screenshot lookup failed");
                None
            }
        }
    }
}
