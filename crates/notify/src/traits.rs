//! Notifier trait definition and shared error types.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ict_core::Payload;

/// Max characters of a remote error body kept in logs.
pub(crate) const ERROR_BODY_LIMIT: usize = 200;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

impl NotifyError {
    /// Build an [`NotifyError::Api`] from a non-success response, keeping
    /// only the head of the body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        NotifyError::Api {
            status,
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        }
    }
}

/// One finished analysis, ready for fan-out.
#[derive(Debug, Clone)]
pub struct Alert {
    pub payload: Payload,
    /// Full analysis text, untruncated. Channels apply their own limits.
    pub analysis: String,
    /// Optional chart image. Channels attach it only if the file exists.
    pub screenshot: Option<PathBuf>,
}

impl Alert {
    pub fn new(payload: Payload, analysis: String, screenshot: Option<PathBuf>) -> Self {
        Self { payload, analysis, screenshot }
    }

    /// Read the screenshot bytes, or `None` when absent or unreadable.
    pub(crate) async fn screenshot_bytes(&self) -> Option<Vec<u8>> {
        let path: &Path = self.screenshot.as_deref()?;
        match tokio::fs::read(path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Screenshot missing, sending text only");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Screenshot unreadable, sending text only");
                None
            }
        }
    }
}

/// Outcome of one channel's delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    /// Channel not configured; nothing was sent.
    Skipped,
    Failed(String),
}

/// Trait for delivery channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an alert through this channel. Only called when enabled.
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError>;

    /// Whether the channel has the endpoint/credentials it needs.
    fn is_enabled(&self) -> bool;

    /// Human-readable name for this channel (e.g., "discord", "telegram").
    fn channel_name(&self) -> &str;

    /// Best-effort delivery. Never fails: a disabled channel is skipped and
    /// a failed send is logged. No retries.
    async fn deliver(&self, alert: &Alert) -> DeliveryStatus {
        let trigger = alert.payload.trigger.as_str();
        if !self.is_enabled() {
            tracing::info!(channel = self.channel_name(), trigger, "Channel not configured, skipping");
            return DeliveryStatus::Skipped;
        }

        let start = Instant::now();
        let result = self.send(alert).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                tracing::info!(channel = self.channel_name(), trigger, duration_ms, "Alert delivered");
                DeliveryStatus::Sent
            }
            Err(e) => {
                tracing::error!(
                    channel = self.channel_name(),
                    trigger,
                    error = %e,
                    duration_ms,
                    "Alert delivery failed"
                );
                DeliveryStatus::Failed(e.to_string())
            }
        }
    }
}

/// Result of dispatching an alert to a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub status: DeliveryStatus,
    pub duration_ms: u64,
}
