//! Fans one alert out to every selected channel.
//!
//! Each channel runs on its own task, so a slow, failing or panicking
//! channel never blocks or fails its siblings.

use std::sync::Arc;
use std::time::Instant;

use ict_core::config::DeliveryConfig;

use crate::discord::DiscordNotifier;
use crate::telegram::TelegramNotifier;
use crate::traits::{Alert, DeliveryStatus, DispatchResult, Notifier};

pub struct Dispatcher {
    channels: Vec<Arc<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Create an empty dispatcher.
    pub fn empty() -> Self {
        Self { channels: Vec::new() }
    }

    /// Channels selected by the delivery method. Selected but unconfigured
    /// channels are kept; they skip at delivery time.
    pub fn from_config(config: &DeliveryConfig) -> Self {
        let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();
        if config.method.includes_discord() {
            channels.push(Arc::new(DiscordNotifier::from_config(config)));
        }
        if config.method.includes_telegram() {
            channels.push(Arc::new(TelegramNotifier::from_config(config)));
        }
        Self { channels }
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel_name()).collect()
    }

    /// Deliver to all channels concurrently and wait for every one.
    pub async fn dispatch(&self, alert: Arc<Alert>) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!(trigger = %alert.payload.trigger, "No delivery channels selected");
            return Vec::new();
        }

        let handles: Vec<_> = self
            .channels
            .iter()
            .map(|channel| {
                let channel = Arc::clone(channel);
                let alert = Arc::clone(&alert);
                let name = channel.channel_name().to_string();
                let handle = tokio::spawn(async move {
                    let start = Instant::now();
                    let status = channel.deliver(&alert).await;
                    (status, start.elapsed().as_millis() as u64)
                });
                (name, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (channel, handle) in handles {
            let (status, duration_ms) = match handle.await {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!(channel = %channel, error = %e, "Channel task panicked");
                    (DeliveryStatus::Failed("channel task panicked".to_string()), 0)
                }
            };
            results.push(DispatchResult { channel, status, duration_ms });
        }
        results
    }
}
