//! Analysis engine: payload → provider request → analysis text.
//!
//! The engine never fails. Provider errors (non-success status, transport
//! failure, missing answer, timeout) degrade to a short notice followed by the
//! raw indicator report so that delivery still has something actionable.

use std::time::Duration;

use async_trait::async_trait;
use ict_core::config::LlmConfig;
use ict_core::{format_payload, Payload};
use tracing::{error, info, warn};

use crate::prompts::{user_prompt, ICT_SYSTEM_PROMPT};
use crate::provider::{LlmError, LlmProvider, Message};
use crate::providers::create_provider;

/// Anything that can turn a payload into analysis text.
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(&self, payload: &Payload) -> String;
}

pub struct AnalysisEngine {
    /// `None` when the configured provider could not be built (e.g. missing key).
    provider: Option<Box<dyn LlmProvider>>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl AnalysisEngine {
    pub fn new(
        provider: Box<dyn LlmProvider>,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            provider: Some(provider),
            temperature,
            max_tokens,
            timeout,
        }
    }

    /// Build from config. A provider that cannot be created leaves the engine
    /// in degraded mode rather than failing startup.
    pub fn from_config(llm_config: &LlmConfig) -> Self {
        let provider = match create_provider(llm_config) {
            Ok(p) => {
                info!("LLM provider ready (provider: {})", p.name());
                Some(p)
            }
            Err(e) => {
                warn!("LLM provider not available: {}, analyses will carry raw data only", e);
                None
            }
        };
        Self {
            provider,
            temperature: llm_config.temperature,
            max_tokens: llm_config.max_tokens,
            timeout: llm_config.timeout(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.as_ref().map_or("none", |p| p.name())
    }

    async fn request(&self, provider: &dyn LlmProvider, payload: &Payload, summary: &str) -> Result<String, LlmError> {
        let messages = vec![
            Message::system(ICT_SYSTEM_PROMPT),
            Message::user(user_prompt(payload, summary)),
        ];
        tokio::time::timeout(
            self.timeout,
            provider.complete(messages, self.temperature, self.max_tokens),
        )
        .await
        .map_err(|_| LlmError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl Analyst for AnalysisEngine {
    async fn analyze(&self, payload: &Payload) -> String {
        let summary = format_payload(payload);

        let Some(provider) = self.provider.as_deref() else {
            return fallback_analysis("provider not configured", &summary);
        };

        match self.request(provider, payload, &summary).await {
            Ok(text) => {
                info!(provider = provider.name(), length = text.chars().count(), "AI analysis complete");
                text
            }
            Err(e) => {
                error!(provider = provider.name(), error = %e, trigger = %payload.trigger, "AI analysis failed");
                fallback_analysis(&e.short_reason(), &summary)
            }
        }
    }
}

/// Stub analysis used when the provider is unavailable.
pub fn fallback_analysis(reason: &str, summary: &str) -> String {
    format!("⚠️ AI analysis failed ({reason}). Raw data:\n{summary}")
}
