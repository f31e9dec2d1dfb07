use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chat message for the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Trait for LLM providers. Each backend implements this.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and return the assistant's response text.
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;

    /// Short provider name used in logs (e.g. "deepseek").
    fn name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl LlmError {
    /// One-line reason suitable for a user-facing failure notice.
    pub fn short_reason(&self) -> String {
        match self {
            LlmError::ApiError { status, .. } => format!("status {status}"),
            LlmError::Timeout(d) => format!("timed out after {}s", d.as_secs()),
            LlmError::HttpError(_) => "request failed".to_string(),
            LlmError::ParseError(_) => "unexpected response".to_string(),
            LlmError::NotConfigured(_) => "provider not configured".to_string(),
        }
    }
}

/// Max characters of an error body kept in logs.
pub(crate) const ERROR_BODY_LIMIT: usize = 200;

pub(crate) fn clip(body: &str, limit: usize) -> String {
    body.chars().take(limit).collect()
}
