use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{clip, LlmError, LlmProvider, Message, Role, ERROR_BODY_LIMIT};

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> serde_json::Value {
        // Claude API uses separate system parameter
        let system_msg = messages
            .iter()
            .find(|m| matches!(m.role, Role::System))
            .map(|m| m.content.clone());

        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| !matches!(m.role, Role::System))
            .map(|m| {
                json!({
                    "role": m.role.as_str(),
                    "content": [{ "type": "text", "text": m.content }],
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": api_messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        if let Some(system) = system_msg {
            body["system"] = json!(system);
        }
        body
    }
}

/// Joins every `text` block of the response, skipping other block types.
fn extract_text(resp: &serde_json::Value) -> Result<String, LlmError> {
    let blocks = resp["content"]
        .as_array()
        .ok_or_else(|| LlmError::ParseError("missing content array".into()))?;

    let texts: Vec<&str> = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();

    if texts.is_empty() {
        return Err(LlmError::ParseError("no text block in content".into()));
    }
    Ok(texts.concat())
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let body = self.request_body(&messages, temperature, max_tokens);

        debug!(model = %self.model, "Claude request to {}", ANTHROPIC_MESSAGES_URL);

        let response = self
            .client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body: clip(&body, ERROR_BODY_LIMIT) });
        }

        let resp: serde_json::Value = response.json().await?;
        extract_text(&resp)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
