//! Telegram Bot API notifier with Markdown formatting.
//!
//! Delivery is two independent calls: `sendPhoto` with a short caption
//! (only when a chart exists), then `sendMessage` with the analysis text.
//! A failed photo post does not stop the text message.

use ict_core::config::DeliveryConfig;
use ict_core::Direction;

use crate::card::{truncate_chars, SummaryCard};
use crate::traits::{Alert, Notifier, NotifyError};

/// Max characters of analysis text in the follow-up message.
pub const MESSAGE_LIMIT: usize = 4090;

const PARSE_MODE: &str = "Markdown";
const IMAGE_NAME: &str = "chart.png";

/// Four-line photo caption built from the summary card.
pub fn caption(card: &SummaryCard) -> String {
    let dot = match card.direction {
        Direction::Bull => "🟢",
        Direction::Bear => "🔴",
    };
    format!(
        "{dot} *{} {}*\n{} | {} {}\nEntry: {}\nConviction: {}",
        card.trigger_emoji,
        card.trigger_label,
        card.symbol,
        card.model_emoji,
        card.model_label,
        card.entry,
        card.conviction,
    )
}

/// Sends alerts via the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    bot_token: Option<String>,
    chat_id: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>, api_base: impl Into<String>) -> Self {
        Self {
            bot_token,
            chat_id,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(
            config.telegram_bot_token.clone(),
            config.telegram_chat_id.clone(),
            config.telegram_api_url.clone(),
        )
    }

    fn credentials(&self) -> Result<(&str, &str), NotifyError> {
        match (self.bot_token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat)) => Ok((token, chat)),
            _ => Err(NotifyError::Config(
                "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must both be set".to_string(),
            )),
        }
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, token, method)
    }

    async fn send_photo(
        &self,
        token: &str,
        chat_id: &str,
        caption: String,
        image: Vec<u8>,
    ) -> Result<(), NotifyError> {
        let part = reqwest::multipart::Part::bytes(image)
            .file_name(IMAGE_NAME)
            .mime_str("image/png")?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption)
            .text("parse_mode", PARSE_MODE)
            .part("photo", part);

        let response = self
            .client
            .post(self.method_url(token, "sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        check_response(response).await
    }

    async fn send_message(&self, token: &str, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": PARSE_MODE,
        });
        let response = self
            .client
            .post(self.method_url(token, "sendMessage"))
            .json(&body)
            .send()
            .await?;
        check_response(response).await
    }
}

async fn check_response(response: reqwest::Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    // Handle rate limiting (HTTP 429).
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let retry_after = body
            .get("parameters")
            .and_then(|p| p.get("retry_after"))
            .and_then(|v| v.as_u64())
            .unwrap_or(30);
        return Err(NotifyError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    Err(NotifyError::from_response(response).await)
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let (token, chat_id) = self.credentials()?;

        if let Some(image) = alert.screenshot_bytes().await {
            let card = SummaryCard::from_payload(&alert.payload);
            if let Err(e) = self.send_photo(token, chat_id, caption(&card), image).await {
                tracing::warn!(
                    channel = "telegram",
                    trigger = %alert.payload.trigger,
                    error = %e,
                    "Photo post failed, sending text anyway"
                );
            }
        }

        let text = truncate_chars(&alert.analysis, MESSAGE_LIMIT);
        tracing::debug!(chat_id, chars = text.chars().count(), "Sending Telegram message");
        self.send_message(token, chat_id, text).await
    }

    fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}
