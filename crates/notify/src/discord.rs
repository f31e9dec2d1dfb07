//! Discord webhook notifier.
//!
//! Posts one embed per alert as `multipart/form-data`: the embed JSON goes in
//! the `payload_json` field and the optional chart image in `file`.

use ict_core::config::DeliveryConfig;
use ict_core::Direction;
use serde_json::{json, Value};

use crate::card::{truncate_chars, SummaryCard};
use crate::traits::{Alert, Notifier, NotifyError};

/// Max characters of analysis text in the embed description.
pub const DESCRIPTION_LIMIT: usize = 1990;

const USERNAME: &str = "ICT Analyst";
const COLOR_BULL: u32 = 0x00FF88;
const COLOR_BEAR: u32 = 0xFF4444;
const IMAGE_NAME: &str = "chart.png";

/// Sends alerts to a Discord channel webhook.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(config.discord_webhook_url.clone())
    }
}

fn embed_color(direction: Direction) -> u32 {
    match direction {
        Direction::Bull => COLOR_BULL,
        Direction::Bear => COLOR_BEAR,
    }
}

/// Build the webhook JSON body. `with_image` references the attached file
/// from inside the embed.
pub fn build_payload(alert: &Alert, with_image: bool) -> Value {
    let p = &alert.payload;
    let card = SummaryCard::from_payload(p);

    let mut embed = json!({
        "title": format!("{} {} | {}", card.trigger_emoji, card.trigger_label, card.symbol),
        "description": truncate_chars(&alert.analysis, DESCRIPTION_LIMIT),
        "color": embed_color(card.direction),
        "fields": [
            { "name": "Model", "value": format!("{} {}", card.model_emoji, card.model_label), "inline": true },
            { "name": "Entry", "value": card.entry, "inline": true },
            { "name": "Conviction", "value": card.conviction, "inline": true },
        ],
        "footer": {
            "text": format!(
                "TF: {}min | KZ: {} | PO3: {}",
                p.timeframe, p.session.kill_zone, p.session.po3
            ),
        },
    });
    if let Some(ts) = p.timestamp() {
        embed["timestamp"] = Value::String(ts.to_rfc3339());
    }
    if with_image {
        embed["image"] = json!({ "url": format!("attachment://{IMAGE_NAME}") });
    }

    json!({ "username": USERNAME, "embeds": [embed] })
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let url = self
            .webhook_url
            .as_deref()
            .ok_or_else(|| NotifyError::Config("DISCORD_WEBHOOK_URL not set".to_string()))?;

        let image = alert.screenshot_bytes().await;
        let body = build_payload(alert, image.is_some());

        let mut form = reqwest::multipart::Form::new().text("payload_json", body.to_string());
        if let Some(bytes) = image {
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(IMAGE_NAME)
                .mime_str("image/png")?;
            form = form.part("file", part);
        }

        tracing::debug!(trigger = %alert.payload.trigger, "Sending Discord embed");

        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::OK || status == reqwest::StatusCode::NO_CONTENT {
            return Ok(());
        }
        Err(NotifyError::from_response(response).await)
    }

    fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn channel_name(&self) -> &str {
        "discord"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{multipart_json, sample_alert, FakeEndpoint};
    use crate::traits::DeliveryStatus;

    #[test]
    fn embed_carries_summary_card() {
        let body = build_payload(&sample_alert("Bullish continuation."), false);
        assert_eq!(body["username"], "ICT Analyst");

        let embed = &body["embeds"][0];
        assert_eq!(embed["title"], "🚨 SETUP FORMING | MNQ1!");
        assert_eq!(embed["description"], "Bullish continuation.");
        assert_eq!(embed["color"], 0x00FF88);
        assert_eq!(embed["fields"][0]["value"], "📐 2022 MODEL");
        assert_eq!(embed["fields"][1]["value"], "17802.5");
        assert_eq!(embed["fields"][2]["value"], "78%");
        assert_eq!(embed["footer"]["text"], "TF: 5min | KZ: NY_AM | PO3: MANIPULATION");
        assert!(embed.get("image").is_none());
    }

    #[test]
    fn bear_bias_uses_red() {
        let mut alert = sample_alert("x");
        alert.payload.bias.direction = Direction::Bear;
        assert_eq!(build_payload(&alert, false)["embeds"][0]["color"], 0xFF4444);
    }

    #[test]
    fn long_analysis_cut_to_limit_card_intact() {
        let analysis = "é".repeat(DESCRIPTION_LIMIT + 500);
        let body = build_payload(&sample_alert(&analysis), false);
        let embed = &body["embeds"][0];

        let description = embed["description"].as_str().unwrap();
        assert_eq!(description.chars().count(), DESCRIPTION_LIMIT);
        assert!(!description.ends_with("..."));
        assert_eq!(embed["title"], "🚨 SETUP FORMING | MNQ1!");
        assert_eq!(embed["fields"][2]["value"], "78%");
    }

    #[tokio::test]
    async fn disabled_without_webhook_url() {
        let notifier = DiscordNotifier::new(None);
        assert!(!notifier.is_enabled());
        assert_eq!(notifier.deliver(&sample_alert("x")).await, DeliveryStatus::Skipped);
    }

    #[tokio::test]
    async fn posts_multipart_embed() {
        let server = FakeEndpoint::start(|_| (204, "")).await;
        let notifier = DiscordNotifier::new(Some(format!("{}/api/webhooks/1/abc", server.base_url)));

        let status = notifier.deliver(&sample_alert("Analysis body")).await;
        assert_eq!(status, DeliveryStatus::Sent);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/api/webhooks/1/abc");
        assert!(requests[0].content_type.starts_with("multipart/form-data"));
        let body = multipart_json(&requests[0].body);
        assert_eq!(body["embeds"][0]["description"], "Analysis body");
        assert!(!requests[0].body.contains("name=\"file\""));
    }

    #[tokio::test]
    async fn attaches_existing_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MNQ1_1707321600000.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();

        let server = FakeEndpoint::start(|_| (200, "")).await;
        let notifier = DiscordNotifier::new(Some(format!("{}/hook", server.base_url)));
        let mut alert = sample_alert("with chart");
        alert.screenshot = Some(path);

        assert_eq!(notifier.deliver(&alert).await, DeliveryStatus::Sent);
        let body = &server.requests()[0].body;
        assert!(body.contains("name=\"file\"; filename=\"chart.png\""));
        assert_eq!(
            multipart_json(body)["embeds"][0]["image"]["url"],
            "attachment://chart.png"
        );
    }

    #[tokio::test]
    async fn missing_screenshot_sends_text_only() {
        let server = FakeEndpoint::start(|_| (204, "")).await;
        let notifier = DiscordNotifier::new(Some(format!("{}/hook", server.base_url)));
        let mut alert = sample_alert("no chart");
        alert.screenshot = Some("/nonexistent/chart.png".into());

        assert_eq!(notifier.deliver(&alert).await, DeliveryStatus::Sent);
        assert!(!server.requests()[0].body.contains("name=\"file\""));
    }

    #[tokio::test]
    async fn server_error_is_reported_not_raised() {
        let server = FakeEndpoint::start(|_| (500, "upstream exploded")).await;
        let notifier = DiscordNotifier::new(Some(format!("{}/hook", server.base_url)));

        match notifier.deliver(&sample_alert("x")).await {
            DeliveryStatus::Failed(reason) => {
                assert!(reason.contains("500"));
                assert!(reason.contains("upstream exploded"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(server.requests().len(), 1);
    }
}
