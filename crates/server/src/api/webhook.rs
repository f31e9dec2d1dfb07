//! Inbound alert endpoints.
//!
//! The body is read as raw bytes so alerts posted as `text/plain` parse the
//! same as `application/json`, and undecodable bodies still get a JSON 400.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use ict_core::Payload;
use serde::Serialize;
use tracing::{info, warn};

use super::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    pub trigger: String,
}

#[derive(Serialize)]
pub struct ParsedSummary {
    pub trigger: String,
    pub symbol: String,
    pub model: String,
    pub conviction: u8,
    pub entry_found: bool,
    pub entry_price: Option<f64>,
}

#[derive(Serialize)]
pub struct WebhookTestResponse {
    pub status: &'static str,
    pub parsed: ParsedSummary,
}

fn parse(body: &[u8]) -> Result<Payload, ApiError> {
    match Payload::from_slice(body) {
        Ok(payload) => {
            info!(
                trigger = %payload.trigger,
                symbol = %payload.symbol,
                model = %payload.model.name,
                conviction = payload.narrative.score,
                entry_found = payload.entry.found,
                "Webhook received"
            );
            Ok(payload)
        }
        Err(e) => {
            warn!(error = %e, "Rejected webhook payload");
            Err(e.into())
        }
    }
}

/// Validate, queue for analysis, acknowledge immediately.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let payload = parse(&body)?;
    let trigger = payload.trigger.clone();
    state.queue.enqueue(payload).map_err(|e| {
        warn!(trigger = %trigger, error = %e, "Could not queue alert");
        ApiError::from(e)
    })?;
    Ok(Json(WebhookAck { status: "ok", trigger }))
}

/// Validate only; nothing is analyzed or delivered.
pub async fn webhook_test(body: Bytes) -> Result<Json<WebhookTestResponse>, ApiError> {
    let payload = parse(&body)?;
    Ok(Json(WebhookTestResponse {
        status: "ok",
        parsed: ParsedSummary {
            entry_price: payload.entry.price,
            entry_found: payload.entry.found,
            conviction: payload.narrative.score,
            model: payload.model.name,
            symbol: payload.symbol,
            trigger: payload.trigger,
        },
    }))
}
