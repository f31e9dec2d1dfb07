//! Liveness and service info endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
pub struct Endpoints {
    pub webhook: &'static str,
    pub health: &'static str,
    pub test: &'static str,
}

#[derive(Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub provider: String,
    pub channels: Vec<String>,
    pub endpoints: Endpoints,
}

pub async fn root(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "ICT AI Trading Analyst",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        provider: state.provider.clone(),
        channels: state.channels.clone(),
        endpoints: Endpoints {
            webhook: "/webhook",
            health: "/health",
            test: "/webhook/test",
        },
    })
}
