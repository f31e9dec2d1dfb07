//! HTTP endpoint handlers.
//!
//! Shared error type lives here; each sub-module owns one area.

mod health;
mod webhook;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ict_core::ValidationError;
use serde::Serialize;

use crate::pipeline::EnqueueError;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Body is not a valid payload. 400.
    Validation(ValidationError),
    /// Pipeline queue cannot take more work. 503.
    Unavailable(EnqueueError),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<EnqueueError> for ApiError {
    fn from(e: EnqueueError) -> Self {
        ApiError::Unavailable(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Unavailable(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

pub use health::{health, root};
pub use webhook::{webhook, webhook_test};
