//! Application error type mapping to HTTP status codes and the
//! `{success: false, error}` body.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use repolens_core::agent::orchestrator::OrchestratorError;

/// User-facing text for persistence failures.
pub const STORE_UNAVAILABLE: &str = "Conversation store unavailable";

#[derive(Debug)]
pub enum AppError {
    /// Body is not valid JSON or lacks a required field.
    BadRequest(String),
    /// Missing or wrong bearer token.
    Unauthorized(String),
    /// The server has no bearer token configured.
    AuthNotConfigured,
    /// History could not be loaded or a turn could not be stored.
    Store(OrchestratorError),
    Internal(String),
}

impl From<OrchestratorError> for AppError {
    fn from(e: OrchestratorError) -> Self {
        AppError::Store(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::AuthNotConfigured => {
                tracing::error!("API_BEARER_TOKEN is not set; rejecting authenticated request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server authentication is not configured".to_string(),
                )
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "conversation store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, STORE_UNAVAILABLE.to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
