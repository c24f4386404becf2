//! Bearer token authentication extractor.
//!
//! Accepts `Authorization: Bearer <token>`. The presented token is SHA-256
//! hashed and compared against the digest of `API_BEARER_TOKEN`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::error::AppError;
use crate::state::{AppState, token_digest};

/// Authenticated request marker. Extracting this validates the bearer token.
pub struct Authenticated;

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .map(|value| {
                value.to_str().map_err(|_| {
                    AppError::Unauthorized("Invalid Authorization header encoding".to_string())
                })
            })
            .transpose()?;

        verify_bearer(header, state.api_token_digest.as_ref())?;
        Ok(Authenticated)
    }
}

/// Check an `Authorization` header value against the expected token digest.
pub fn verify_bearer(header: Option<&str>, expected: Option<&[u8; 32]>) -> Result<(), AppError> {
    let expected = expected.ok_or(AppError::AuthNotConfigured)?;

    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized(
                "Missing bearer token. Provide it via 'Authorization: Bearer <token>'.".to_string(),
            )
        })?;

    if token_digest(token) == *expected {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid authentication token".to_string()))
    }
}
