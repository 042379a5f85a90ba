//! # Authentication Module
//!
//! API key authentication for the Roster HTTP API.
//!
//! When `security.api_key` (or `ROSTER_API_KEY`) is set, every request
//! except `/health` must carry it:
//! ```text
//! Authorization: Bearer <your-api-key>
//! ```

use super::handlers::ApiError;
use super::types::MessageResponse;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// The configured key, shared by every request.
pub type ApiKey = Arc<str>;

/// Compare two keys in constant time over the longer length.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let width = provided.len().max(expected.len());
    let mut left = vec![0u8; width];
    let mut right = vec![0u8; width];
    left[..provided.len()].copy_from_slice(provided);
    right[..expected.len()].copy_from_slice(expected);

    let same_bytes: bool = left.ct_eq(&right).into();
    same_bytes && provided.len() == expected.len()
}

/// The key a request presents, with an optional `Bearer ` prefix removed.
fn presented_key(request: &Request<Body>) -> Option<&str> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    Some(value.strip_prefix("Bearer ").unwrap_or(value))
}

fn unauthorized(reason: &'static str) -> ApiError {
    tracing::warn!(event = "auth_failure", reason, "request rejected");
    (
        StatusCode::UNAUTHORIZED,
        Json(MessageResponse::error("A valid API key is required.")),
    )
}

/// Require the configured API key on every route except `/health`.
pub async fn api_key_auth_middleware(
    State(expected): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    match presented_key(&request) {
        Some(key) if keys_match(key.as_bytes(), expected.as_bytes()) => {
            Ok(next.run(request).await)
        }
        Some(_) => Err(unauthorized("invalid_api_key")),
        None => Err(unauthorized("missing_authorization_header")),
    }
}
