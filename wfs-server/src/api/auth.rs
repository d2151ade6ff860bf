//! API key middleware for write routes
//!
//! Applied to `POST /records` and `POST /records/:id/process` only.
//! With no key configured the service runs in open mode and every request
//! passes through.

use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(&API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());

    match provided {
        None => {
            warn!(path = %request.uri().path(), "Rejected write without API key");
            Err(ApiError::Unauthorized("API key required".to_string()))
        }
        Some(key) if !keys_match(key, expected) => {
            warn!(path = %request.uri().path(), "Rejected write with invalid API key");
            Err(ApiError::Unauthorized("Invalid API key".to_string()))
        }
        Some(_) => Ok(next.run(request).await),
    }
}

/// Length-independent comparison; does not stop at the first differing byte
fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    let mut diff = provided.len() ^ expected.len();
    for (i, byte) in expected.iter().enumerate() {
        diff |= (byte ^ provided.get(i).copied().unwrap_or(0)) as usize;
    }
    diff == 0
}
