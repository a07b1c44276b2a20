//! API-key authentication middleware

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use crate::handlers::ApiError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

/// Constant-time key comparison; a naive `==` would leak prefix length
/// through timing.
fn keys_match(expected: &str, presented: &str) -> bool {
    ring::constant_time::verify_slices_are_equal(expected.as_bytes(), presented.as_bytes()).is_ok()
}

/// Require a valid `X-API-Key` header. Missing key is 401, wrong key is
/// 403. A deployment without a configured key skips the check.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.api_key else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    match presented {
        None => {
            ApiError::new(StatusCode::UNAUTHORIZED, "Missing API key").into_response()
        }
        Some(key) if keys_match(expected, key) => next.run(request).await,
        Some(_) => {
            warn!("rejected request with invalid API key");
            ApiError::new(StatusCode::FORBIDDEN, "Invalid API key").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_comparison() {
        assert!(keys_match("secret-key", "secret-key"));
        assert!(!keys_match("secret-key", "secret-kex"));
        assert!(!keys_match("secret-key", "secret"));
        assert!(!keys_match("secret-key", ""));
    }
}
