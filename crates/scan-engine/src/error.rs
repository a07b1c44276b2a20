//! Pipeline error taxonomy
//!
//! Transient network failures and ML errors are absorbed inside the
//! pipeline (partial observations, heuristic-only verdicts); only the
//! two variants below ever escape `scan()`.

use linkguard_url_core::UrlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// URL unparseable or on a non-web scheme; maps to HTTP 422
    #[error("invalid input: {0}")]
    InvalidInput(#[from] UrlError),

    /// Unexpected failure; maps to HTTP 500 with details redacted
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_error_converts_to_invalid_input() {
        let err: ScanError = UrlError::MissingHost.into();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }
}
