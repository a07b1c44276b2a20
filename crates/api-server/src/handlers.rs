//! API request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use linkguard_metrics::MetricsSnapshot;
use linkguard_scan_engine::{ScanError, ScanResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct ScanRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub cache_hit_rate: f64,
    pub total_scans: u64,
}

/// Error body shared by every non-2xx response:
/// `{"detail":[{"msg": "..."}]}`
#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: Vec<ErrorDetail>,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub msg: String,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            detail: vec![ErrorDetail { msg: self.message }],
        };
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// Scan Endpoint
// ============================================================================

/// `POST /api/v1/scan` - analyze one URL
pub async fn scan_url(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResult>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::unprocessable(e.body_text()))?;

    match state.scanner.scan(&request.url).await {
        Ok(result) => Ok(Json(result)),
        Err(ScanError::InvalidInput(e)) => Err(ApiError::unprocessable(e.to_string())),
        Err(ScanError::Internal(e)) => {
            // Redacted for the client, full detail in the log.
            error!(error = %e, "scan failed internally");
            Err(ApiError::internal())
        }
    }
}

// ============================================================================
// Health & Stats Endpoints
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.metrics.snapshot();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        cache_hit_rate: snapshot.cache_hit_rate,
        total_scans: snapshot.total_scans,
    })
}

/// Scan statistics endpoint
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
