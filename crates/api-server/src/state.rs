//! Application state management

use crate::rate_limiter::RateLimiter;
use linkguard_metrics::MetricsCollector;
use linkguard_scan_engine::{Scanner, ScannerConfig};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shared application state
pub struct AppState {
    pub scanner: Scanner,
    pub metrics: Arc<MetricsCollector>,
    pub rate_limiter: Arc<RateLimiter>,
    pub api_key: Option<String>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ScannerConfig) -> anyhow::Result<Self> {
        info!("Initializing application state");

        let api_key = config.resolved_api_key();
        if api_key.is_none() {
            warn!("no API key configured, scan endpoint is open");
        }

        let metrics = Arc::new(MetricsCollector::new());
        let scanner = Scanner::builder(config).metrics(metrics.clone()).build()?;
        let rate_limiter = Arc::new(RateLimiter::new());

        info!("Application state initialized");

        Ok(Self {
            scanner,
            metrics,
            rate_limiter,
            api_key,
            start_time: Instant::now(),
        })
    }
}
