//! IP-based rate limiter
//!
//! Sliding-window limiter keyed by client IP, applied as middleware in
//! front of the scan endpoint.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

use crate::handlers::ApiError;
use crate::state::AppState;

/// Rate limiter configuration
#[derive(Clone)]
pub struct RateLimiterConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window duration
    pub window: Duration,
    /// Cleanup interval for expired entries
    pub cleanup_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

#[derive(Clone)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Decision for one request
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: DashMap<IpAddr, WindowEntry>,
    last_cleanup: std::sync::atomic::AtomicU64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_config(RateLimiterConfig::default())
    }

    pub fn with_config(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            last_cleanup: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Check whether a request from `ip` fits the current window.
    pub fn check(&self, ip: IpAddr) -> RateLimitDecision {
        let now = Instant::now();
        self.maybe_cleanup();

        let mut entry = self.entries.entry(ip).or_insert_with(|| WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) > self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;

        if entry.count > self.config.max_requests {
            let retry_after = self
                .config
                .window
                .saturating_sub(now.duration_since(entry.window_start));
            RateLimitDecision::Limited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
        } else {
            RateLimitDecision::Allowed
        }
    }

    fn maybe_cleanup(&self) {
        let now_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let last = self.last_cleanup.load(std::sync::atomic::Ordering::Relaxed);
        if now_secs - last > self.config.cleanup_interval.as_secs()
            && self
                .last_cleanup
                .compare_exchange(
                    last,
                    now_secs,
                    std::sync::atomic::Ordering::SeqCst,
                    std::sync::atomic::Ordering::Relaxed,
                )
                .is_ok()
        {
            let now = Instant::now();
            self.entries
                .retain(|_, entry| now.duration_since(entry.window_start) <= self.config.window);
            debug!(remaining = self.entries.len(), "rate limiter cleanup done");
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware enforcing the limit per client IP.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    match state.rate_limiter.check(addr.ip()) {
        RateLimitDecision::Allowed => next.run(request).await,
        RateLimitDecision::Limited { retry_after_secs } => {
            warn!(ip = %addr.ip(), "rate limit exceeded");
            let mut response = ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                format!("Rate limit exceeded, retry in {}s", retry_after_secs),
            )
            .into_response();
            if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_within_limit() {
        let limiter = RateLimiter::with_config(RateLimiterConfig {
            max_requests: 3,
            window: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(300),
        });
        let ip: IpAddr = "203.0.113.7".parse().unwrap();

        for _ in 0..3 {
            assert!(matches!(limiter.check(ip), RateLimitDecision::Allowed));
        }
        assert!(matches!(
            limiter.check(ip),
            RateLimitDecision::Limited { .. }
        ));
    }

    #[test]
    fn test_independent_ips() {
        let limiter = RateLimiter::with_config(RateLimiterConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(300),
        });
        let a: IpAddr = "203.0.113.7".parse().unwrap();
        let b: IpAddr = "203.0.113.8".parse().unwrap();

        assert!(matches!(limiter.check(a), RateLimitDecision::Allowed));
        assert!(matches!(limiter.check(b), RateLimitDecision::Allowed));
        assert!(matches!(limiter.check(a), RateLimitDecision::Limited { .. }));
    }

    #[test]
    fn test_window_reset() {
        let limiter = RateLimiter::with_config(RateLimiterConfig {
            max_requests: 1,
            window: Duration::from_millis(0),
            cleanup_interval: Duration::from_secs(300),
        });
        let ip: IpAddr = "203.0.113.9".parse().unwrap();

        assert!(matches!(limiter.check(ip), RateLimitDecision::Allowed));
        // The zero-length window has expired by the next request.
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(limiter.check(ip), RateLimitDecision::Allowed));
    }
}
