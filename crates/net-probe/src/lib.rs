//! LinkGuard Network Probe
//!
//! Live observation of a URL under strict budgets:
//! - DNS resolution with private-range and multi-homing flags
//! - TLS handshake and leaf-certificate inspection (https only)
//! - First-hop HTTP fetch following a bounded redirect chain
//! - Best-effort content inspection of the final body
//!
//! Every step is independently time-boxed and failure-isolated: a step
//! that fails or times out leaves its fields absent and the probe moves
//! on. The probe itself never returns an error.

pub mod content;
pub mod dns;
pub mod http;
pub mod tls;

use async_trait::async_trait;
use dashmap::DashMap;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use linkguard_url_core::{NormalizedUrl, Scheme};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Observation flags recorded by the probe steps
pub mod flags {
    pub const PRIVATE_IP: &str = "private_ip";
    pub const MULTIPLE_A: &str = "multiple_a";
    pub const NXDOMAIN: &str = "nxdomain";
    pub const META_REFRESH: &str = "meta_refresh";
    pub const JS_REDIRECT: &str = "js_redirect";
    pub const LOGIN_FORM: &str = "login_form";
    pub const LOGIN_ON_NONDOMAIN: &str = "login_on_nondomain";
}

/// Per-step time budgets for one probe run
#[derive(Debug, Clone)]
pub struct ProbeBudgets {
    pub dns_timeout: Duration,
    pub tls_timeout: Duration,
    pub http_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for ProbeBudgets {
    fn default() -> Self {
        Self {
            dns_timeout: Duration::from_millis(1500),
            tls_timeout: Duration::from_millis(3000),
            http_timeout: Duration::from_millis(5000),
            max_redirects: 5,
        }
    }
}

/// Everything the probe learned about a URL. Absent fields mean the
/// corresponding step did not complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkObservation {
    pub dns_resolved: Option<bool>,
    pub dns_ttl: Option<u32>,
    pub dns_flags: Vec<String>,
    pub ssl_valid: Option<bool>,
    pub ssl_issuer: Option<String>,
    pub ssl_days_until_expiry: Option<i64>,
    pub ssl_is_new_cert: Option<bool>,
    pub http_status: Option<u16>,
    pub redirect_count: u32,
    pub final_url: Option<String>,
    pub content_flags: Vec<String>,
}

impl NetworkObservation {
    pub fn has_dns_flag(&self, flag: &str) -> bool {
        self.dns_flags.iter().any(|f| f == flag)
    }

    pub fn has_content_flag(&self, flag: &str) -> bool {
        self.content_flags.iter().any(|f| f == flag)
    }
}

/// Seam between the orchestrator and the live network. Tests stub this.
#[async_trait]
pub trait UrlProber: Send + Sync {
    async fn probe(&self, url: &NormalizedUrl, budgets: &ProbeBudgets) -> NetworkObservation;
}

const GLOBAL_HTTP_PERMITS: usize = 64;
const PER_HOST_HTTP_PERMITS: usize = 4;

/// Live prober backed by hickory-resolver, rustls, and reqwest.
pub struct NetworkProber {
    resolver: TokioAsyncResolver,
    client: reqwest::Client,
    tls: tls::TlsInspector,
    global_permits: Arc<Semaphore>,
    per_host_permits: DashMap<String, Arc<Semaphore>>,
}

impl NetworkProber {
    pub fn new() -> anyhow::Result<Self> {
        info!("Initializing network prober");

        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(2);
        opts.attempts = 2;
        opts.use_hosts_file = false;

        let resolver = TokioAsyncResolver::tokio(ResolverConfig::cloudflare(), opts);

        // Redirects are followed manually so each hop can be normalized,
        // budget-checked, and recorded.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("LinkGuard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            resolver,
            client,
            tls: tls::TlsInspector::new(),
            global_permits: Arc::new(Semaphore::new(GLOBAL_HTTP_PERMITS)),
            per_host_permits: DashMap::new(),
        })
    }

    fn host_permits(&self, host: &str) -> Arc<Semaphore> {
        self.per_host_permits
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(PER_HOST_HTTP_PERMITS)))
            .clone()
    }
}

#[async_trait]
impl UrlProber for NetworkProber {
    async fn probe(&self, url: &NormalizedUrl, budgets: &ProbeBudgets) -> NetworkObservation {
        let mut obs = NetworkObservation::default();

        // DNS
        match timeout(budgets.dns_timeout, dns::resolve(&self.resolver, url)).await {
            Ok(dns_obs) => dns_obs.apply(&mut obs),
            Err(_) => debug!(host = %url.host, "DNS lookup exceeded budget"),
        }

        if obs.dns_resolved == Some(false) {
            // Nothing to connect to.
            return obs;
        }

        // TLS
        if url.scheme == Scheme::Https {
            match timeout(
                budgets.tls_timeout,
                self.tls.inspect(&url.host, url.effective_port()),
            )
            .await
            {
                Ok(tls_obs) => tls_obs.apply(&mut obs),
                Err(_) => debug!(host = %url.host, "TLS inspection exceeded budget"),
            }
        }

        // HTTP, gated by the connection-pool permits. Waiting for a
        // permit races the step budget; losing the race skips the step.
        let deadline = Instant::now() + budgets.http_timeout;
        let global = match timeout_at(deadline, self.global_permits.clone().acquire_owned()).await {
            Some(Ok(permit)) => permit,
            _ => {
                warn!(host = %url.host, "HTTP pool saturated, skipping probe");
                return obs;
            }
        };
        let host_permit =
            match timeout_at(deadline, self.host_permits(&url.host).acquire_owned()).await {
                Some(Ok(permit)) => permit,
                _ => {
                    warn!(host = %url.host, "per-host HTTP limit reached, skipping probe");
                    return obs;
                }
            };

        let remaining = deadline.saturating_duration_since(Instant::now());
        if !remaining.is_zero() {
            let fetched = http::fetch(&self.client, url, budgets.max_redirects, remaining).await;
            fetched.apply(url, &mut obs);
        }
        drop(host_permit);
        drop(global);

        obs
    }
}

async fn timeout_at<F, T>(deadline: Instant, fut: F) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    let remaining = deadline.saturating_duration_since(Instant::now());
    timeout(remaining, fut).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let b = ProbeBudgets::default();
        assert_eq!(b.dns_timeout, Duration::from_millis(1500));
        assert_eq!(b.max_redirects, 5);
    }

    #[test]
    fn test_observation_defaults_are_absent() {
        let obs = NetworkObservation::default();
        assert_eq!(obs.dns_resolved, None);
        assert_eq!(obs.ssl_valid, None);
        assert_eq!(obs.http_status, None);
        assert_eq!(obs.redirect_count, 0);
        assert!(obs.dns_flags.is_empty());
    }

    #[tokio::test]
    async fn test_pool_saturation_skips_http() {
        let prober = NetworkProber::new().unwrap();
        // Drain the global pool so acquisition must wait out the budget.
        let mut held = Vec::new();
        for _ in 0..GLOBAL_HTTP_PERMITS {
            held.push(prober.global_permits.clone().acquire_owned().await.unwrap());
        }

        let url = linkguard_url_core::normalize("http://192.0.2.1/").unwrap();
        let budgets = ProbeBudgets {
            dns_timeout: Duration::from_millis(1),
            tls_timeout: Duration::from_millis(1),
            http_timeout: Duration::from_millis(10),
            max_redirects: 1,
        };
        let obs = prober.probe(&url, &budgets).await;
        assert_eq!(obs.http_status, None);
        assert_eq!(obs.final_url, None);
    }
}
