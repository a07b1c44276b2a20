//! LinkGuard Scan Engine
//!
//! The orchestrator driving one URL through the full pipeline:
//! normalize, then probe / reputation / feature-extraction+ML
//! concurrently, then risk rules and verdict fusion. The whole run is
//! bounded by a wall-clock budget; expiry degrades to a heuristic-only
//! verdict instead of an error.

pub mod cache;
pub mod config;
pub mod error;
pub mod result;

use linkguard_features::extract;
use linkguard_metrics::MetricsCollector;
use linkguard_ml_engine::{MlDetails, MlPredictor};
use linkguard_net_probe::{NetworkObservation, NetworkProber, UrlProber};
use linkguard_reputation::{ReputationEngine, TcpWhoisClient};
use linkguard_risk_engine::{detect_risk_factors, fuse, RuleContext, ScanStatus};
use linkguard_url_core::{normalize, NormalizedUrl};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use cache::ResultCache;
pub use config::ScannerConfig;
pub use error::ScanError;
pub use result::{ScanDetails, ScanResult};

/// Shared, request-independent pipeline state. One instance serves all
/// concurrent scans; everything inside is immutable or internally
/// synchronized.
pub struct Scanner {
    config: ScannerConfig,
    predictor: Arc<MlPredictor>,
    reputation: Arc<ReputationEngine>,
    prober: Arc<dyn UrlProber>,
    cache: Option<ResultCache>,
    metrics: Arc<MetricsCollector>,
}

impl Scanner {
    /// Build a scanner with live network components.
    pub fn new(config: ScannerConfig) -> anyhow::Result<Self> {
        Builder::new(config).build()
    }

    /// Builder for swapping components (stub probers in tests, shared
    /// metrics in the server).
    pub fn builder(config: ScannerConfig) -> Builder {
        Builder::new(config)
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Analyze one URL and produce a verdict.
    ///
    /// Only [`ScanError::InvalidInput`] and [`ScanError::Internal`] can
    /// come back; every network or model failure degrades into the
    /// returned [`ScanResult`] instead.
    pub async fn scan(&self, raw_url: &str) -> Result<ScanResult, ScanError> {
        let started = Instant::now();
        let url = normalize(raw_url)?;
        let cache_key = url.to_string();
        let scan_id = Uuid::new_v4();

        debug!(%scan_id, url = %cache_key, "scan started");

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&cache_key) {
                self.metrics.record_cache_hit();
                debug!(%scan_id, "served from cache");
                return Ok(hit);
            }
            self.metrics.record_cache_miss();
        }

        let outcome = timeout(self.config.request_timeout(), self.analyze(&url, started)).await;

        let result = match outcome {
            Ok((result, complete)) => {
                if complete {
                    if let Some(cache) = &self.cache {
                        cache.put(cache_key, result.clone());
                    }
                } else {
                    self.metrics.record_failure();
                }
                result
            }
            Err(_) => {
                warn!(%scan_id, budget_ms = self.config.request_timeout_ms, "scan deadline expired");
                self.metrics.record_failure();
                self.timeout_verdict(&url, started)
            }
        };

        self.metrics
            .record_scan(result.status.as_str(), started.elapsed().as_millis() as u64);
        info!(
            %scan_id,
            status = result.status.as_str(),
            risk_score = result.risk_score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan finished"
        );
        Ok(result)
    }

    /// Full pipeline run. Returns the result and whether it is complete
    /// (complete results are cacheable; ML-degraded ones are not).
    async fn analyze(&self, url: &NormalizedUrl, started: Instant) -> (ScanResult, bool) {
        let budgets = self.config.probe_budgets();

        // CPU-bound inference runs on the blocking pool so probe I/O and
        // WHOIS proceed underneath it.
        let features = extract(url);
        let predictor = self.predictor.clone();
        let ml_task = tokio::task::spawn_blocking(move || predictor.predict(&features));

        let (network, trust, ml_outcome) = tokio::join!(
            self.prober.probe(url, &budgets),
            self.reputation.assess(url),
            ml_task,
        );

        let ml: Option<MlDetails> = match ml_outcome {
            Ok(Ok(details)) => Some(details),
            Ok(Err(e)) => {
                warn!(error = %e, "ML inference failed, falling back to heuristics");
                None
            }
            Err(e) => {
                error!(error = %e, "ML worker task died");
                None
            }
        };
        let ml_complete = ml.is_some();

        let ctx = RuleContext {
            url,
            network: &network,
            trust: &trust,
            ml: ml.as_ref(),
        };
        let factors = detect_risk_factors(&ctx);
        let verdict = fuse(ml.as_ref(), &trust, &factors);

        let ml_details = match ml {
            Some(mut details) => {
                details.dampened_score = verdict.dampened_score;
                details
            }
            None => MlDetails {
                ml_score: 0.0,
                xgb_score: 0.0,
                dampened_score: verdict.dampened_score,
                explanation: Vec::new(),
            },
        };

        let result = ScanResult {
            status: verdict.status,
            message: verdict.message,
            risk_score: verdict.risk_score,
            details: ScanDetails {
                ml: ml_details,
                domain: trust,
                network,
                risk_factors: factors,
                analysis_time_ms: Some(started.elapsed().as_millis() as u64),
            },
        };

        (result, ml_complete)
    }

    /// Reduced verdict for an expired deadline: heuristics over the URL
    /// alone, fixed score and message.
    fn timeout_verdict(&self, url: &NormalizedUrl, started: Instant) -> ScanResult {
        let trust = self.reputation.assess_offline(url);
        let network = NetworkObservation::default();
        let ctx = RuleContext {
            url,
            network: &network,
            trust: &trust,
            ml: None,
        };
        let factors = detect_risk_factors(&ctx);

        ScanResult {
            status: ScanStatus::Suspicious,
            message: "Analysis timed out".to_string(),
            risk_score: 0.5,
            details: ScanDetails {
                ml: MlDetails {
                    ml_score: 0.0,
                    xgb_score: 0.0,
                    dampened_score: 0.5,
                    explanation: Vec::new(),
                },
                domain: trust,
                network,
                risk_factors: factors,
                analysis_time_ms: Some(started.elapsed().as_millis() as u64),
            },
        }
    }
}

/// Assembles a [`Scanner`], defaulting every component to its live
/// implementation.
pub struct Builder {
    config: ScannerConfig,
    prober: Option<Arc<dyn UrlProber>>,
    reputation: Option<Arc<ReputationEngine>>,
    predictor: Option<Arc<MlPredictor>>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Builder {
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            prober: None,
            reputation: None,
            predictor: None,
            metrics: None,
        }
    }

    pub fn prober(mut self, prober: Arc<dyn UrlProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn reputation(mut self, reputation: Arc<ReputationEngine>) -> Self {
        self.reputation = Some(reputation);
        self
    }

    pub fn predictor(mut self, predictor: Arc<MlPredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> anyhow::Result<Scanner> {
        let config = self.config;

        let predictor = match self.predictor {
            Some(p) => p,
            None => Arc::new(MlPredictor::from_path(config.model_path.as_deref())?),
        };

        let reputation = match self.reputation {
            Some(r) => r,
            None => {
                let mut engine = ReputationEngine::new();
                if config.whois_enabled {
                    engine = engine
                        .with_whois(Arc::new(TcpWhoisClient::new()), config.whois_timeout());
                }
                if let Some(path) = &config.reputation_path {
                    engine.load_csv(path)?;
                }
                Arc::new(engine)
            }
        };

        let prober: Arc<dyn UrlProber> = match self.prober {
            Some(p) => p,
            None => Arc::new(NetworkProber::new()?),
        };

        let cache = config
            .cache_enabled
            .then(|| ResultCache::new(config.cache_size, config.cache_ttl()));

        info!(
            cache = config.cache_enabled,
            whois = config.whois_enabled,
            timeout_ms = config.request_timeout_ms,
            "scanner assembled"
        );

        Ok(Scanner {
            config,
            predictor,
            reputation,
            prober,
            cache,
            metrics: self.metrics.unwrap_or_else(|| Arc::new(MetricsCollector::new())),
        })
    }
}
