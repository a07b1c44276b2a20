//! Result cache
//!
//! LRU keyed by the canonical URL string so trivially different inputs
//! ("HTTPS://x.com", "x.com/") share one entry. TTL is enforced lazily
//! on read; a single lock guards both read and write paths.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::result::ScanResult;

struct CachedScan {
    result: ScanResult,
    stored_at: Instant,
}

pub struct ResultCache {
    inner: Mutex<LruCache<String, CachedScan>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<ScanResult> {
        let mut cache = self.inner.lock();
        match cache.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.result.clone()),
            Some(_) => {
                debug!(key, "evicting expired cache entry");
                cache.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, result: ScanResult) {
        self.inner.lock().put(
            key,
            CachedScan {
                result,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_ml_engine::MlDetails;
    use linkguard_net_probe::NetworkObservation;
    use linkguard_reputation::{DomainTrust, ReputationTier};
    use linkguard_risk_engine::ScanStatus;

    fn sample_result() -> ScanResult {
        ScanResult {
            status: ScanStatus::Safe,
            message: "No threats detected".to_string(),
            risk_score: 0.0,
            details: crate::result::ScanDetails {
                ml: MlDetails {
                    ml_score: 0.0,
                    xgb_score: 0.0,
                    dampened_score: 0.0,
                    explanation: Vec::new(),
                },
                domain: DomainTrust {
                    registered_domain: "example.com".to_string(),
                    full_domain: "example.com".to_string(),
                    reputation_tier: ReputationTier::Unknown,
                    dampening_factor: 0.85,
                    trust_description: None,
                    age_days: None,
                    registrar: None,
                },
                network: NetworkObservation::default(),
                risk_factors: Vec::new(),
                analysis_time_ms: None,
            },
        }
    }

    #[test]
    fn test_round_trip() {
        let cache = ResultCache::new(4, Duration::from_secs(60));
        cache.put("https://example.com/".to_string(), sample_result());
        assert!(cache.get("https://example.com/").is_some());
        assert!(cache.get("https://other.example/").is_none());
    }

    #[test]
    fn test_ttl_expiry_on_read() {
        let cache = ResultCache::new(4, Duration::from_millis(0));
        cache.put("k".to_string(), sample_result());
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ResultCache::new(2, Duration::from_secs(60));
        cache.put("a".to_string(), sample_result());
        cache.put("b".to_string(), sample_result());
        cache.put("c".to_string(), sample_result());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
    }
}
