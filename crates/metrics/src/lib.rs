//! LinkGuard Metrics - scan counters and cache statistics

use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

#[derive(Default)]
pub struct MetricsCollector {
    total_scans: AtomicU64,
    safe_verdicts: AtomicU64,
    suspicious_verdicts: AtomicU64,
    danger_verdicts: AtomicU64,
    failed_scans: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    total_analysis_ms: AtomicU64,
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub total_scans: u64,
    pub safe_verdicts: u64,
    pub suspicious_verdicts: u64,
    pub danger_verdicts: u64,
    pub failed_scans: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub avg_analysis_ms: f64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_scan(&self, status: &str, analysis_ms: u64) {
        self.total_scans.fetch_add(1, Ordering::Relaxed);
        self.total_analysis_ms.fetch_add(analysis_ms, Ordering::Relaxed);
        match status {
            "safe" => self.safe_verdicts.fetch_add(1, Ordering::Relaxed),
            "suspicious" => self.suspicious_verdicts.fetch_add(1, Ordering::Relaxed),
            "danger" => self.danger_verdicts.fetch_add(1, Ordering::Relaxed),
            _ => 0,
        };
    }

    pub fn record_failure(&self) {
        self.failed_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let scans = self.total_scans.load(Ordering::Relaxed);
        let total_ms = self.total_analysis_ms.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_scans: scans,
            safe_verdicts: self.safe_verdicts.load(Ordering::Relaxed),
            suspicious_verdicts: self.suspicious_verdicts.load(Ordering::Relaxed),
            danger_verdicts: self.danger_verdicts.load(Ordering::Relaxed),
            failed_scans: self.failed_scans.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate: if lookups > 0 { hits as f64 / lookups as f64 } else { 0.0 },
            avg_analysis_ms: if scans > 0 { total_ms as f64 / scans as f64 } else { 0.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_counters() {
        let metrics = MetricsCollector::new();
        metrics.record_scan("safe", 10);
        metrics.record_scan("danger", 30);
        metrics.record_scan("safe", 20);

        let snap = metrics.snapshot();
        assert_eq!(snap.total_scans, 3);
        assert_eq!(snap.safe_verdicts, 2);
        assert_eq!(snap.danger_verdicts, 1);
        assert_eq!(snap.avg_analysis_ms, 20.0);
    }

    #[test]
    fn test_cache_hit_rate() {
        let metrics = MetricsCollector::new();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        assert!((metrics.snapshot().cache_hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }
}
