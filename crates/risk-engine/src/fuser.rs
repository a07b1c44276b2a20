//! Verdict fusion
//!
//! Combines the ML probability, the trust-tier dampening factor, and the
//! detected risk factors into the final calibrated score and status.

use linkguard_ml_engine::MlDetails;
use linkguard_reputation::{DomainTrust, ReputationTier};
use tracing::debug;

use crate::{RiskFactor, ScanStatus, Severity};

/// Score at and above which the verdict is danger
pub const DANGER_THRESHOLD: f64 = 0.60;

/// Score at and above which the verdict is suspicious
pub const SUSPICIOUS_THRESHOLD: f64 = 0.30;

/// Cap on the additive severity boost
const SEVERITY_BOOST_CAP: f64 = 0.5;

const CRITICAL_BOOST: f64 = 0.15;
const HIGH_BOOST: f64 = 0.08;
const MEDIUM_BOOST: f64 = 0.03;

/// Fused verdict, consumed by the orchestrator to build the response
#[derive(Debug, Clone)]
pub struct Verdict {
    pub status: ScanStatus,
    pub message: String,
    pub risk_score: f64,
    /// Same value as `risk_score`; also written back into the ML block
    pub dampened_score: f64,
}

/// Fuse the pipeline outputs. `ml` is absent when inference failed; the
/// verdict then rests on the heuristic factors alone.
pub fn fuse(ml: Option<&MlDetails>, trust: &DomainTrust, factors: &[RiskFactor]) -> Verdict {
    let critical = count(factors, Severity::Critical);
    let high = count(factors, Severity::High);
    let medium = count(factors, Severity::Medium);

    let severity_boost = (CRITICAL_BOOST * critical as f64
        + HIGH_BOOST * high as f64
        + MEDIUM_BOOST * medium as f64)
        .min(SEVERITY_BOOST_CAP);

    let xgb_score = ml.map(|m| m.xgb_score).unwrap_or(0.0);
    let dampened_score = (xgb_score * trust.dampening_factor + severity_boost).min(1.0);
    let risk_score = dampened_score;

    let untrusted = trust.reputation_tier == ReputationTier::Untrusted;

    let status = if risk_score >= DANGER_THRESHOLD || critical > 0 || (untrusted && high > 0) {
        ScanStatus::Danger
    } else if risk_score >= SUSPICIOUS_THRESHOLD || high > 0 || untrusted {
        ScanStatus::Suspicious
    } else {
        ScanStatus::Safe
    };

    let message = match (ml, status) {
        (None, _) => "ML unavailable".to_string(),
        (_, ScanStatus::Safe) => "No threats detected".to_string(),
        (_, ScanStatus::Suspicious) => match factors.first() {
            Some(top) => format!("Caution: {}", top.message),
            None => "Suspicious characteristics detected".to_string(),
        },
        (_, ScanStatus::Danger) => match factors.first() {
            Some(top) => format!("High risk: {}", top.message),
            None => "High risk URL detected".to_string(),
        },
    };

    debug!(
        xgb = xgb_score,
        dampening = trust.dampening_factor,
        boost = severity_boost,
        risk = risk_score,
        status = status.as_str(),
        "verdict fused"
    );

    Verdict {
        status,
        message,
        risk_score,
        dampened_score,
    }
}

fn count(factors: &[RiskFactor], severity: Severity) -> usize {
    factors.iter().filter(|f| f.severity == severity).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ml(score: f64) -> MlDetails {
        MlDetails {
            ml_score: score,
            xgb_score: score,
            dampened_score: score,
            explanation: Vec::new(),
        }
    }

    fn trust(tier: ReputationTier) -> DomainTrust {
        DomainTrust {
            registered_domain: "example.com".to_string(),
            full_domain: "example.com".to_string(),
            reputation_tier: tier,
            dampening_factor: tier.dampening_factor(),
            trust_description: None,
            age_days: None,
            registrar: None,
        }
    }

    fn factor(code: &str, severity: Severity) -> RiskFactor {
        RiskFactor {
            code: code.to_string(),
            message: format!("{} fired", code),
            severity,
            evidence: None,
        }
    }

    #[test]
    fn test_trusted_clean_url_is_safe() {
        let v = fuse(Some(&ml(0.1)), &trust(ReputationTier::Trusted), &[]);
        assert_eq!(v.status, ScanStatus::Safe);
        assert_eq!(v.message, "No threats detected");
        assert!(v.risk_score < 0.3);
    }

    #[test]
    fn test_high_score_is_danger() {
        let v = fuse(Some(&ml(0.9)), &trust(ReputationTier::Unknown), &[]);
        assert_eq!(v.status, ScanStatus::Danger);
        assert!(v.risk_score >= DANGER_THRESHOLD);
    }

    #[test]
    fn test_critical_factor_forces_danger() {
        let factors = vec![factor("punycode_mixed_script", Severity::Critical)];
        let v = fuse(Some(&ml(0.05)), &trust(ReputationTier::Trusted), &factors);
        assert_eq!(v.status, ScanStatus::Danger);
    }

    #[test]
    fn test_untrusted_plus_high_forces_danger() {
        let factors = vec![factor("invalid_ssl", Severity::High)];
        let v = fuse(Some(&ml(0.1)), &trust(ReputationTier::Untrusted), &factors);
        assert_eq!(v.status, ScanStatus::Danger);
    }

    #[test]
    fn test_untrusted_alone_is_suspicious() {
        let v = fuse(Some(&ml(0.05)), &trust(ReputationTier::Untrusted), &[]);
        assert_eq!(v.status, ScanStatus::Suspicious);
    }

    #[test]
    fn test_high_factor_alone_is_suspicious() {
        let factors = vec![factor("ip_literal_url", Severity::High)];
        let v = fuse(Some(&ml(0.1)), &trust(ReputationTier::Neutral), &factors);
        assert_eq!(v.status, ScanStatus::Suspicious);
    }

    #[test]
    fn test_severity_boost_capped() {
        let factors: Vec<RiskFactor> = (0..10)
            .map(|i| factor(&format!("c{}", i), Severity::Critical))
            .collect();
        let v = fuse(Some(&ml(0.0)), &trust(ReputationTier::Trusted), &factors);
        // 10 criticals would boost by 1.5 uncapped
        assert!(v.risk_score <= SEVERITY_BOOST_CAP + f64::EPSILON);
    }

    #[test]
    fn test_risk_score_bounded() {
        let factors = vec![
            factor("a", Severity::Critical),
            factor("b", Severity::Critical),
            factor("c", Severity::High),
        ];
        let v = fuse(Some(&ml(1.0)), &trust(ReputationTier::Untrusted), &factors);
        assert!(v.risk_score <= 1.0);
        assert!(v.risk_score >= 0.0);
    }

    #[test]
    fn test_monotonic_in_ml_score() {
        let factors = vec![factor("suspicious_tld", Severity::Medium)];
        let t = trust(ReputationTier::Unknown);
        let mut previous = -1.0;
        for step in 0..=20 {
            let score = step as f64 / 20.0;
            let v = fuse(Some(&ml(score)), &t, &factors);
            assert!(v.risk_score >= previous);
            previous = v.risk_score;
        }
    }

    #[test]
    fn test_trust_dampening_ordering() {
        let factors = vec![factor("suspicious_tld", Severity::Medium)];
        let trusted = fuse(Some(&ml(0.8)), &trust(ReputationTier::Trusted), &factors);
        let unknown = fuse(Some(&ml(0.8)), &trust(ReputationTier::Unknown), &factors);
        assert!(trusted.dampened_score <= unknown.dampened_score);
    }

    #[test]
    fn test_ml_unavailable_message() {
        let factors = vec![factor("ip_literal_url", Severity::High)];
        let v = fuse(None, &trust(ReputationTier::Unknown), &factors);
        assert_eq!(v.message, "ML unavailable");
        assert_eq!(v.status, ScanStatus::Suspicious);
    }

    #[test]
    fn test_message_quotes_top_factor() {
        let factors = vec![
            factor("punycode_mixed_script", Severity::Critical),
            factor("suspicious_tld", Severity::Medium),
        ];
        let v = fuse(Some(&ml(0.5)), &trust(ReputationTier::Unknown), &factors);
        assert!(v.message.contains("punycode_mixed_script fired"));
    }
}
