//! Wire types returned to clients

use linkguard_ml_engine::MlDetails;
use linkguard_net_probe::NetworkObservation;
use linkguard_reputation::DomainTrust;
use linkguard_risk_engine::{RiskFactor, ScanStatus};
use serde::{Deserialize, Serialize};

/// Complete verdict for one scanned URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub status: ScanStatus,
    pub message: String,
    pub risk_score: f64,
    pub details: ScanDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDetails {
    pub ml: MlDetails,
    pub domain: DomainTrust,
    pub network: NetworkObservation,
    pub risk_factors: Vec<RiskFactor>,
    pub analysis_time_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_reputation::ReputationTier;

    #[test]
    fn test_wire_shape() {
        let result = ScanResult {
            status: ScanStatus::Safe,
            message: "No threats detected".to_string(),
            risk_score: 0.02,
            details: ScanDetails {
                ml: MlDetails {
                    ml_score: 0.1,
                    xgb_score: 0.1,
                    dampened_score: 0.02,
                    explanation: Vec::new(),
                },
                domain: DomainTrust {
                    registered_domain: "example.com".to_string(),
                    full_domain: "example.com".to_string(),
                    reputation_tier: ReputationTier::Trusted,
                    dampening_factor: 0.2,
                    trust_description: None,
                    age_days: None,
                    registrar: None,
                },
                network: NetworkObservation::default(),
                risk_factors: Vec::new(),
                analysis_time_ms: Some(42),
            },
        };

        let json: serde_json::Value = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "safe");
        assert_eq!(json["details"]["domain"]["reputation_tier"], "trusted");
        assert_eq!(json["details"]["network"]["redirect_count"], 0);
        assert!(json["details"]["network"]["dns_resolved"].is_null());
        assert_eq!(json["details"]["analysis_time_ms"], 42);
    }
}
