//! LinkGuard Risk Engine
//!
//! Two final stages of the pipeline:
//! - [`rules`]: a registry of pure heuristic rules emitting coded,
//!   severity-tagged risk factors from URL, network, trust, and ML
//!   signals
//! - [`fuser`]: fusion of the ML score, domain trust dampening, and the
//!   risk factors into the calibrated verdict

pub mod fuser;
pub mod rules;

use serde::{Deserialize, Serialize};

pub use fuser::{fuse, Verdict};
pub use rules::{detect_risk_factors, RuleContext};

/// Factor severity, ordered: low < medium < high < critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// One coded reason contributing to the verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub code: String,
    pub message: String,
    pub severity: Severity,
    pub evidence: Option<String>,
}

/// Overall verdict status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Safe,
    Suspicious,
    Danger,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Safe => "safe",
            ScanStatus::Suspicious => "suspicious",
            ScanStatus::Danger => "danger",
        }
    }
}
