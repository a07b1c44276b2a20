//! Risk-factor rule registry
//!
//! Each rule is a pure function over the per-request signals, tagged
//! with a stable code, a severity, and a message template. New codes are
//! added by extending [`REGISTRY`]; rules fire at most once and never
//! observe each other.

use linkguard_features::is_high_abuse_tld;
use linkguard_ml_engine::MlDetails;
use linkguard_net_probe::{flags, NetworkObservation};
use linkguard_reputation::{DomainTrust, NEW_DOMAIN_AGE_DAYS};
use linkguard_url_core::{decode_host, has_mixed_script_label, normalize, NormalizedUrl};
use tracing::debug;

use crate::{RiskFactor, Severity};

/// ML probability at and above which the classifier itself becomes a
/// risk factor
pub const ML_HIGH_RISK_THRESHOLD: f64 = 0.7;

/// Redirect chains longer than this are flagged
pub const REDIRECT_FLAG_THRESHOLD: u32 = 3;

/// Signals available to every rule
pub struct RuleContext<'a> {
    pub url: &'a NormalizedUrl,
    pub network: &'a NetworkObservation,
    pub trust: &'a DomainTrust,
    pub ml: Option<&'a MlDetails>,
}

type RuleCheck = fn(&RuleContext) -> Option<String>;

/// Versioned registry entry: stable code, severity, message template,
/// and the predicate returning evidence when the rule fires.
pub struct Rule {
    pub code: &'static str,
    pub severity: Severity,
    pub message: &'static str,
    check: RuleCheck,
}

/// The frozen rule registry, grouped by severity descending. Within one
/// severity group codes are kept lexicographic so the emitted order is
/// fully deterministic.
pub const REGISTRY: &[Rule] = &[
    Rule {
        code: "punycode_mixed_script",
        severity: Severity::Critical,
        message: "Domain label mixes characters from multiple scripts (homograph attack)",
        check: |ctx| {
            if !ctx.url.is_ip_literal && has_mixed_script_label(&ctx.url.host) {
                Some(format!("host decodes to '{}'", decode_host(&ctx.url.host)))
            } else {
                None
            }
        },
    },
    Rule {
        code: "invalid_ssl",
        severity: Severity::High,
        message: "HTTPS certificate failed validation",
        check: |ctx| {
            if ctx.url.scheme == linkguard_url_core::Scheme::Https
                && ctx.network.ssl_valid == Some(false)
            {
                Some(match &ctx.network.ssl_issuer {
                    Some(issuer) => format!("certificate issued by '{}'", issuer),
                    None => "certificate chain could not be validated".to_string(),
                })
            } else {
                None
            }
        },
    },
    Rule {
        code: "ip_literal_url",
        severity: Severity::High,
        message: "URL addresses a raw IP instead of a domain name",
        check: |ctx| {
            ctx.url
                .is_ip_literal
                .then(|| format!("host is {}", ctx.url.host))
        },
    },
    Rule {
        code: "login_on_nondomain",
        severity: Severity::High,
        message: "Page asks for credentials that are submitted to a foreign domain",
        check: |ctx| {
            ctx.network
                .has_content_flag(flags::LOGIN_ON_NONDOMAIN)
                .then(|| match &ctx.network.final_url {
                    Some(u) => format!("password form on {}", u),
                    None => "password form posts off-domain".to_string(),
                })
        },
    },
    Rule {
        code: "ml_high_risk",
        severity: Severity::High,
        message: "Machine-learning classifier rates this URL as high risk",
        check: |ctx| {
            let ml = ctx.ml?;
            (ml.xgb_score >= ML_HIGH_RISK_THRESHOLD)
                .then(|| format!("classifier probability {:.2}", ml.xgb_score))
        },
    },
    Rule {
        code: "new_domain",
        severity: Severity::High,
        message: "Domain was registered within the last 30 days",
        check: |ctx| {
            let age = ctx.trust.age_days?;
            (age < NEW_DOMAIN_AGE_DAYS).then(|| format!("registered {} days ago", age))
        },
    },
    Rule {
        code: "cross_domain_redirect",
        severity: Severity::Medium,
        message: "Request was redirected to a different registered domain",
        check: |ctx| {
            let final_url = ctx.network.final_url.as_deref()?;
            let final_domain = normalize(final_url).ok()?.registered_domain;
            (!final_domain.eq_ignore_ascii_case(&ctx.url.registered_domain))
                .then(|| format!("landed on {}", final_domain))
        },
    },
    Rule {
        code: "many_redirects",
        severity: Severity::Medium,
        message: "URL goes through an unusually long redirect chain",
        check: |ctx| {
            (ctx.network.redirect_count > REDIRECT_FLAG_THRESHOLD)
                .then(|| format!("{} redirects", ctx.network.redirect_count))
        },
    },
    Rule {
        code: "recent_cert",
        severity: Severity::Medium,
        message: "TLS certificate was issued very recently",
        check: |ctx| {
            (ctx.network.ssl_is_new_cert == Some(true)).then(|| {
                match ctx.network.ssl_days_until_expiry {
                    Some(days) => format!("fresh certificate, {} days to expiry", days),
                    None => "certificate issued within 30 days".to_string(),
                }
            })
        },
    },
    Rule {
        code: "suspicious_tld",
        severity: Severity::Medium,
        message: "Top-level domain is frequently used for abuse",
        check: |ctx| {
            let tld = ctx.url.tld();
            is_high_abuse_tld(tld).then(|| format!(".{}", tld))
        },
    },
    Rule {
        code: "nonstandard_port",
        severity: Severity::Low,
        message: "URL uses a port outside 80/443",
        check: |ctx| {
            let port = ctx.url.effective_port();
            (!matches!(port, 80 | 443)).then(|| format!("port {}", port))
        },
    },
];

/// Run every rule over the context. Idempotent; output is sorted by
/// severity descending with the registry's deterministic order within a
/// severity.
pub fn detect_risk_factors(ctx: &RuleContext) -> Vec<RiskFactor> {
    let mut factors: Vec<RiskFactor> = REGISTRY
        .iter()
        .filter_map(|rule| {
            (rule.check)(ctx).map(|evidence| RiskFactor {
                code: rule.code.to_string(),
                message: rule.message.to_string(),
                severity: rule.severity,
                evidence: Some(evidence),
            })
        })
        .collect();

    // Stable: registry order is preserved within a severity.
    factors.sort_by(|a, b| b.severity.cmp(&a.severity));

    debug!(count = factors.len(), "risk factors detected");
    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_reputation::ReputationTier;

    fn trust_for(url: &NormalizedUrl, tier: ReputationTier) -> DomainTrust {
        DomainTrust {
            registered_domain: url.registered_domain.clone(),
            full_domain: url.host.clone(),
            reputation_tier: tier,
            dampening_factor: tier.dampening_factor(),
            trust_description: None,
            age_days: None,
            registrar: None,
        }
    }

    fn detect(url: &str, network: NetworkObservation) -> Vec<RiskFactor> {
        let url = normalize(url).unwrap();
        let trust = trust_for(&url, ReputationTier::Unknown);
        let ctx = RuleContext {
            url: &url,
            network: &network,
            trust: &trust,
            ml: None,
        };
        detect_risk_factors(&ctx)
    }

    fn codes(factors: &[RiskFactor]) -> Vec<&str> {
        factors.iter().map(|f| f.code.as_str()).collect()
    }

    #[test]
    fn test_ip_literal_rule() {
        let factors = detect("http://185.23.14.9/login", NetworkObservation::default());
        assert!(codes(&factors).contains(&"ip_literal_url"));
    }

    #[test]
    fn test_mixed_script_rule_is_critical() {
        let factors = detect("https://p\u{0430}ypal.com/", NetworkObservation::default());
        let factor = factors
            .iter()
            .find(|f| f.code == "punycode_mixed_script")
            .unwrap();
        assert_eq!(factor.severity, Severity::Critical);
        // Critical factors sort first
        assert_eq!(factors[0].code, "punycode_mixed_script");
    }

    #[test]
    fn test_redirect_rules() {
        let network = NetworkObservation {
            redirect_count: 6,
            final_url: Some("http://evil.tk/login".to_string()),
            ssl_valid: Some(false),
            ..Default::default()
        };
        let factors = detect("https://bit.ly/abc", network);
        let codes = codes(&factors);
        assert!(codes.contains(&"many_redirects"));
        assert!(codes.contains(&"cross_domain_redirect"));
        assert!(codes.contains(&"invalid_ssl"));
    }

    #[test]
    fn test_redirect_within_domain_not_flagged() {
        let network = NetworkObservation {
            redirect_count: 1,
            final_url: Some("https://www.example.com/home".to_string()),
            ..Default::default()
        };
        let factors = detect("https://example.com/", network);
        assert!(!codes(&factors).contains(&"cross_domain_redirect"));
        assert!(!codes(&factors).contains(&"many_redirects"));
    }

    #[test]
    fn test_clean_url_no_factors() {
        let network = NetworkObservation {
            dns_resolved: Some(true),
            ssl_valid: Some(true),
            http_status: Some(200),
            final_url: Some("https://example.com/".to_string()),
            ..Default::default()
        };
        let factors = detect("https://example.com/", network);
        assert!(factors.is_empty(), "unexpected: {:?}", codes(&factors));
    }

    #[test]
    fn test_sorted_by_severity_descending() {
        let network = NetworkObservation {
            redirect_count: 6,
            ssl_valid: Some(false),
            ssl_is_new_cert: Some(true),
            ..Default::default()
        };
        let factors = detect("https://x.tk:8443/a", network);
        for pair in factors.windows(2) {
            assert!(pair[0].severity >= pair[1].severity);
        }
    }

    #[test]
    fn test_detection_idempotent() {
        let url = normalize("http://185.23.14.9:8080/login").unwrap();
        let network = NetworkObservation {
            redirect_count: 4,
            ..Default::default()
        };
        let trust = trust_for(&url, ReputationTier::Unknown);
        let ctx = RuleContext {
            url: &url,
            network: &network,
            trust: &trust,
            ml: None,
        };
        assert_eq!(detect_risk_factors(&ctx), detect_risk_factors(&ctx));
    }

    #[test]
    fn test_every_fired_factor_has_evidence() {
        let network = NetworkObservation {
            redirect_count: 5,
            ssl_valid: Some(false),
            ssl_is_new_cert: Some(true),
            final_url: Some("http://other.example/".to_string()),
            content_flags: vec![flags::LOGIN_ON_NONDOMAIN.to_string()],
            ..Default::default()
        };
        let factors = detect("https://login-верify.tk:8080/x", network);
        assert!(!factors.is_empty());
        for f in &factors {
            assert!(f.evidence.is_some(), "{} lacks evidence", f.code);
        }
    }
}
