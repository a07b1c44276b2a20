//! LinkGuard Domain Reputation
//!
//! Classifies a registered domain into a trust tier carrying a dampening
//! factor for the ML score. Sources: a curated embedded table, an
//! optional CSV overlay, and best-effort WHOIS enrichment.

pub mod table;
pub mod whois;

use arc_swap::ArcSwap;
use linkguard_url_core::NormalizedUrl;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub use table::TrustTable;
pub use whois::{TcpWhoisClient, WhoisClient, WhoisInfo};

/// Domains registered more recently than this escalate `unknown` to
/// `untrusted`.
pub const NEW_DOMAIN_AGE_DAYS: i64 = 30;

/// Ordinal trust classification. Dampening is monotonic across the
/// ordering trusted < moderate < neutral < untrusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReputationTier {
    Trusted,
    Moderate,
    Neutral,
    Untrusted,
    Unknown,
}

impl ReputationTier {
    /// Multiplier applied to the raw ML probability
    pub fn dampening_factor(&self) -> f64 {
        match self {
            ReputationTier::Trusted => 0.2,
            ReputationTier::Moderate => 0.5,
            ReputationTier::Neutral => 0.7,
            ReputationTier::Untrusted => 1.0,
            ReputationTier::Unknown => 0.85,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReputationTier::Trusted => "trusted",
            ReputationTier::Moderate => "moderate",
            ReputationTier::Neutral => "neutral",
            ReputationTier::Untrusted => "untrusted",
            ReputationTier::Unknown => "unknown",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "trusted" => Some(ReputationTier::Trusted),
            "moderate" => Some(ReputationTier::Moderate),
            "neutral" => Some(ReputationTier::Neutral),
            "untrusted" => Some(ReputationTier::Untrusted),
            "unknown" => Some(ReputationTier::Unknown),
            _ => None,
        }
    }
}

/// Trust assessment for one scanned URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainTrust {
    pub registered_domain: String,
    pub full_domain: String,
    pub reputation_tier: ReputationTier,
    pub dampening_factor: f64,
    pub trust_description: Option<String>,
    pub age_days: Option<i64>,
    pub registrar: Option<String>,
}

/// Reputation engine: swap-on-reload table plus optional WHOIS client.
pub struct ReputationEngine {
    table: ArcSwap<TrustTable>,
    whois: Option<Arc<dyn WhoisClient>>,
    whois_timeout: Duration,
}

impl ReputationEngine {
    pub fn new() -> Self {
        info!("Initializing reputation engine with embedded trust table");
        Self {
            table: ArcSwap::from_pointee(TrustTable::embedded()),
            whois: None,
            whois_timeout: Duration::from_millis(2500),
        }
    }

    pub fn with_table(table: TrustTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
            whois: None,
            whois_timeout: Duration::from_millis(2500),
        }
    }

    pub fn with_whois(mut self, client: Arc<dyn WhoisClient>, budget: Duration) -> Self {
        self.whois = Some(client);
        self.whois_timeout = budget;
        self
    }

    /// Merge a CSV overlay (`domain,tier[,description]`) over the
    /// embedded table and swap it in atomically.
    pub fn load_csv(&self, path: &Path) -> anyhow::Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let mut table = TrustTable::embedded();
        let mut loaded = 0usize;

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(3, ',');
            let domain = parts.next().unwrap_or("").trim().to_ascii_lowercase();
            let tier_str = parts.next().unwrap_or("").trim();
            let description = parts.next().map(|d| d.trim().to_string());

            match ReputationTier::parse(tier_str) {
                Some(tier) if !domain.is_empty() => {
                    table.insert(&domain, tier, description);
                    loaded += 1;
                }
                _ => warn!(line = lineno + 1, "skipping malformed reputation entry"),
            }
        }

        self.table.store(Arc::new(table));
        info!(entries = loaded, path = %path.display(), "reputation table reloaded");
        Ok(loaded)
    }

    /// Table-only assessment with no WHOIS I/O, for paths that must not
    /// block (timeout fallback).
    pub fn assess_offline(&self, url: &NormalizedUrl) -> DomainTrust {
        let table = self.table.load();
        let (tier, description) = table.lookup(&url.host, &url.registered_domain);
        DomainTrust {
            registered_domain: url.registered_domain.clone(),
            full_domain: url.host.clone(),
            reputation_tier: tier,
            dampening_factor: tier.dampening_factor(),
            trust_description: description,
            age_days: None,
            registrar: None,
        }
    }

    /// Assess trust for a normalized URL.
    pub async fn assess(&self, url: &NormalizedUrl) -> DomainTrust {
        let table = self.table.load();
        let (mut tier, description) = table.lookup(&url.host, &url.registered_domain);

        let mut age_days = None;
        let mut registrar = None;

        if let Some(whois) = &self.whois {
            if !url.is_ip_literal {
                match timeout(self.whois_timeout, whois.lookup(&url.registered_domain)).await {
                    Ok(Some(info)) => {
                        age_days = info.age_days;
                        registrar = info.registrar;
                    }
                    Ok(None) => debug!(domain = %url.registered_domain, "WHOIS lookup empty"),
                    Err(_) => debug!(domain = %url.registered_domain, "WHOIS exceeded budget"),
                }
            }
        }

        // A domain nobody vouches for that was registered days ago is
        // treated as hostile until proven otherwise.
        if tier == ReputationTier::Unknown {
            if let Some(age) = age_days {
                if age < NEW_DOMAIN_AGE_DAYS {
                    tier = ReputationTier::Untrusted;
                }
            }
        }

        DomainTrust {
            registered_domain: url.registered_domain.clone(),
            full_domain: url.host.clone(),
            reputation_tier: tier,
            dampening_factor: tier.dampening_factor(),
            trust_description: description,
            age_days,
            registrar,
        }
    }
}

impl Default for ReputationEngine {
    fn default() -> Self {
        Self::new()
    }
}
