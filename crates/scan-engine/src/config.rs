//! Scanner configuration

use linkguard_net_probe::ProbeBudgets;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, anyhow};

/// Full configuration of the analysis pipeline and its transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Key clients must present in `X-API-Key`; `None` disables auth
    pub api_key: Option<String>,
    /// Overall wall-clock budget per scan
    pub request_timeout_ms: u64,
    pub dns_timeout_ms: u64,
    pub tls_timeout_ms: u64,
    pub http_timeout_ms: u64,
    pub max_redirects: usize,
    pub cache_enabled: bool,
    pub cache_ttl_s: u64,
    pub cache_size: usize,
    pub whois_enabled: bool,
    pub whois_timeout_ms: u64,
    /// GBDT artifact; the compiled-in default model is used when unset
    pub model_path: Option<PathBuf>,
    /// CSV overlay for the reputation table
    pub reputation_path: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            request_timeout_ms: 8000,
            dns_timeout_ms: 1500,
            tls_timeout_ms: 3000,
            http_timeout_ms: 5000,
            max_redirects: 5,
            cache_enabled: true,
            cache_ttl_s: 600,
            cache_size: 1024,
            whois_enabled: false,
            whois_timeout_ms: 2500,
            model_path: None,
            reputation_path: None,
        }
    }
}

impl ScannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScannerConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        Ok(config)
    }

    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// API key with the `LINKGUARD_API_KEY` env override applied
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("LINKGUARD_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
    }

    pub fn probe_budgets(&self) -> ProbeBudgets {
        ProbeBudgets {
            dns_timeout: Duration::from_millis(self.dns_timeout_ms),
            tls_timeout: Duration::from_millis(self.tls_timeout_ms),
            http_timeout: Duration::from_millis(self.http_timeout_ms),
            max_redirects: self.max_redirects,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_s)
    }

    pub fn whois_timeout(&self) -> Duration {
        Duration::from_millis(self.whois_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let c = ScannerConfig::default();
        assert_eq!(c.request_timeout_ms, 8000);
        assert_eq!(c.dns_timeout_ms, 1500);
        assert_eq!(c.tls_timeout_ms, 3000);
        assert_eq!(c.http_timeout_ms, 5000);
        assert_eq!(c.max_redirects, 5);
        assert!(c.cache_enabled);
        assert_eq!(c.cache_ttl_s, 600);
        assert_eq!(c.cache_size, 1024);
        assert!(!c.whois_enabled);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: ScannerConfig =
            serde_json::from_str(r#"{"request_timeout_ms": 2000, "cache_enabled": false}"#)
                .unwrap();
        assert_eq!(parsed.request_timeout_ms, 2000);
        assert!(!parsed.cache_enabled);
        assert_eq!(parsed.max_redirects, 5);
    }
}
