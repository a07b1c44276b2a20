//! LinkGuard URL Core
//!
//! Canonical URL representation shared by every pipeline stage:
//! - Normalization (scheme defaulting, IDNA, default-port stripping)
//! - Registered-domain extraction via the compiled Public Suffix List
//! - Mixed-script (homograph) label detection

pub mod normalizer;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_script::{Script, UnicodeScript};

pub use normalizer::normalize;

/// Errors produced while turning raw input into a [`NormalizedUrl`]
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,
}

/// URL scheme accepted by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Default port for the scheme, stripped during normalization
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// Canonical form of an input URL, immutable after normalization.
///
/// Invariants: `host` is non-empty, lowercase ASCII with no whitespace;
/// `port` is only present when it differs from the scheme default;
/// `path` always starts with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUrl {
    pub scheme: Scheme,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
    /// eTLD+1 per the Public Suffix List; the host itself for IP literals
    pub registered_domain: String,
    pub is_ip_literal: bool,
    pub is_punycode: bool,
}

impl NormalizedUrl {
    /// Port the probe should connect to
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    /// Final TLD label of the host, empty for IP literals
    pub fn tld(&self) -> &str {
        if self.is_ip_literal {
            return "";
        }
        self.host.rsplit('.').next().unwrap_or("")
    }

    /// Host labels below the registered domain
    pub fn subdomain_count(&self) -> usize {
        if self.is_ip_literal {
            return 0;
        }
        let host_labels = self.host.split('.').count();
        let reg_labels = self.registered_domain.split('.').count();
        host_labels.saturating_sub(reg_labels)
    }

    /// URL sent to the network: fragment is kept in the canonical form
    /// but never transmitted.
    pub fn request_url(&self) -> String {
        let mut out = self.base_url();
        out.push_str(&self.path);
        if let Some(q) = &self.query {
            out.push('?');
            out.push_str(q);
        }
        out
    }

    fn base_url(&self) -> String {
        match self.port {
            Some(p) => format!("{}://{}:{}", self.scheme.as_str(), self.host, p),
            None => format!("{}://{}", self.scheme.as_str(), self.host),
        }
    }
}

impl std::fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.base_url(), self.path)?;
        if let Some(q) = &self.query {
            write!(f, "?{}", q)?;
        }
        if let Some(frag) = &self.fragment {
            write!(f, "#{}", frag)?;
        }
        Ok(())
    }
}

/// Unicode form of a (possibly punycoded) host, for display and evidence
/// strings. Falls back to the input when decoding fails.
pub fn decode_host(host: &str) -> String {
    let (decoded, result) = idna::domain_to_unicode(host);
    if result.is_ok() {
        decoded
    } else {
        host.to_string()
    }
}

/// True when any single label of the host mixes characters from more than
/// one Unicode script, the signature of homograph impersonation
/// (e.g. Cyrillic `а` inside an otherwise Latin brand name).
///
/// The host may be in punycode form; it is IDNA-decoded first. Characters
/// in the Common and Inherited scripts (digits, marks) never count.
pub fn has_mixed_script_label(host: &str) -> bool {
    let (unicode_host, _) = idna::domain_to_unicode(host);

    unicode_host.split('.').any(|label| {
        let mut seen: Option<Script> = None;
        for ch in label.chars().filter(|c| c.is_alphabetic()) {
            let script = ch.script();
            if script == Script::Common || script == Script::Inherited {
                continue;
            }
            match seen {
                None => seen = Some(script),
                Some(s) if s != script => return true,
                Some(_) => {}
            }
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_script_detection() {
        // Cyrillic "а" (U+0430) inside a Latin label
        assert!(has_mixed_script_label("p\u{0430}ypal.com"));
        assert!(has_mixed_script_label("xn--pypal-4ve.com"));
        assert!(!has_mixed_script_label("paypal.com"));
        // Pure non-Latin hosts are not mixed
        assert!(!has_mixed_script_label("\u{043f}\u{043e}\u{0447}\u{0442}\u{0430}.com"));
    }

    #[test]
    fn test_digits_do_not_mix() {
        assert!(!has_mixed_script_label("host123.example.com"));
    }

    #[test]
    fn test_effective_port() {
        let url = normalize("https://example.com/").unwrap();
        assert_eq!(url.effective_port(), 443);
        let url = normalize("http://example.com:8080/").unwrap();
        assert_eq!(url.effective_port(), 8080);
    }
}
