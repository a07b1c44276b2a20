//! Curated trust table
//!
//! Lookup order: exact full host, then registered domain, then suffix
//! match against parent providers, else unknown.

use ahash::AHashMap;

use crate::ReputationTier;

/// Major platforms with mature abuse handling
const TRUSTED_DOMAINS: &[&str] = &[
    "google.com",
    "youtube.com",
    "microsoft.com",
    "apple.com",
    "amazon.com",
    "github.com",
    "gitlab.com",
    "wikipedia.org",
    "mozilla.org",
    "cloudflare.com",
    "linkedin.com",
    "stackoverflow.com",
    "reddit.com",
    "dropbox.com",
    "paypal.com",
    "netflix.com",
];

/// Infrastructure and hosting: legitimate but routinely carrying
/// third-party content
const MODERATE_DOMAINS: &[&str] = &[
    "amazonaws.com",
    "azurewebsites.net",
    "cloudfront.net",
    "herokuapp.com",
    "netlify.app",
    "vercel.app",
    "web.app",
    "firebaseapp.com",
    "fastly.net",
    "akamaized.net",
];

/// URL shorteners hide their destination; treated as hostile priors
const SHORTENER_DOMAINS: &[&str] = &[
    "bit.ly", "tinyurl.com", "t.co", "goo.gl", "ow.ly", "is.gd", "buff.ly", "cutt.ly", "rb.gy",
    "shorturl.at",
];

/// Free dynamic-DNS parents, matched by suffix (commonly abused)
const FREE_DNS_PARENTS: &[&str] = &[
    "duckdns.org",
    "no-ip.com",
    "no-ip.org",
    "ddns.net",
    "dynu.com",
    "hopto.org",
    "zapto.org",
    "sytes.net",
    "servebeer.com",
    "myftp.org",
    "redirectme.net",
    "dnsalias.com",
];

#[derive(Debug, Clone)]
struct Entry {
    tier: ReputationTier,
    description: Option<String>,
}

/// Immutable snapshot of the trust mapping; swapped wholesale on reload.
#[derive(Debug, Default)]
pub struct TrustTable {
    exact: AHashMap<String, Entry>,
    parents: Vec<(String, Entry)>,
}

impl TrustTable {
    /// Table with only the curated embedded entries
    pub fn embedded() -> Self {
        let mut table = TrustTable::default();

        for domain in TRUSTED_DOMAINS {
            table.insert(domain, ReputationTier::Trusted, None);
        }
        for domain in MODERATE_DOMAINS {
            table.insert(
                domain,
                ReputationTier::Moderate,
                Some("shared hosting platform".to_string()),
            );
        }
        for domain in SHORTENER_DOMAINS {
            table.insert(
                domain,
                ReputationTier::Untrusted,
                Some("URL shortener".to_string()),
            );
        }
        for parent in FREE_DNS_PARENTS {
            table.insert_parent(
                parent,
                ReputationTier::Untrusted,
                Some("free dynamic DNS provider".to_string()),
            );
        }

        table
    }

    /// Empty table, for tests and fully file-driven deployments
    pub fn empty() -> Self {
        TrustTable::default()
    }

    pub fn insert(&mut self, domain: &str, tier: ReputationTier, description: Option<String>) {
        self.exact
            .insert(domain.to_ascii_lowercase(), Entry { tier, description });
    }

    pub fn insert_parent(
        &mut self,
        suffix: &str,
        tier: ReputationTier,
        description: Option<String>,
    ) {
        self.parents
            .push((suffix.to_ascii_lowercase(), Entry { tier, description }));
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.parents.is_empty()
    }

    /// Resolve a host to its tier and description.
    pub fn lookup(
        &self,
        full_host: &str,
        registered_domain: &str,
    ) -> (ReputationTier, Option<String>) {
        if let Some(entry) = self.exact.get(full_host) {
            return (entry.tier, entry.description.clone());
        }
        if let Some(entry) = self.exact.get(registered_domain) {
            return (entry.tier, entry.description.clone());
        }
        for (suffix, entry) in &self.parents {
            if full_host == suffix || full_host.ends_with(&format!(".{}", suffix)) {
                return (entry.tier, entry.description.clone());
            }
        }
        (ReputationTier::Unknown, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_beats_registered() {
        let mut table = TrustTable::empty();
        table.insert("example.com", ReputationTier::Trusted, None);
        table.insert("evil.example.com", ReputationTier::Untrusted, None);

        let (tier, _) = table.lookup("evil.example.com", "example.com");
        assert_eq!(tier, ReputationTier::Untrusted);

        let (tier, _) = table.lookup("www.example.com", "example.com");
        assert_eq!(tier, ReputationTier::Trusted);
    }

    #[test]
    fn test_parent_suffix_match() {
        let table = TrustTable::embedded();
        let (tier, desc) = table.lookup("mybox.duckdns.org", "duckdns.org");
        assert_eq!(tier, ReputationTier::Untrusted);
        assert!(desc.unwrap().contains("dynamic DNS"));
    }

    #[test]
    fn test_unlisted_is_unknown() {
        let table = TrustTable::embedded();
        let (tier, desc) = table.lookup("nobody-heard-of.example", "nobody-heard-of.example");
        assert_eq!(tier, ReputationTier::Unknown);
        assert!(desc.is_none());
    }

    #[test]
    fn test_suffix_requires_label_boundary() {
        let mut table = TrustTable::empty();
        table.insert_parent("no-ip.com", ReputationTier::Untrusted, None);
        let (tier, _) = table.lookup("casino-ip.com", "casino-ip.com");
        assert_eq!(tier, ReputationTier::Unknown);
    }
}
