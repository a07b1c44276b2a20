//! URL normalization
//!
//! Turns raw user input into the canonical [`NormalizedUrl`] every later
//! stage consumes. Scheme-less input defaults to https, hosts are
//! IDNA-encoded and lowercased, default ports are stripped, and the
//! registered domain is resolved against the compiled Public Suffix List.

use tracing::debug;
use url::{Host, Url};

use crate::{NormalizedUrl, Scheme, UrlError};

/// Normalize a raw URL string.
///
/// Idempotent: feeding the canonical form back in yields the same value.
pub fn normalize(raw: &str) -> Result<NormalizedUrl, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::InvalidUrl("empty input".to_string()));
    }

    let with_scheme = prepend_default_scheme(trimmed);

    let url = Url::parse(&with_scheme).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" => Scheme::Http,
        "https" => Scheme::Https,
        other => return Err(UrlError::UnsupportedScheme(other.to_string())),
    };

    let (host, is_ip_literal) = match url.host() {
        // The url crate has already IDNA-encoded and lowercased domains.
        Some(Host::Domain(d)) => (d.to_string(), false),
        Some(Host::Ipv4(ip)) => (ip.to_string(), true),
        Some(Host::Ipv6(ip)) => (format!("[{}]", ip), true),
        None => return Err(UrlError::MissingHost),
    };

    if host.is_empty() {
        return Err(UrlError::MissingHost);
    }

    let is_punycode = !is_ip_literal && host.split('.').any(|l| l.starts_with("xn--"));

    let registered_domain = if is_ip_literal {
        host.clone()
    } else {
        psl::domain_str(&host).unwrap_or(&host).to_string()
    };

    // url::Url::port() is None for scheme-default ports.
    let port = url.port();

    let path = if url.path().is_empty() {
        "/".to_string()
    } else {
        url.path().to_string()
    };

    let normalized = NormalizedUrl {
        scheme,
        host,
        port,
        path,
        query: url.query().map(str::to_string),
        fragment: url.fragment().map(str::to_string),
        registered_domain,
        is_ip_literal,
        is_punycode,
    };

    debug!(
        host = %normalized.host,
        registered_domain = %normalized.registered_domain,
        ip_literal = normalized.is_ip_literal,
        punycode = normalized.is_punycode,
        "normalized URL"
    );

    Ok(normalized)
}

/// Scheme-less input ("example.com/login") defaults to https.
fn prepend_default_scheme(input: &str) -> String {
    if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_normalization() {
        let url = normalize("https://Example.COM/path?q=1#frag").unwrap();
        assert_eq!(url.scheme, Scheme::Https);
        assert_eq!(url.host, "example.com");
        assert_eq!(url.path, "/path");
        assert_eq!(url.query.as_deref(), Some("q=1"));
        assert_eq!(url.fragment.as_deref(), Some("frag"));
        assert_eq!(url.registered_domain, "example.com");
        assert!(!url.is_ip_literal);
        assert!(!url.is_punycode);
    }

    #[test]
    fn test_scheme_defaulting() {
        let url = normalize("example.com/login").unwrap();
        assert_eq!(url.scheme, Scheme::Https);
        assert_eq!(url.path, "/login");
    }

    #[test]
    fn test_default_port_stripped() {
        let url = normalize("https://example.com:443/").unwrap();
        assert_eq!(url.port, None);
        let url = normalize("http://example.com:80/").unwrap();
        assert_eq!(url.port, None);
        let url = normalize("https://example.com:8443/").unwrap();
        assert_eq!(url.port, Some(8443));
    }

    #[test]
    fn test_empty_path_defaults_to_slash() {
        let url = normalize("https://example.com").unwrap();
        assert_eq!(url.path, "/");
    }

    #[test]
    fn test_rejects_non_web_schemes() {
        assert!(matches!(
            normalize("ftp://example.com/file"),
            Err(UrlError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            normalize("javascript://alert(1)"),
            Err(UrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(normalize("not a url").is_err());
        assert!(normalize("").is_err());
        assert!(normalize("   ").is_err());
    }

    #[test]
    fn test_ip_literals() {
        let url = normalize("http://185.23.14.9/login").unwrap();
        assert!(url.is_ip_literal);
        assert_eq!(url.host, "185.23.14.9");
        assert_eq!(url.registered_domain, "185.23.14.9");

        let url = normalize("http://[2001:db8::1]/").unwrap();
        assert!(url.is_ip_literal);
    }

    #[test]
    fn test_idna_encoding() {
        let url = normalize("https://p\u{0430}ypal.com/").unwrap();
        assert!(url.is_punycode);
        assert!(url.host.starts_with("xn--"));
        assert!(url.host.is_ascii());
    }

    #[test]
    fn test_registered_domain_etld_plus_one() {
        let url = normalize("https://a.b.example.co.uk/").unwrap();
        assert_eq!(url.registered_domain, "example.co.uk");
        assert_eq!(url.subdomain_count(), 2);
    }

    #[test]
    fn test_normalization_idempotent() {
        for raw in [
            "HTTPS://Example.com:443/a/b?x=1#f",
            "example.com",
            "http://sub.example.org:8080/path/",
        ] {
            let once = normalize(raw).unwrap();
            let twice = normalize(&once.to_string()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_fragment_not_in_request_url() {
        let url = normalize("https://example.com/page#section").unwrap();
        assert!(!url.request_url().contains('#'));
        assert!(url.to_string().contains("#section"));
    }
}
