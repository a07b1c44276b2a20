//! Feature extraction
//!
//! Fills the 95-slot vector from a normalized URL alone, no network
//! input. Every slot is pushed in schema order; the builder asserts the
//! final width so a drift between schema and extractor cannot ship.

use ahash::AHashMap;
use linkguard_url_core::{has_mixed_script_label, NormalizedUrl, Scheme};
use tracing::trace;

use crate::schema::{COMMON_GENERIC_TLDS, FEATURE_COUNT, HIGH_ABUSE_TLDS, SUSPICIOUS_TOKENS};
use crate::FeatureVector;

const VOWELS: [char; 5] = ['a', 'e', 'i', 'o', 'u'];

/// Extract the full feature vector for a normalized URL.
pub fn extract(url: &NormalizedUrl) -> FeatureVector {
    let url_s = url.request_url();
    let host = url.host.as_str();
    let path = url.path.as_str();
    let query = url.query.as_deref().unwrap_or("");
    let fragment = url.fragment.as_deref().unwrap_or("");

    let labels: Vec<&str> = host.split('.').collect();
    let label_lengths: Vec<usize> = labels.iter().map(|l| l.len()).collect();

    let mut v = Vec::with_capacity(FEATURE_COUNT);

    // Lexical
    v.push(url_s.len() as f64);
    v.push(host.len() as f64);
    v.push(path.len() as f64);
    v.push(query.len() as f64);
    v.push(fragment.len() as f64);
    v.push(char_ratio(&url_s, |c| c.is_ascii_digit()));
    v.push(char_ratio(&url_s, |c| c.is_ascii_alphabetic()));
    v.push(count_chars(&url_s, |c| !c.is_ascii_alphanumeric()) as f64);
    v.push(char_ratio(host, |c| c.is_ascii_digit()));
    v.push(char_ratio(host, |c| c.is_ascii_alphabetic()));
    v.push(char_ratio(host, is_vowel));
    v.push(char_ratio(host, is_consonant));
    v.push(unique_char_ratio(host));
    v.push(char_ratio(path, |c| c.is_ascii_digit()));
    v.push(char_ratio(query, |c| c.is_ascii_digit()));
    v.push(max_run(&url_s, |c| c.is_ascii_digit()) as f64);
    v.push(max_run(host, is_consonant) as f64);
    v.push(entropy(host));
    v.push(entropy(path));
    v.push(entropy(query));
    v.push(entropy(&url_s));
    v.push(labels.len() as f64);
    v.push(label_lengths.iter().copied().max().unwrap_or(0) as f64);
    v.push(label_lengths.iter().copied().min().unwrap_or(0) as f64);
    v.push(mean(&label_lengths));
    v.push(url.registered_domain.len() as f64);

    // Structural
    v.push(count_chars(&url_s, |c| c == '.') as f64);
    v.push(count_chars(&url_s, |c| c == '-') as f64);
    v.push(count_chars(&url_s, |c| c == '_') as f64);
    v.push(count_chars(&url_s, |c| c == '/') as f64);
    v.push(count_chars(&url_s, |c| c == '@') as f64);
    v.push(count_chars(&url_s, |c| c == '&') as f64);
    v.push(count_chars(&url_s, |c| c == '=') as f64);
    v.push(count_chars(&url_s, |c| c == '%') as f64);
    v.push(count_chars(&url_s, |c| c == ';') as f64);
    v.push(count_chars(&url_s, |c| c == ',') as f64);
    v.push(count_chars(&url_s, |c| c == '~') as f64);
    v.push(url.subdomain_count() as f64);
    v.push(count_chars(host, |c| c == '-') as f64);
    v.push(bool_feature(path.len() > 1 && path[1..].contains("//")));
    v.push(path.split('/').filter(|s| !s.is_empty()).count() as f64);
    v.push(query.split('&').filter(|s| !s.is_empty()).count() as f64);
    v.push(max_query_value_length(query) as f64);
    v.push(bool_feature(url.fragment.is_some()));
    v.push(bool_feature(host.starts_with("www.")));

    // Suspicious tokens per location; order pinned by the schema test
    let mut token_hits = 0u32;
    for location in [host, path, query] {
        for token in SUSPICIOUS_TOKENS {
            let hit = location.to_ascii_lowercase().contains(token);
            if hit {
                token_hits += 1;
            }
            v.push(bool_feature(hit));
        }
    }
    v.push(token_hits as f64);

    // TLD
    let tld = url.tld();
    v.push(tld.len() as f64);
    v.push(bool_feature(HIGH_ABUSE_TLDS.contains(&tld)));
    v.push(bool_feature(
        tld.len() == 2 && tld.chars().all(|c| c.is_ascii_alphabetic()),
    ));
    v.push(bool_feature(COMMON_GENERIC_TLDS.contains(&tld)));

    // Host class
    v.push(bool_feature(url.is_ip_literal));
    v.push(bool_feature(url.is_ip_literal && host.starts_with('[')));
    v.push(bool_feature(url.is_punycode));
    v.push(bool_feature(!url.is_ip_literal && has_mixed_script_label(host)));
    v.push(bool_feature(url.port.is_some()));
    v.push(bool_feature(!matches!(url.effective_port(), 80 | 443)));
    v.push(url.port.map(f64::from).unwrap_or(-1.0));
    v.push(bool_feature(url.scheme == Scheme::Https));

    // Encoding
    let encoded = percent_encoded_count(&url_s);
    v.push(encoded as f64);
    v.push(if url_s.is_empty() {
        0.0
    } else {
        (encoded * 3) as f64 / url_s.len() as f64
    });
    v.push(max_run(&url_s.to_ascii_lowercase(), |c| c.is_ascii_hexdigit()) as f64);
    v.push(base64_like_segments(path, query) as f64);
    let lower = url_s.to_ascii_lowercase();
    v.push(bool_feature(
        lower.contains("%2f") || lower.contains("%3a") || lower.contains("%40"),
    ));

    // Aggregate counts
    v.push(count_chars(&url_s, |c| c.is_ascii_digit()) as f64);
    v.push(count_chars(&url_s, |c| c.is_ascii_alphabetic()) as f64);
    v.push(count_chars(path, |c| {
        !c.is_ascii_alphanumeric() && !matches!(c, '/' | '.' | '-' | '_')
    }) as f64);
    v.push(count_chars(host, |c| c.is_ascii_digit()) as f64);
    v.push(count_chars(&url_s, |c| c.is_ascii_uppercase()) as f64);

    debug_assert_eq!(v.len(), FEATURE_COUNT);
    debug_assert!(v.iter().all(|x| x.is_finite()));

    trace!(host = %url.host, width = v.len(), "extracted feature vector");

    FeatureVector::from_values(v)
}

#[inline]
fn bool_feature(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[inline]
fn is_vowel(c: char) -> bool {
    VOWELS.contains(&c.to_ascii_lowercase())
}

#[inline]
fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !is_vowel(c)
}

fn count_chars(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.chars().filter(|c| pred(*c)).count()
}

fn char_ratio(s: &str, pred: impl Fn(char) -> bool) -> f64 {
    let len = s.chars().count();
    if len == 0 {
        return 0.0;
    }
    count_chars(s, pred) as f64 / len as f64
}

fn unique_char_ratio(s: &str) -> f64 {
    let len = s.chars().count();
    if len == 0 {
        return 0.0;
    }
    let unique: std::collections::HashSet<char> = s.chars().collect();
    unique.len() as f64 / len as f64
}

fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<usize>() as f64 / values.len() as f64
}

/// Shannon entropy over characters
fn entropy(s: &str) -> f64 {
    let len = s.chars().count();
    if len == 0 {
        return 0.0;
    }

    let mut freq: AHashMap<char, u32> = AHashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    freq.values()
        .map(|&count| {
            let p = count as f64 / len as f64;
            -p * p.log2()
        })
        .sum()
}

fn max_run(s: &str, pred: impl Fn(char) -> bool) -> usize {
    let mut max_len = 0;
    let mut current = 0;
    for c in s.chars() {
        if pred(c) {
            current += 1;
            max_len = max_len.max(current);
        } else {
            current = 0;
        }
    }
    max_len
}

fn max_query_value_length(query: &str) -> usize {
    query
        .split('&')
        .filter_map(|param| param.split_once('=').map(|(_, value)| value.len()))
        .max()
        .unwrap_or(0)
}

/// Count of valid %XX escape sequences
fn percent_encoded_count(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i + 2 < bytes.len() {
        if bytes[i] == b'%'
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            count += 1;
            i += 3;
        } else {
            i += 1;
        }
    }
    count
}

/// Long alphanumeric segments that look like base64 payloads smuggled
/// into the path or query.
fn base64_like_segments(path: &str, query: &str) -> usize {
    path.split('/')
        .chain(query.split(['&', '=']))
        .filter(|seg| {
            seg.len() >= 16
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_'))
                && seg.chars().any(|c| c.is_ascii_digit())
                && seg.chars().any(|c| c.is_ascii_alphabetic())
        })
        .count()
}
