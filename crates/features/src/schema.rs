//! Frozen feature schema
//!
//! The classifier was trained against this exact ordering. Length, order,
//! and per-slot semantics must never change without retraining; the
//! `feature_schema.json` artifact and the unit test below pin it.

/// Schema version, bumped together with model retraining
pub const SCHEMA_VERSION: &str = "1.0.0";

/// One slot in the feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub default: f64,
}

const fn spec(name: &'static str, default: f64) -> FeatureSpec {
    FeatureSpec { name, default }
}

/// Suspicious tokens probed in host, path, and query
pub const SUSPICIOUS_TOKENS: &[&str] = &[
    "login", "secure", "verify", "update", "account", "bank", "paypal", "wallet", "confirm",
];

/// TLDs with disproportionate abuse rates
pub const HIGH_ABUSE_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", // free registrations, heavily abused
    "xyz", "top", "club", "work", "click", "link", "info", "biz", "pw", "cc", "su", "ws", "buzz",
    "monster",
];

/// Generic TLDs with mainstream registration policies
pub const COMMON_GENERIC_TLDS: &[&str] = &["com", "org", "net", "edu", "gov", "mil", "int"];

pub fn is_high_abuse_tld(tld: &str) -> bool {
    HIGH_ABUSE_TLDS.contains(&tld)
}

/// The frozen, ordered schema. Index in this slice == index in the vector.
pub const SCHEMA: &[FeatureSpec] = &[
    // Lexical
    spec("url_length", 0.0),
    spec("host_length", 0.0),
    spec("path_length", 0.0),
    spec("query_length", 0.0),
    spec("fragment_length", 0.0),
    spec("url_digit_ratio", 0.0),
    spec("url_letter_ratio", 0.0),
    spec("url_special_char_count", 0.0),
    spec("host_digit_ratio", 0.0),
    spec("host_letter_ratio", 0.0),
    spec("host_vowel_ratio", 0.0),
    spec("host_consonant_ratio", 0.0),
    spec("host_unique_char_ratio", 0.0),
    spec("path_digit_ratio", 0.0),
    spec("query_digit_ratio", 0.0),
    spec("max_digit_run", 0.0),
    spec("max_consonant_run", 0.0),
    spec("host_entropy", 0.0),
    spec("path_entropy", 0.0),
    spec("query_entropy", 0.0),
    spec("url_entropy", 0.0),
    spec("label_count", 0.0),
    spec("longest_label_length", 0.0),
    spec("shortest_label_length", 0.0),
    spec("mean_label_length", 0.0),
    spec("registered_domain_length", 0.0),
    // Structural
    spec("dot_count", 0.0),
    spec("hyphen_count", 0.0),
    spec("underscore_count", 0.0),
    spec("slash_count", 0.0),
    spec("at_count", 0.0),
    spec("ampersand_count", 0.0),
    spec("equals_count", 0.0),
    spec("percent_count", 0.0),
    spec("semicolon_count", 0.0),
    spec("comma_count", 0.0),
    spec("tilde_count", 0.0),
    spec("subdomain_count", 0.0),
    spec("host_hyphen_count", 0.0),
    spec("double_slash_in_path", 0.0),
    spec("path_depth", 0.0),
    spec("query_param_count", 0.0),
    spec("max_query_value_length", 0.0),
    spec("has_fragment", 0.0),
    spec("has_www_prefix", 0.0),
    // Suspicious tokens, host
    spec("token_login_in_host", 0.0),
    spec("token_secure_in_host", 0.0),
    spec("token_verify_in_host", 0.0),
    spec("token_update_in_host", 0.0),
    spec("token_account_in_host", 0.0),
    spec("token_bank_in_host", 0.0),
    spec("token_paypal_in_host", 0.0),
    spec("token_wallet_in_host", 0.0),
    spec("token_confirm_in_host", 0.0),
    // Suspicious tokens, path
    spec("token_login_in_path", 0.0),
    spec("token_secure_in_path", 0.0),
    spec("token_verify_in_path", 0.0),
    spec("token_update_in_path", 0.0),
    spec("token_account_in_path", 0.0),
    spec("token_bank_in_path", 0.0),
    spec("token_paypal_in_path", 0.0),
    spec("token_wallet_in_path", 0.0),
    spec("token_confirm_in_path", 0.0),
    // Suspicious tokens, query
    spec("token_login_in_query", 0.0),
    spec("token_secure_in_query", 0.0),
    spec("token_verify_in_query", 0.0),
    spec("token_update_in_query", 0.0),
    spec("token_account_in_query", 0.0),
    spec("token_bank_in_query", 0.0),
    spec("token_paypal_in_query", 0.0),
    spec("token_wallet_in_query", 0.0),
    spec("token_confirm_in_query", 0.0),
    spec("suspicious_token_count", 0.0),
    // TLD
    spec("tld_length", 0.0),
    spec("tld_high_abuse", 0.0),
    spec("tld_is_country_code", 0.0),
    spec("tld_is_generic_common", 0.0),
    // Host class
    spec("is_ip_literal", 0.0),
    spec("is_ipv6_literal", 0.0),
    spec("is_punycode", 0.0),
    spec("is_homoglyph_candidate", 0.0),
    spec("has_explicit_port", 0.0),
    spec("nonstandard_port", 0.0),
    spec("port_number", -1.0),
    spec("scheme_https", 0.0),
    // Encoding
    spec("percent_encoded_count", 0.0),
    spec("percent_encoded_ratio", 0.0),
    spec("max_hex_run", 0.0),
    spec("base64_like_segments", 0.0),
    spec("encoded_delimiter_present", 0.0),
    // Aggregate counts
    spec("digit_count", 0.0),
    spec("letter_count", 0.0),
    spec("path_special_char_count", 0.0),
    spec("host_digit_count", 0.0),
    spec("uppercase_count", 0.0),
];

/// Training-time vector width
pub const FEATURE_COUNT: usize = SCHEMA.len();

/// Slot index for a feature name, linear scan (schema is small and this
/// is only used at startup and in tests).
pub fn feature_index(name: &str) -> Option<usize> {
    SCHEMA.iter().position(|s| s.name == name)
}
