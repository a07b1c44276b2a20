//! Best-effort WHOIS enrichment
//!
//! Plain port-43 queries against per-TLD registry servers. WHOIS output
//! has no standard grammar; only the creation date and registrar lines
//! are parsed, and any failure degrades to absent fields.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Registry servers for common TLDs; anything else goes to IANA.
const WHOIS_SERVERS: &[(&str, &str)] = &[
    ("com", "whois.verisign-grs.com"),
    ("net", "whois.verisign-grs.com"),
    ("org", "whois.pir.org"),
    ("info", "whois.nic.info"),
    ("io", "whois.nic.io"),
    ("co", "whois.nic.co"),
    ("me", "whois.nic.me"),
    ("xyz", "whois.nic.xyz"),
    ("uk", "whois.nic.uk"),
    ("de", "whois.denic.de"),
    ("fr", "whois.nic.fr"),
    ("nl", "whois.domain-registry.nl"),
    ("ru", "whois.tcinet.ru"),
];

const FALLBACK_SERVER: &str = "whois.iana.org";
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Registration metadata recovered from WHOIS
#[derive(Debug, Clone, Default)]
pub struct WhoisInfo {
    pub age_days: Option<i64>,
    pub registrar: Option<String>,
}

/// Seam for tests; the orchestrator only sees this trait.
#[async_trait]
pub trait WhoisClient: Send + Sync {
    /// `None` means the lookup failed entirely; partial data comes back
    /// as a [`WhoisInfo`] with absent fields.
    async fn lookup(&self, domain: &str) -> Option<WhoisInfo>;
}

/// Live WHOIS client
#[derive(Debug, Default)]
pub struct TcpWhoisClient;

impl TcpWhoisClient {
    pub fn new() -> Self {
        Self
    }

    fn server_for(domain: &str) -> &'static str {
        let tld = domain.rsplit('.').next().unwrap_or("");
        WHOIS_SERVERS
            .iter()
            .find(|(t, _)| *t == tld)
            .map(|(_, server)| *server)
            .unwrap_or(FALLBACK_SERVER)
    }

    async fn query(server: &str, domain: &str) -> std::io::Result<String> {
        let mut stream = TcpStream::connect((server, 43)).await?;
        stream.write_all(domain.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.len() > MAX_RESPONSE_BYTES {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
impl WhoisClient for TcpWhoisClient {
    async fn lookup(&self, domain: &str) -> Option<WhoisInfo> {
        let server = Self::server_for(domain);
        match Self::query(server, domain).await {
            Ok(response) => {
                let info = parse_whois(&response);
                debug!(domain, server, age_days = ?info.age_days, "WHOIS lookup done");
                Some(info)
            }
            Err(e) => {
                debug!(domain, server, error = %e, "WHOIS lookup failed");
                None
            }
        }
    }
}

/// Pull creation date and registrar out of free-form WHOIS text.
pub(crate) fn parse_whois(response: &str) -> WhoisInfo {
    let mut creation: Option<DateTime<Utc>> = None;
    let mut registrar: Option<String> = None;

    for line in response.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if creation.is_none()
            && matches!(key.as_str(), "creation date" | "created" | "created on" | "registered on")
        {
            creation = parse_whois_date(value);
        }
        if registrar.is_none() && key == "registrar" {
            registrar = Some(value.to_string());
        }
    }

    WhoisInfo {
        age_days: creation.map(|c| (Utc::now() - c).num_days()),
        registrar,
    }
}

fn parse_whois_date(value: &str) -> Option<DateTime<Utc>> {
    // RFC 3339 first ("1997-09-15T04:00:00Z"), then bare dates
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    let first_token = value.split_whitespace().next()?;
    for fmt in ["%Y-%m-%d", "%d.%m.%Y", "%d-%b-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(first_token, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}
