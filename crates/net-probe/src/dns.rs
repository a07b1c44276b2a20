//! DNS resolution step

use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use linkguard_url_core::NormalizedUrl;
use std::net::IpAddr;
use tracing::debug;

use crate::flags;
use crate::NetworkObservation;

/// Outcome of the DNS step, folded into the observation by the prober
#[derive(Debug, Default)]
pub struct DnsObservation {
    pub resolved: Option<bool>,
    pub ttl: Option<u32>,
    pub flags: Vec<String>,
}

impl DnsObservation {
    pub(crate) fn apply(self, obs: &mut NetworkObservation) {
        obs.dns_resolved = self.resolved;
        obs.dns_ttl = self.ttl;
        obs.dns_flags = self.flags;
    }
}

/// Resolve A/AAAA for the URL's host. IP-literal hosts skip the lookup
/// but still get range flags.
pub async fn resolve(resolver: &TokioAsyncResolver, url: &NormalizedUrl) -> DnsObservation {
    let mut out = DnsObservation::default();

    if url.is_ip_literal {
        out.resolved = Some(true);
        if let Ok(ip) = strip_brackets(&url.host).parse::<IpAddr>() {
            if is_private_or_loopback(&ip) {
                out.flags.push(flags::PRIVATE_IP.to_string());
            }
        }
        return out;
    }

    match resolver.lookup_ip(&url.host).await {
        Ok(lookup) => {
            let ips: Vec<IpAddr> = lookup.iter().collect();
            out.resolved = Some(!ips.is_empty());
            out.ttl = lookup.as_lookup().record_iter().map(|r| r.ttl()).min();

            if ips.iter().any(is_private_or_loopback) {
                out.flags.push(flags::PRIVATE_IP.to_string());
            }
            if has_divergent_a_records(&ips) {
                out.flags.push(flags::MULTIPLE_A.to_string());
            }

            debug!(host = %url.host, addresses = ips.len(), ttl = ?out.ttl, "DNS resolved");
        }
        Err(e) => match e.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => {
                debug!(host = %url.host, "DNS nxdomain");
                out.resolved = Some(false);
                out.flags.push(flags::NXDOMAIN.to_string());
            }
            _ => {
                debug!(host = %url.host, error = %e, "DNS lookup failed");
            }
        },
    }

    out
}

fn strip_brackets(host: &str) -> &str {
    host.trim_start_matches('[').trim_end_matches(']')
}

fn is_private_or_loopback(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        // fc00::/7 unique-local plus loopback
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

/// Multiple A records spread across unrelated /8 networks, a cheap proxy
/// for divergent-ASN hosting (fast-flux style infrastructure).
fn has_divergent_a_records(ips: &[IpAddr]) -> bool {
    let first_octets: std::collections::HashSet<u8> = ips
        .iter()
        .filter_map(|ip| match ip {
            IpAddr::V4(v4) => Some(v4.octets()[0]),
            IpAddr::V6(_) => None,
        })
        .collect();
    first_octets.len() >= 2
}
