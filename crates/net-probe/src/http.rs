//! First-hop HTTP fetch with manual redirect following
//!
//! Each hop is normalized and recorded; chains stop at the redirect
//! budget, on a revisited URL, or when a Location header would leave the
//! web schemes. The final body is captured (capped) for content
//! inspection.

use linkguard_url_core::{normalize, NormalizedUrl};
use reqwest::header::LOCATION;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use crate::{content, NetworkObservation};

/// Bodies above this size are not inspected.
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Outcome of the HTTP step
#[derive(Debug, Default)]
pub struct HttpObservation {
    pub status: Option<u16>,
    pub redirect_count: u32,
    pub final_url: Option<String>,
    pub body: Option<String>,
}

impl HttpObservation {
    pub(crate) fn apply(self, input: &NormalizedUrl, obs: &mut NetworkObservation) {
        obs.http_status = self.status;
        obs.redirect_count = self.redirect_count;
        obs.final_url = self.final_url.clone();

        if let Some(body) = &self.body {
            let page_domain = self
                .final_url
                .as_deref()
                .and_then(|u| normalize(u).ok())
                .map(|n| n.registered_domain)
                .unwrap_or_else(|| input.registered_domain.clone());
            obs.content_flags = content::inspect(body, &page_domain);
        }
    }
}

/// Fetch the URL, following up to `max_redirects` hops within `budget`.
pub async fn fetch(
    client: &reqwest::Client,
    url: &NormalizedUrl,
    max_redirects: usize,
    budget: Duration,
) -> HttpObservation {
    let deadline = Instant::now() + budget;
    let mut out = HttpObservation::default();

    let mut current = url.request_url();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(url.to_string());

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!(url = %current, "HTTP budget exhausted mid-chain");
            break;
        }

        let response = match client.get(&current).timeout(remaining).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(url = %current, error = %e, "HTTP request failed");
                break;
            }
        };

        out.status = Some(response.status().as_u16());
        out.final_url = Some(current.clone());

        if response.status().is_redirection() {
            let Some(next) = redirect_target(&current, &response) else {
                break;
            };
            if !is_web_scheme(next.scheme()) {
                debug!(url = %current, target = %next, "redirect leaves web schemes, aborting chain");
                break;
            }
            if out.redirect_count as usize >= max_redirects {
                debug!(url = %current, "redirect limit reached");
                break;
            }
            let canonical = match normalize(next.as_str()) {
                Ok(n) => n.to_string(),
                Err(_) => break,
            };
            if !visited.insert(canonical) {
                debug!(url = %next, "redirect loop detected");
                break;
            }
            out.redirect_count += 1;
            current = next.into();
            continue;
        }

        out.body = read_body_capped(response).await;
        break;
    }

    out
}

fn redirect_target(current: &str, response: &reqwest::Response) -> Option<Url> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    let base = Url::parse(current).ok()?;
    base.join(location).ok()
}

pub(crate) fn is_web_scheme(scheme: &str) -> bool {
    matches!(scheme, "http" | "https")
}

/// Read the body for inspection; oversized or undecodable bodies are
/// dropped, partial reads are kept.
async fn read_body_capped(mut response: reqwest::Response) -> Option<String> {
    if let Some(len) = response.content_length() {
        if len as usize > MAX_BODY_BYTES {
            return None;
        }
    }

    let mut buf: Vec<u8> = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                buf.extend_from_slice(&chunk);
                if buf.len() > MAX_BODY_BYTES {
                    return None;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "body read interrupted");
                break;
            }
        }
    }

    Some(String::from_utf8_lossy(&buf).into_owned())
}
