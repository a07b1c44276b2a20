//! TLS handshake and leaf-certificate inspection
//!
//! A validated handshake decides `ssl_valid`. When validation fails, a
//! second handshake through a permissive verifier still captures the
//! certificate so issuer and validity metadata survive into the verdict.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::*;

use crate::NetworkObservation;

/// Certificates younger than this are flagged as freshly issued.
const NEW_CERT_WINDOW_DAYS: i64 = 30;

/// Outcome of the TLS step
#[derive(Debug, Default)]
pub struct TlsObservation {
    pub valid: Option<bool>,
    pub issuer: Option<String>,
    pub days_until_expiry: Option<i64>,
    pub is_new_cert: Option<bool>,
}

impl TlsObservation {
    pub(crate) fn apply(self, obs: &mut NetworkObservation) {
        obs.ssl_valid = self.valid;
        obs.ssl_issuer = self.issuer;
        obs.ssl_days_until_expiry = self.days_until_expiry;
        obs.ssl_is_new_cert = self.is_new_cert;
    }
}

enum HandshakeFailure {
    /// TCP connect failed, nothing to learn
    Connect,
    /// TLS layer rejected the handshake (bad chain, name mismatch, ...)
    Tls,
}

pub struct TlsInspector {
    validated: Arc<ClientConfig>,
    permissive: Arc<ClientConfig>,
}

impl TlsInspector {
    pub fn new() -> Self {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let validated = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        let permissive = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(MetadataOnlyVerifier))
            .with_no_client_auth();

        Self {
            validated: Arc::new(validated),
            permissive: Arc::new(permissive),
        }
    }

    /// Handshake with `host:port` and report certificate metadata.
    pub async fn inspect(&self, host: &str, port: u16) -> TlsObservation {
        let mut out = TlsObservation::default();

        let bare_host = host.trim_start_matches('[').trim_end_matches(']');
        let server_name = match ServerName::try_from(bare_host.to_string()) {
            Ok(name) => name,
            Err(e) => {
                debug!(host, error = %e, "host not usable as TLS server name");
                return out;
            }
        };

        match self.handshake(&self.validated, server_name.clone(), bare_host, port).await {
            Ok(chain) => {
                out.valid = Some(true);
                fill_cert_metadata(&chain, &mut out);
            }
            Err(HandshakeFailure::Connect) => {
                debug!(host, port, "TCP connect for TLS inspection failed");
            }
            Err(HandshakeFailure::Tls) => {
                out.valid = Some(false);
                // Validation already failed; this second handshake only
                // recovers the certificate bytes.
                if let Ok(chain) = self
                    .handshake(&self.permissive, server_name, bare_host, port)
                    .await
                {
                    fill_cert_metadata(&chain, &mut out);
                }
            }
        }

        out
    }

    async fn handshake(
        &self,
        config: &Arc<ClientConfig>,
        server_name: ServerName<'static>,
        host: &str,
        port: u16,
    ) -> Result<Vec<CertificateDer<'static>>, HandshakeFailure> {
        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|_| HandshakeFailure::Connect)?;

        let connector = TlsConnector::from(config.clone());
        let stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|_| HandshakeFailure::Tls)?;

        let (_, session) = stream.get_ref();
        let chain = session
            .peer_certificates()
            .map(|certs| certs.iter().map(|c| c.clone().into_owned()).collect())
            .unwrap_or_default();
        Ok(chain)
    }
}

impl Default for TlsInspector {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the leaf certificate into observation fields.
fn fill_cert_metadata(chain: &[CertificateDer<'static>], out: &mut TlsObservation) {
    let Some(leaf) = chain.first() else {
        return;
    };
    let Ok((_, cert)) = X509Certificate::from_der(leaf.as_ref()) else {
        debug!("leaf certificate failed to parse");
        return;
    };

    out.issuer = Some(issuer_display(&cert));

    let now = chrono::Utc::now().timestamp();
    let not_after = cert.validity().not_after.timestamp();
    let not_before = cert.validity().not_before.timestamp();
    out.days_until_expiry = Some((not_after - now) / 86_400);
    out.is_new_cert = Some(now - not_before < NEW_CERT_WINDOW_DAYS * 86_400);
}

/// Issuer common name when present, full distinguished name otherwise
fn issuer_display(cert: &X509Certificate<'_>) -> String {
    cert.issuer()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| cert.issuer().to_string())
}

/// Accepts any presented chain. Only used after real validation has
/// already failed, to recover certificate metadata.
#[derive(Debug)]
struct MetadataOnlyVerifier;

impl ServerCertVerifier for MetadataOnlyVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_starts_absent() {
        let obs = TlsObservation::default();
        assert_eq!(obs.valid, None);
        assert_eq!(obs.issuer, None);
    }

    #[test]
    fn test_apply_moves_all_fields() {
        let mut net = NetworkObservation::default();
        TlsObservation {
            valid: Some(false),
            issuer: Some("Test CA".to_string()),
            days_until_expiry: Some(12),
            is_new_cert: Some(true),
        }
        .apply(&mut net);
        assert_eq!(net.ssl_valid, Some(false));
        assert_eq!(net.ssl_issuer.as_deref(), Some("Test CA"));
        assert_eq!(net.ssl_days_until_expiry, Some(12));
        assert_eq!(net.ssl_is_new_cert, Some(true));
    }
}
