use crate::{
    certificate_interceptor::CertificateInterceptor,
    configs::DEFAULT_TIMEOUT,
    error::{AppError, ErrorReason},
    truststore::TrustStore,
    types::{Endpoint, ParsedCertificate, Target},
};
use rustls_pki_types::CertificateDer;
use std::{
    fmt::{Display, Formatter},
    io::Error as IoError,
    sync::Arc,
    time::Duration,
};
use tokio::{net::TcpStream, time::timeout};
use tokio_rustls::{
    rustls::{CertificateError, ClientConfig, Error as RustlsError, RootCertStore},
    TlsConnector,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// No chain to any anchor in the bundle
    PathBuilding,
    Expired,
    NotYetValid,
    HostnameMismatch,
    Revoked,
    BadSignature,
    InvalidPurpose,
    BadEncoding,
    /// The bundle contained nothing usable as a root
    NoTrustAnchors,
    Protocol,
    Other,
}

impl FailureKind {
    fn of_certificate_error(err: &CertificateError) -> Self {
        match err {
            CertificateError::UnknownIssuer => FailureKind::PathBuilding,
            CertificateError::Expired => FailureKind::Expired,
            CertificateError::NotValidYet => FailureKind::NotYetValid,
            CertificateError::NotValidForName => FailureKind::HostnameMismatch,
            CertificateError::Revoked => FailureKind::Revoked,
            CertificateError::BadSignature => FailureKind::BadSignature,
            CertificateError::InvalidPurpose => FailureKind::InvalidPurpose,
            CertificateError::BadEncoding => FailureKind::BadEncoding,
            _ => FailureKind::Other,
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FailureKind::PathBuilding => {
                "unable to find valid certification path to requested target"
            }
            FailureKind::Expired => "certificate expired",
            FailureKind::NotYetValid => "certificate not yet valid",
            FailureKind::HostnameMismatch => "certificate does not match the host name",
            FailureKind::Revoked => "certificate revoked",
            FailureKind::BadSignature => "bad certificate signature",
            FailureKind::InvalidPurpose => "certificate not valid for server authentication",
            FailureKind::BadEncoding => "malformed certificate",
            FailureKind::NoTrustAnchors => "trust-store holds no usable trust anchor",
            FailureKind::Protocol => "TLS protocol error",
            FailureKind::Other => "certificate rejected",
        })
    }
}

#[derive(Clone, Debug)]
pub struct HandshakeFailure {
    pub kind: FailureKind,
    /// Error text as reported by the TLS stack
    pub detail: String,
}

impl HandshakeFailure {
    fn classify(err: &RustlsError) -> Self {
        let kind = match err {
            RustlsError::InvalidCertificate(cert_err) => {
                FailureKind::of_certificate_error(cert_err)
            }
            _ => FailureKind::Protocol,
        };
        Self {
            kind,
            detail: err.to_string(),
        }
    }
}

impl Display for HandshakeFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.kind, self.detail)
    }
}

#[derive(Debug)]
pub enum ProbeOutcome {
    HandshakeSucceeded {
        endpoint: Endpoint,
        peer_chain: Vec<ParsedCertificate>,
    },
    HandshakeFailed {
        failure: HandshakeFailure,
        peer_chain: Vec<ParsedCertificate>,
    },
    ConnectionFailed(AppError),
}

impl ProbeOutcome {
    fn connection_failed(target: &Target, reason: impl ToString) -> Self {
        ProbeOutcome::ConnectionFailed(
            ErrorReason::ConnectionFailed {
                target: target.to_string(),
                reason: reason.to_string(),
            }
            .into(),
        )
    }

    fn no_trust_anchors(detail: impl ToString) -> Self {
        ProbeOutcome::HandshakeFailed {
            failure: HandshakeFailure {
                kind: FailureKind::NoTrustAnchors,
                detail: detail.to_string(),
            },
            peer_chain: Vec::new(),
        }
    }
}

/// Connects to a target with the trust-store as the only source of roots.
#[derive(Clone, Debug)]
pub struct Prober {
    timeout: Duration,
}

impl Default for Prober {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Prober {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn probe(&self, store: &TrustStore, target: &Target) -> ProbeOutcome {
        self.probe_with_bundle(&store.export_pem_bundle(), target).await
    }

    pub async fn probe_with_bundle(&self, bundle: &str, target: &Target) -> ProbeOutcome {
        let roots = match load_roots(bundle) {
            Ok(roots) => Arc::new(roots),
            Err(outcome) => return outcome,
        };
        let interceptor = match CertificateInterceptor::new(roots) {
            Ok(interceptor) => Arc::new(interceptor),
            Err(e) => return ProbeOutcome::no_trust_anchors(e),
        };

        let endpoints = match timeout(self.timeout, Endpoint::resolve(target)).await {
            Ok(Ok(endpoints)) if !endpoints.is_empty() => endpoints,
            Ok(Ok(_)) => return ProbeOutcome::connection_failed(target, "no address found"),
            Ok(Err(e)) => return ProbeOutcome::connection_failed(target, e),
            Err(_) => return ProbeOutcome::connection_failed(target, "name resolution timed out"),
        };

        let (endpoint, stream) = match self.connect_any(&endpoints).await {
            Ok(connected) => connected,
            Err(reason) => return ProbeOutcome::connection_failed(target, reason),
        };

        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(interceptor.clone())
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));

        debug!("Starting TLS handshake with {}", endpoint);
        let handshake = timeout(
            self.timeout,
            connector.connect(endpoint.server_name.clone(), stream),
        )
        .await;
        let peer_chain = parse_chain(interceptor.get_certificates().unwrap_or_default());

        match handshake {
            Ok(Ok(_)) => {
                info!("Handshake with {} succeeded", endpoint);
                ProbeOutcome::HandshakeSucceeded {
                    endpoint,
                    peer_chain,
                }
            }
            Ok(Err(e)) => match rustls_error(&e) {
                Some(err) => {
                    warn!("Handshake with {} failed: {}", endpoint, err);
                    ProbeOutcome::HandshakeFailed {
                        failure: HandshakeFailure::classify(err),
                        peer_chain,
                    }
                }
                None => ProbeOutcome::connection_failed(target, &e),
            },
            Err(_) => ProbeOutcome::connection_failed(target, "TLS handshake timed out"),
        }
    }

    /// First address that accepts a TCP connection within the timeout.
    ///
    /// On failure, returns the reason the last address gave.
    async fn connect_any(&self, endpoints: &[Endpoint]) -> Result<(Endpoint, TcpStream), String> {
        let mut last_error = String::from("no address to connect to");
        for endpoint in endpoints {
            match timeout(self.timeout, TcpStream::connect(endpoint.sockaddr)).await {
                Ok(Ok(stream)) => return Ok((endpoint.clone(), stream)),
                Ok(Err(e)) => last_error = format!("{}: {}", endpoint, e),
                Err(_) => last_error = format!("{}: connection timed out", endpoint),
            }
            debug!("Connecting failed, {}", last_error);
        }
        Err(last_error)
    }
}

fn load_roots(bundle: &str) -> Result<RootCertStore, ProbeOutcome> {
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut bundle.as_bytes())
        .filter_map(|cert| match cert {
            Ok(cert) => Some(cert),
            Err(e) => {
                warn!("Skipping unreadable bundle entry: {}", e);
                None
            }
        })
        .collect();

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    debug!("Trust anchors: {} added, {} ignored", added, ignored);
    if added == 0 {
        return Err(ProbeOutcome::no_trust_anchors(format!(
            "{} certificate(s) in the bundle, none usable as a trust anchor",
            ignored
        )));
    }
    Ok(roots)
}

fn rustls_error(err: &IoError) -> Option<&RustlsError> {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<RustlsError>())
}

fn parse_chain(chain: Vec<CertificateDer<'static>>) -> Vec<ParsedCertificate> {
    chain
        .iter()
        .filter_map(|der| match ParsedCertificate::from_der(der.as_ref()) {
            Ok(cert) => Some(cert),
            Err(e) => {
                warn!("Cannot parse a presented certificate: {}", e);
                None
            }
        })
        .collect()
}
