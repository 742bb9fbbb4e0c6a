use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use std::{fmt::Debug, sync::Arc};
use tokio::sync::OnceCell;
use tokio_rustls::rustls::{
    client::{
        danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        VerifierBuilderError, WebPkiServerVerifier,
    },
    DigitallySignedStruct, Error as RustlsError, RootCertStore, SignatureScheme,
};

/// Records the chain the server presented, then verifies it against the
/// given roots.
///
/// A failed verification aborts the handshake, so the chain has to be
/// captured before delegating to the WebPKI verifier.
#[derive(Debug)]
pub struct CertificateInterceptor {
    certificates: OnceCell<Vec<CertificateDer<'static>>>,
    verifier: Arc<WebPkiServerVerifier>,
}

impl CertificateInterceptor {
    pub fn new(roots: Arc<RootCertStore>) -> Result<Self, VerifierBuilderError> {
        Ok(Self::with_verifier(WebPkiServerVerifier::builder(roots).build()?))
    }

    pub fn with_verifier(verifier: Arc<WebPkiServerVerifier>) -> Self {
        Self {
            certificates: Default::default(),
            verifier,
        }
    }

    /// The presented chain, leaf first; `None` if the server never sent one.
    pub fn get_certificates(&self) -> Option<Vec<CertificateDer<'static>>> {
        self.certificates.get().cloned()
    }
}

impl ServerCertVerifier for CertificateInterceptor {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        let mut certs = vec![end_entity.clone().into_owned()];
        certs.extend(intermediates.iter().map(|cert| cert.clone().into_owned()));

        self.certificates.set(certs).ok();

        self.verifier
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        self.verifier.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        self.verifier.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.verifier.supported_verify_schemes()
    }
}
