//! PKCS#12 containers, parsed through OpenSSL.

use super::{
    loader::{ParseFailure, ParsedStore},
    CertificateEntry, EntryKind, StoreFormat,
};
use openssl::{error::ErrorStack, pkcs12::Pkcs12, provider::Provider, x509::X509Ref};
use std::sync::OnceLock;

/// OpenSSL 3 only offers RC2 and 40-bit PBE ciphers, used by older JDK stores,
/// through the legacy provider. It stays loaded for the life of the process.
static LEGACY_PROVIDER: OnceLock<Option<Provider>> = OnceLock::new();

fn load_legacy_provider() -> bool {
    LEGACY_PROVIDER
        .get_or_init(|| match Provider::try_load(None, "legacy", true) {
            Ok(provider) => Some(provider),
            Err(e) => {
                debug!("OpenSSL legacy provider unavailable: {}", e);
                None
            }
        })
        .is_some()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecryptFailure {
    /// The container carries no integrity MAC, so the password cannot be checked.
    MacAbsent,
    MacMismatch,
    Other,
}

impl DecryptFailure {
    fn classify<'a>(reasons: impl IntoIterator<Item = &'a str>) -> Self {
        let reasons: Vec<&str> = reasons.into_iter().collect();
        // OpenSSL stacks "mac verify failure" on top of "mac absent".
        if reasons.iter().any(|r| r.contains("mac absent")) {
            Self::MacAbsent
        } else if reasons.iter().any(|r| r.contains("mac verify failure")) {
            Self::MacMismatch
        } else {
            Self::Other
        }
    }

    fn of(err: &ErrorStack) -> Self {
        Self::classify(err.errors().iter().filter_map(|e| e.reason()))
    }
}

fn decrypt_failure(err: &ErrorStack) -> ParseFailure {
    match DecryptFailure::of(err) {
        DecryptFailure::MacMismatch => ParseFailure::WrongPassword(StoreFormat::Pkcs12),
        _ => ParseFailure::Rejected(format!("cannot decrypt: {}", err)),
    }
}

pub(super) fn parse(data: &[u8], password: &str) -> Result<ParsedStore, ParseFailure> {
    // Structural decoding first: a failure here means "not PKCS#12".
    let pkcs12 = Pkcs12::from_der(data)
        .map_err(|e| ParseFailure::Rejected(format!("not a PFX structure: {}", e)))?;

    load_legacy_provider();
    // Only a MAC mismatch proves the password wrong; cipher errors stay "unsupported".
    let parsed = match pkcs12.parse2(password) {
        Ok(parsed) => parsed,
        Err(e) if DecryptFailure::of(&e) == DecryptFailure::MacAbsent => {
            debug!("PKCS12 store has no MAC, reading it without a password");
            pkcs12.parse2("").map_err(|e| decrypt_failure(&e))?
        }
        Err(e) => {
            debug!("PKCS12 decryption failed: {}", e);
            return Err(decrypt_failure(&e));
        }
    };

    let mut entries = Vec::new();
    if let Some(cert) = parsed.cert.as_deref() {
        entries.push(to_entry(cert, EntryKind::PrivateKey, entries.len())?);
    }
    if let Some(ca) = parsed.ca.as_ref() {
        for cert in ca {
            entries.push(to_entry(cert, EntryKind::TrustedCertificate, entries.len())?);
        }
    }

    Ok(ParsedStore {
        format: StoreFormat::Pkcs12,
        entries,
    })
}

/// Uses the bag's `friendlyName` as the alias, or `entry-<index>` if none.
fn to_entry(
    cert: &X509Ref,
    kind: EntryKind,
    index: usize,
) -> Result<(String, CertificateEntry), ParseFailure> {
    let alias = cert
        .alias()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .unwrap_or_else(|| format!("entry-{}", index));
    let der = cert
        .to_der()
        .map_err(|e| ParseFailure::Rejected(format!("re-encoding certificate {}: {}", alias, e)))?;

    Ok((alias, CertificateEntry::new(kind, der)))
}
