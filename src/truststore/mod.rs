//! Loaded keystore containers and the certificates they hold.

use crate::{
    error::AppResult,
    types::{Fingerprint, ParsedCertificate},
};
use std::{
    collections::HashSet,
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
};

mod jks;
mod loader;
mod locator;
mod pkcs12;

pub use loader::load;
pub use locator::locate;

#[cfg(test)]
pub(crate) use jks::encode as encode_jks;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreFormat {
    Jks,
    Jceks,
    Pkcs12,
}

impl Display for StoreFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StoreFormat::Jks => "JKS",
            StoreFormat::Jceks => "JCEKS",
            StoreFormat::Pkcs12 => "PKCS12",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    TrustedCertificate,
    /// Leaf certificate of a private key entry's chain
    PrivateKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateEntry {
    kind: EntryKind,
    der: Vec<u8>,
    fingerprint: Fingerprint,
}

impl CertificateEntry {
    pub fn new(kind: EntryKind, der: Vec<u8>) -> Self {
        let fingerprint = Fingerprint::of_der(&der);
        Self {
            kind,
            der,
            fingerprint,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn parse(&self) -> AppResult<ParsedCertificate> {
        ParsedCertificate::from_der(&self.der)
    }

    pub fn to_pem(&self) -> pem::Pem {
        pem::Pem::new("CERTIFICATE", self.der.clone())
    }
}

/// A loaded trust-store: aliases mapped to certificates, in stored order.
#[derive(Clone, Debug)]
pub struct TrustStore {
    path: PathBuf,
    format: StoreFormat,
    entries: Vec<(String, CertificateEntry)>,
}

impl TrustStore {
    pub fn new(
        path: impl Into<PathBuf>,
        format: StoreFormat,
        entries: Vec<(String, CertificateEntry)>,
    ) -> Self {
        Self {
            path: path.into(),
            format,
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> StoreFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All aliases in the order the container stored them.
    pub fn aliases(&self) -> Vec<&str> {
        self.entries.iter().map(|(alias, _)| alias.as_str()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &CertificateEntry)> {
        self.entries
            .iter()
            .map(|(alias, entry)| (alias.as_str(), entry))
    }

    pub fn fingerprints(&self) -> HashSet<&Fingerprint> {
        self.entries
            .iter()
            .map(|(_, entry)| entry.fingerprint())
            .collect()
    }

    /// Aliases of every entry whose certificate has the given digest.
    pub fn aliases_with_fingerprint(&self, fingerprint: &Fingerprint) -> Vec<&str> {
        self.entries()
            .filter(|(_, entry)| entry.fingerprint() == fingerprint)
            .map(|(alias, _)| alias)
            .collect()
    }

    /// Concatenated PEM of every entry, in enumeration order.
    pub fn export_pem_bundle(&self) -> String {
        let blocks: Vec<pem::Pem> = self.entries.iter().map(|(_, entry)| entry.to_pem()).collect();
        pem::encode_many(&blocks)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::CertificateAuthority;

    fn sample_store() -> (TrustStore, CertificateAuthority, CertificateAuthority) {
        let first = CertificateAuthority::new("First Root");
        let second = CertificateAuthority::new("Second Root");
        let store = TrustStore::new(
            "memory",
            StoreFormat::Jks,
            vec![
                ("first".to_owned(), first.entry()),
                ("second".to_owned(), second.entry()),
                ("first-copy".to_owned(), first.entry()),
            ],
        );
        (store, first, second)
    }

    #[test]
    fn aliases_keep_stored_order() {
        let (store, _, _) = sample_store();
        assert_eq!(store.aliases(), vec!["first", "second", "first-copy"]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.fingerprints().len(), 2);
    }

    #[test]
    fn lookup_by_fingerprint_returns_every_alias() {
        let (store, first, _) = sample_store();
        let fingerprint = Fingerprint::of_der(first.der());

        assert_eq!(
            store.aliases_with_fingerprint(&fingerprint),
            vec!["first", "first-copy"]
        );
    }

    #[test]
    fn pem_bundle_round_trips_through_rustls_pemfile() {
        let (store, first, second) = sample_store();
        let bundle = store.export_pem_bundle();

        let certs = rustls_pemfile::certs(&mut bundle.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let ders: Vec<&[u8]> = certs.iter().map(|cert| cert.as_ref()).collect();

        assert_eq!(ders, vec![first.der(), second.der(), first.der()]);
    }
}
