use crate::{
    error::{AppResult, ErrorReason},
    truststore::TrustStore,
    types::{Fingerprint, ParsedCertificate},
};
use std::path::{Path, PathBuf};

/// A certificate file given on the command line, read once.
#[derive(Clone, Debug)]
pub struct ExternalCertificateFile {
    pub path: PathBuf,
    pub certificate: ParsedCertificate,
    pub fingerprint: Fingerprint,
}

impl ExternalCertificateFile {
    pub fn read(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read(path).map_err(|e| unreadable(path, e))?;
        Self::from_bytes(path, &raw)
    }

    pub fn from_bytes(path: &Path, raw: &[u8]) -> AppResult<Self> {
        let (certificate, der) = ParsedCertificate::decode(raw).map_err(|e| unreadable(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            fingerprint: Fingerprint::of_der(&der),
            certificate,
        })
    }
}

fn unreadable(path: &Path, reason: impl ToString) -> ErrorReason {
    ErrorReason::UnreadableCertificate {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[derive(Clone, Debug)]
pub struct FingerprintMatch {
    pub file: ExternalCertificateFile,
    /// Store aliases holding the same certificate.
    pub aliases: Vec<String>,
}

impl FingerprintMatch {
    pub fn found(&self) -> bool {
        !self.aliases.is_empty()
    }
}

/// Checks each file against the store's entry digests.
///
/// One result per path, in order; a bad file does not stop the others.
pub fn validate_files(store: &TrustStore, paths: &[PathBuf]) -> Vec<AppResult<FingerprintMatch>> {
    paths
        .iter()
        .map(|path| {
            let file = ExternalCertificateFile::read(path)?;
            let aliases = store
                .aliases_with_fingerprint(&file.fingerprint)
                .into_iter()
                .map(str::to_owned)
                .collect();
            debug!("{} -> {} ({:?})", path.display(), file.fingerprint, aliases);
            Ok(FingerprintMatch { file, aliases })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::CertificateAuthority;
    use crate::truststore::StoreFormat;
    use sha2::{Digest, Sha256};
    use std::fs;

    #[test]
    fn identical_file_is_found_unrelated_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let stored = CertificateAuthority::new("Stored Root");
        let unrelated = CertificateAuthority::new("Unrelated Root");
        let store = TrustStore::new(
            "memory",
            StoreFormat::Jks,
            vec![("stored".to_owned(), stored.entry())],
        );

        let stored_path = dir.path().join("stored.cer");
        fs::write(&stored_path, stored.der()).unwrap();
        let unrelated_path = dir.path().join("unrelated.pem");
        fs::write(&unrelated_path, unrelated.pem()).unwrap();

        let results = validate_files(&store, &[stored_path, unrelated_path]);
        let stored_match = results[0].as_ref().unwrap();
        let unrelated_match = results[1].as_ref().unwrap();

        let expected = Sha256::digest(stored.der());
        assert!(stored_match.found());
        assert_eq!(stored_match.aliases, vec!["stored"]);
        assert_eq!(&stored_match.file.fingerprint.as_bytes()[..], expected.as_slice());
        assert!(!unrelated_match.found());
        assert_eq!(unrelated_match.file.certificate.subject(), "Unrelated Root");
    }

    #[test]
    fn pem_armored_copy_matches_der_entry() {
        let dir = tempfile::tempdir().unwrap();
        let stored = CertificateAuthority::new("Armored Root");
        let store = TrustStore::new(
            "memory",
            StoreFormat::Pkcs12,
            vec![("armored".to_owned(), stored.entry())],
        );
        let path = dir.path().join("armored.pem");
        fs::write(&path, stored.pem()).unwrap();

        let results = validate_files(&store, &[path]);
        assert!(results[0].as_ref().unwrap().found());
    }

    #[test]
    fn malformed_file_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let stored = CertificateAuthority::new("Stored Root");
        let store = TrustStore::new(
            "memory",
            StoreFormat::Jks,
            vec![("stored".to_owned(), stored.entry())],
        );

        let broken = dir.path().join("broken.cer");
        fs::write(&broken, b"-----BEGIN CERTIFICATE-----\nnope\n").unwrap();
        let missing = dir.path().join("missing.cer");
        let good = dir.path().join("good.cer");
        fs::write(&good, stored.der()).unwrap();

        let results = validate_files(&store, &[broken.clone(), missing.clone(), good]);
        assert_eq!(results.len(), 3);
        for (result, path) in results.iter().zip([&broken, &missing]) {
            match result.as_ref().unwrap_err().reason() {
                ErrorReason::UnreadableCertificate { path: failed, .. } => assert_eq!(failed, path),
                other => panic!("unexpected error: {other}"),
            }
        }
        assert!(results[2].as_ref().unwrap().found());
    }
}
