use crate::{
    error::{AppResult, ErrorReason},
    truststore::{self, TrustStore},
};
use std::path::Path;

/// Loads the server's own keystore and insists on at least one alias.
pub fn inspect_keystore(path: &Path, password: &str) -> AppResult<TrustStore> {
    let keystore = truststore::load(path, password)?;
    if keystore.is_empty() {
        return Err(ErrorReason::EmptyKeystore {
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(keystore)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{test_support::CertificateAuthority, truststore::encode_jks};

    #[test]
    fn lists_server_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.jks");
        let ca = CertificateAuthority::new("Keystore CA");
        std::fs::write(&path, encode_jks(&[("tomcat", ca.der())], "secret")).unwrap();

        let keystore = inspect_keystore(&path, "secret").unwrap();
        assert_eq!(keystore.aliases(), vec!["tomcat"]);
    }

    #[test]
    fn empty_keystore_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.jks");
        std::fs::write(&path, encode_jks(&[], "secret")).unwrap();

        let err = inspect_keystore(&path, "secret").unwrap_err();
        assert!(matches!(err.reason(), ErrorReason::EmptyKeystore { path: p } if *p == path));
    }

    #[test]
    fn missing_keystore_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = inspect_keystore(&dir.path().join("absent.p12"), "secret").unwrap_err();
        assert!(matches!(err.reason(), ErrorReason::Io(_)));
    }
}
