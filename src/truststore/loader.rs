use super::{jks, pkcs12, CertificateEntry, StoreFormat, TrustStore};
use crate::error::{AppResult, ErrorReason};
use std::path::Path;

/// Why a container parser gave up on the bytes.
#[derive(Debug)]
pub(super) enum ParseFailure {
    /// The bytes are not this format (or are damaged); try the next one.
    Rejected(String),
    /// The format matched but the password did not.
    WrongPassword(StoreFormat),
}

pub(super) struct ParsedStore {
    pub format: StoreFormat,
    pub entries: Vec<(String, CertificateEntry)>,
}

type ContainerParser = fn(&[u8], &str) -> Result<ParsedStore, ParseFailure>;

/// Probe order; JKS first since its magic is unambiguous.
const PARSERS: [(&str, ContainerParser); 2] = [("JKS", jks::parse), ("PKCS12", pkcs12::parse)];

pub fn load(path: &Path, password: &str) -> AppResult<TrustStore> {
    let data = std::fs::read(path)?;
    debug!("Read {} bytes from {}", data.len(), path.display());
    load_from_bytes(path, &data, password)
}

pub fn load_from_bytes(path: &Path, data: &[u8], password: &str) -> AppResult<TrustStore> {
    let mut attempts = Vec::with_capacity(PARSERS.len());

    for (name, parser) in PARSERS {
        match parser(data, password) {
            Ok(ParsedStore { format, entries }) => {
                info!(
                    "Loaded {} keystore {} with {} entries",
                    format,
                    path.display(),
                    entries.len()
                );
                return Ok(TrustStore::new(path, format, entries));
            }
            Err(ParseFailure::WrongPassword(format)) => {
                return Err(ErrorReason::InvalidPassword { format }.into());
            }
            Err(ParseFailure::Rejected(reason)) => {
                debug!("{} parser rejected {}: {}", name, path.display(), reason);
                attempts.push(format!("{}: {}", name, reason));
            }
        }
    }

    Err(ErrorReason::UnsupportedFormat { attempts }.into())
}
