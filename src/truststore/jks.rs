//! Decoder for the legacy JKS (and JCEKS) keystore layout.
//!
//! All integers are big-endian. The body is followed by a SHA-1 digest over
//! the UTF-16BE password, the whitener message and every preceding byte.

use super::{
    loader::{ParseFailure, ParsedStore},
    CertificateEntry, EntryKind, StoreFormat,
};
use sha1::{Digest, Sha1};

const JKS_MAGIC: u32 = 0xfeed_feed;
const JCEKS_MAGIC: u32 = 0xcece_cece;
const VERSION_01: u32 = 1;
const VERSION_02: u32 = 2;

const PRIVATE_KEY_TAG: u32 = 1;
const TRUSTED_CERT_TAG: u32 = 2;
const SECRET_KEY_TAG: u32 = 3;

const WHITENER_MESSAGE: &[u8] = b"Mighty Aphrodite";
const DIGEST_LEN: usize = 20;
const X509_CERT_TYPE: &str = "X.509";

pub(super) fn parse(data: &[u8], password: &str) -> Result<ParsedStore, ParseFailure> {
    let mut decoder = Decoder::new(data);

    let format = match decoder.read_u32()? {
        JKS_MAGIC => StoreFormat::Jks,
        JCEKS_MAGIC => StoreFormat::Jceks,
        magic => {
            return Err(ParseFailure::Rejected(format!(
                "bad magic {:#010x}",
                magic
            )))
        }
    };
    let version = decoder.read_u32()?;
    if version != VERSION_01 && version != VERSION_02 {
        return Err(ParseFailure::Rejected(format!(
            "unknown {} version {}",
            format, version
        )));
    }

    let count = decoder.read_u32()?;
    let mut entries = Vec::new();
    for _ in 0..count {
        if let Some(entry) = decoder.read_entry(version)? {
            entries.push(entry);
        }
    }

    let body_len = decoder.position();
    let stored = decoder.take(DIGEST_LEN)?;
    if integrity_digest(password, &data[..body_len]).as_slice() != stored {
        return Err(ParseFailure::WrongPassword(format));
    }
    if decoder.remaining() > 0 {
        warn!("{} trailing bytes after the keystore digest", decoder.remaining());
    }

    Ok(ParsedStore { format, entries })
}

fn integrity_digest(password: &str, body: &[u8]) -> Vec<u8> {
    let mut hasher = Sha1::new();
    for unit in password.encode_utf16() {
        hasher.update(unit.to_be_bytes());
    }
    hasher.update(WHITENER_MESSAGE);
    hasher.update(body);
    hasher.finalize().to_vec()
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ParseFailure> {
        if len > self.remaining() {
            return Err(ParseFailure::Rejected(format!(
                "truncated at offset {}: need {} bytes, {} left",
                self.pos,
                len,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_u16(&mut self) -> Result<u16, ParseFailure> {
        let mut bytes = [0u8; 2];
        bytes.copy_from_slice(self.take(2)?);
        Ok(u16::from_be_bytes(bytes))
    }

    fn read_u32(&mut self) -> Result<u32, ParseFailure> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(bytes))
    }

    fn read_u64(&mut self) -> Result<u64, ParseFailure> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(bytes))
    }

    /// Java's `DataOutput.writeUTF` string: u16 length then modified UTF-8.
    fn read_string(&mut self) -> Result<String, ParseFailure> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_blob(&mut self) -> Result<&'a [u8], ParseFailure> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    /// Returns the certificate type and its encoding.
    fn read_certificate(&mut self, version: u32) -> Result<(String, &'a [u8]), ParseFailure> {
        let cert_type = match version {
            VERSION_01 => X509_CERT_TYPE.to_owned(),
            _ => self.read_string()?,
        };
        let content = self.read_blob()?;
        Ok((cert_type, content))
    }

    fn read_entry(
        &mut self,
        version: u32,
    ) -> Result<Option<(String, CertificateEntry)>, ParseFailure> {
        let tag = self.read_u32()?;
        let alias = self.read_string()?;
        let _creation_ms = self.read_u64()?;

        match tag {
            PRIVATE_KEY_TAG => {
                let _protected_key = self.read_blob()?;
                let chain_len = self.read_u32()?;
                let mut leaf = None;
                for _ in 0..chain_len {
                    let cert = self.read_certificate(version)?;
                    if leaf.is_none() {
                        leaf = Some(cert);
                    }
                }
                match leaf {
                    Some((cert_type, content)) if cert_type == X509_CERT_TYPE => Ok(Some((
                        alias,
                        CertificateEntry::new(EntryKind::PrivateKey, content.to_vec()),
                    ))),
                    Some((cert_type, _)) => {
                        warn!("skipping key entry {:?} with {} certificate", alias, cert_type);
                        Ok(None)
                    }
                    None => {
                        warn!("skipping key entry {:?} without certificate chain", alias);
                        Ok(None)
                    }
                }
            }
            TRUSTED_CERT_TAG => {
                let (cert_type, content) = self.read_certificate(version)?;
                if cert_type != X509_CERT_TYPE {
                    warn!("skipping entry {:?} with {} certificate", alias, cert_type);
                    return Ok(None);
                }
                Ok(Some((
                    alias,
                    CertificateEntry::new(EntryKind::TrustedCertificate, content.to_vec()),
                )))
            }
            SECRET_KEY_TAG => Err(ParseFailure::Rejected(format!(
                "secret key entry {:?} uses Java serialization",
                alias
            ))),
            _ => Err(ParseFailure::Rejected(format!(
                "unknown entry tag {} for alias {:?}",
                tag, alias
            ))),
        }
    }
}

/// Writes a version 2 JKS holding trusted certificate entries.
#[cfg(test)]
pub(crate) fn encode(entries: &[(&str, &[u8])], password: &str) -> Vec<u8> {
    fn put_string(out: &mut Vec<u8>, value: &str) {
        out.extend_from_slice(&(value.len() as u16).to_be_bytes());
        out.extend_from_slice(value.as_bytes());
    }

    let mut out = Vec::new();
    out.extend_from_slice(&JKS_MAGIC.to_be_bytes());
    out.extend_from_slice(&VERSION_02.to_be_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (alias, der) in entries {
        out.extend_from_slice(&TRUSTED_CERT_TAG.to_be_bytes());
        put_string(&mut out, alias);
        out.extend_from_slice(&1_700_000_000_000u64.to_be_bytes());
        put_string(&mut out, X509_CERT_TYPE);
        out.extend_from_slice(&(der.len() as u32).to_be_bytes());
        out.extend_from_slice(der);
    }
    let digest = integrity_digest(password, &out);
    out.extend_from_slice(&digest);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::CertificateAuthority;

    #[test]
    fn read_trusted_entries_in_order() {
        let a = CertificateAuthority::new("Alpha");
        let b = CertificateAuthority::new("Beta");
        let data = encode(&[("alpha", a.der()), ("beta", b.der())], "changeit");

        let parsed = parse(&data, "changeit").unwrap();
        assert_eq!(parsed.format, StoreFormat::Jks);
        let aliases: Vec<&str> = parsed.entries.iter().map(|(alias, _)| alias.as_str()).collect();
        assert_eq!(aliases, vec!["alpha", "beta"]);
        assert_eq!(parsed.entries[1].1.der(), b.der());
        assert_eq!(parsed.entries[0].1.kind(), EntryKind::TrustedCertificate);
    }

    #[test]
    fn wrong_password_fails_integrity_check() {
        let a = CertificateAuthority::new("Alpha");
        let data = encode(&[("alpha", a.der())], "changeit");

        assert!(matches!(
            parse(&data, "hunter2"),
            Err(ParseFailure::WrongPassword(StoreFormat::Jks))
        ));
    }

    #[test]
    fn password_is_hashed_as_utf16() {
        let a = CertificateAuthority::new("Alpha");
        let data = encode(&[("alpha", a.der())], "pässwörd");

        assert!(parse(&data, "pässwörd").is_ok());
        assert!(parse(&data, "passwoerd").is_err());
    }

    #[test]
    fn other_magic_is_rejected() {
        let data = [0x30, 0x82, 0x01, 0x00, 0, 0, 0, 0];
        assert!(matches!(
            parse(&data, "changeit"),
            Err(ParseFailure::Rejected(_))
        ));
    }

    #[test]
    fn truncated_store_is_rejected() {
        let a = CertificateAuthority::new("Alpha");
        let data = encode(&[("alpha", a.der())], "changeit");

        assert!(matches!(
            parse(&data[..data.len() / 2], "changeit"),
            Err(ParseFailure::Rejected(_))
        ));
    }

    #[test]
    fn private_key_entry_contributes_its_leaf() {
        let ca = CertificateAuthority::new("Key Entry CA");
        let leaf = ca.issue_server("127.0.0.1");

        let mut body = Vec::new();
        body.extend_from_slice(&JKS_MAGIC.to_be_bytes());
        body.extend_from_slice(&VERSION_02.to_be_bytes());
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend_from_slice(&PRIVATE_KEY_TAG.to_be_bytes());
        body.extend_from_slice(&6u16.to_be_bytes());
        body.extend_from_slice(b"tomcat");
        body.extend_from_slice(&0u64.to_be_bytes());
        body.extend_from_slice(&3u32.to_be_bytes());
        body.extend_from_slice(&[1, 2, 3]);
        body.extend_from_slice(&2u32.to_be_bytes());
        for der in [leaf.leaf_der(), ca.der()] {
            body.extend_from_slice(&5u16.to_be_bytes());
            body.extend_from_slice(b"X.509");
            body.extend_from_slice(&(der.len() as u32).to_be_bytes());
            body.extend_from_slice(der);
        }
        let digest = integrity_digest("changeit", &body);
        body.extend_from_slice(&digest);

        let parsed = parse(&body, "changeit").unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].0, "tomcat");
        assert_eq!(parsed.entries[0].1.kind(), EntryKind::PrivateKey);
        assert_eq!(parsed.entries[0].1.der(), leaf.leaf_der());
    }
}
