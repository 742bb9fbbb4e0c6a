use crate::error::{AppResult, ErrorReason};
use chrono::{DateTime, TimeZone, Utc};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use std::{
    fmt::{Debug, Display, Formatter},
    ops::Deref,
};
use x509_certificate::{asn1time::Time, X509Certificate};

const PEM_CERTIFICATE_TAGS: [&str; 2] = ["CERTIFICATE", "X509 CERTIFICATE"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCertificate(pub X509Certificate);

impl ParsedCertificate {
    pub fn from_der(der: &[u8]) -> AppResult<Self> {
        Ok(Self(X509Certificate::from_der(der)?))
    }

    /// Decodes a single certificate that is either PEM armored or raw DER.
    ///
    /// Returns the parsed certificate together with its DER encoding.
    pub fn decode(data: &[u8]) -> AppResult<(Self, Vec<u8>)> {
        let der = match pem::parse(data) {
            Ok(block) if PEM_CERTIFICATE_TAGS.iter().any(|tag| *tag == block.tag()) => {
                block.into_contents()
            }
            Ok(block) => return Err(ErrorReason::InvalidPemTag(block.tag().to_owned()).into()),
            Err(_) => data.to_vec(),
        };
        let cert = Self::from_der(&der)?;
        Ok((cert, der))
    }

    pub fn serial_number(&self) -> BigUint {
        let number = &self.0.as_ref().tbs_certificate.serial_number;
        BigUint::from_bytes_be(number.as_slice())
    }

    pub fn not_after(&self) -> i64 {
        match &self.0.as_ref().tbs_certificate.validity.not_after {
            Time::UtcTime(t) => t.timestamp(),
            Time::GeneralTime(t) => DateTime::<Utc>::from(t.clone()).timestamp(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.not_after(), 0).single()
    }

    pub fn is_expired(&self) -> bool {
        self.not_after() < Utc::now().timestamp()
    }

    pub fn subject(&self) -> String {
        self.0
            .subject_common_name()
            .unwrap_or_else(|| "<no common name>".to_owned())
    }

    pub fn issuer(&self) -> String {
        self.0
            .issuer_common_name()
            .unwrap_or_else(|| "<no common name>".to_owned())
    }
}

impl Deref for ParsedCertificate {
    type Target = X509Certificate;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ParsedCertificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CN={} (issuer CN={}, serial {:X})",
            self.subject(),
            self.issuer(),
            self.serial_number()
        )
    }
}

/// SHA-256 digest over the DER encoding of a certificate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of_der(der: &[u8]) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(der));
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Formatted the same way keytool prints `SHA256:` fingerprints.
impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl Debug for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::CertificateAuthority;

    #[test]
    fn fingerprint_formats_as_colon_separated_hex() {
        let mut digest = [0u8; 32];
        digest[0] = 0xAB;
        digest[1] = 0x01;
        digest[31] = 0xFF;
        let formatted = Fingerprint(digest).to_string();

        assert!(formatted.starts_with("AB:01:00:"));
        assert!(formatted.ends_with(":FF"));
        assert_eq!(formatted.len(), 32 * 3 - 1);
    }

    #[test]
    fn decode_accepts_pem_and_der() {
        let ca = CertificateAuthority::new("Decode Test CA");
        let der = ca.der().to_vec();

        let (from_der, der_out) = ParsedCertificate::decode(&der).unwrap();
        let (from_pem, pem_out) = ParsedCertificate::decode(ca.pem().as_bytes()).unwrap();

        assert_eq!(der_out, der);
        assert_eq!(pem_out, der);
        assert_eq!(from_der, from_pem);
        assert_eq!(from_der.subject(), "Decode Test CA");
    }

    #[test]
    fn decode_rejects_private_key_pem() {
        let block = pem::Pem::new("PRIVATE KEY", vec![1, 2, 3]);
        let err = ParsedCertificate::decode(pem::encode(&block).as_bytes()).unwrap_err();

        assert!(matches!(err.reason(), ErrorReason::InvalidPemTag(tag) if tag == "PRIVATE KEY"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(ParsedCertificate::decode(b"definitely not a certificate").is_err());
    }
}
