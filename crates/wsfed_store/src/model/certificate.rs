//! Parsed X.509 encryption certificate.
//!
//! # Invariants
//! - A `Certificate` always holds DER bytes that parsed successfully.
//! - Metadata is extracted once, at construction.

use sha1::{Digest, Sha1};
use std::fmt::{Debug, Formatter};
use x509_parser::prelude::{FromDer, X509Certificate};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertificateError {
    #[error("certificate data is empty")]
    Empty,
    #[error("malformed certificate: {0}")]
    Malformed(String),
    #[error("certificate has {0} trailing bytes after the DER structure")]
    TrailingData(usize),
}

/// Public certificate a relying party asks tokens to be encrypted with.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    thumbprint: String,
    subject_name: String,
    issuer_name: String,
    serial_number: String,
    not_before: i64,
    not_after: i64,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    ///
    /// # Errors
    /// - `Empty` for zero-length input.
    /// - `Malformed` when the bytes are not an X.509 certificate.
    /// - `TrailingData` when bytes follow the certificate structure.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, CertificateError> {
        let der = der.into();
        if der.is_empty() {
            return Err(CertificateError::Empty);
        }

        let (rest, parsed) = X509Certificate::from_der(&der)
            .map_err(|err| CertificateError::Malformed(err.to_string()))?;
        if !rest.is_empty() {
            return Err(CertificateError::TrailingData(rest.len()));
        }

        let subject_name = parsed.subject().to_string();
        let issuer_name = parsed.issuer().to_string();
        let serial_number = parsed.raw_serial_as_string();
        let not_before = parsed.validity().not_before.timestamp();
        let not_after = parsed.validity().not_after.timestamp();
        let thumbprint = hex::encode_upper(Sha1::digest(&der));

        Ok(Self {
            der,
            thumbprint,
            subject_name,
            issuer_name,
            serial_number,
            not_before,
            not_after,
        })
    }

    /// Raw DER encoding, exactly as it was parsed.
    pub fn raw_data(&self) -> &[u8] {
        &self.der
    }

    pub fn into_raw_data(self) -> Vec<u8> {
        self.der
    }

    /// Uppercase hex SHA-1 of the DER encoding.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    /// Colon-separated hex serial number.
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Start of validity, unix seconds.
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// End of validity, unix seconds.
    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    /// Stored certificates are public only.
    pub fn has_private_key(&self) -> bool {
        false
    }
}

impl Debug for Certificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("thumbprint", &self.thumbprint)
            .field("subject_name", &self.subject_name)
            .field("issuer_name", &self.issuer_name)
            .finish_non_exhaustive()
    }
}
