//! Certificate record returned by a listing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Layout of the expected files inside a live domain directory.
pub const PRIVATE_KEY_FILE: &str = "privkey.pem";
/// Full chain (leaf first, then issuers).
pub const CHAIN_FILE: &str = "fullchain.pem";
/// Leaf certificate on its own.
pub const CERT_FILE: &str = "cert.pem";

/// Resolved (symlink-free) paths of a domain's certificate material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPaths {
    /// Private key
    pub private_key: PathBuf,
    /// Full chain
    pub chain: PathBuf,
    /// Leaf certificate
    pub cert: PathBuf,
}

/// Metadata derived from a leaf that passed chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub(crate) not_after: DateTime<Utc>,
    pub(crate) expiry: String,
    pub(crate) days_left: i64,
    pub(crate) dns_names: Vec<String>,
}

/// One discovered domain directory.
///
/// Serialized with the key names the extension UI expects; empty or zero
/// values are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateRecord {
    #[serde(rename = "domains", skip_serializing_if = "Vec::is_empty")]
    dns_names: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    expiry: Option<String>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    valid: bool,

    #[serde(skip_serializing_if = "is_none_or_zero")]
    days_left: Option<i64>,

    #[serde(rename = "chain", skip_serializing_if = "Option::is_none")]
    chain_path: Option<PathBuf>,

    #[serde(rename = "priv_key", skip_serializing_if = "Option::is_none")]
    private_key_path: Option<PathBuf>,

    #[serde(rename = "cert", skip_serializing_if = "Option::is_none")]
    cert_path: Option<PathBuf>,

    #[serde(rename = "path", skip_serializing_if = "String::is_empty")]
    domain: String,

    #[serde(skip)]
    not_after: Option<DateTime<Utc>>,
}

fn is_none_or_zero(v: &Option<i64>) -> bool {
    matches!(v, None | Some(0))
}

impl CertificateRecord {
    /// A record for a domain whose files did not all resolve.
    pub(crate) fn unresolved(domain: impl Into<String>) -> Self {
        Self {
            dns_names: Vec::new(),
            expiry: None,
            valid: false,
            days_left: None,
            chain_path: None,
            private_key_path: None,
            cert_path: None,
            domain: domain.into(),
            not_after: None,
        }
    }

    /// A record with resolved paths, not (yet) verified.
    pub(crate) fn unverified(domain: impl Into<String>, paths: CertPaths) -> Self {
        Self {
            chain_path: Some(paths.chain),
            private_key_path: Some(paths.private_key),
            cert_path: Some(paths.cert),
            ..Self::unresolved(domain)
        }
    }

    /// Mark the record valid with the leaf's derived metadata.
    pub(crate) fn with_verified(mut self, verified: Verified) -> Self {
        self.valid = true;
        self.not_after = Some(verified.not_after);
        self.expiry = Some(verified.expiry);
        self.days_left = Some(verified.days_left);
        self.dns_names = verified.dns_names;
        self
    }

    /// Domain directory name.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Whether the leaf verified against its chain.
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Formatted not-after timestamp (valid records only).
    pub fn expiry(&self) -> Option<&str> {
        self.expiry.as_deref()
    }

    /// Leaf not-after instant (valid records only).
    pub const fn not_after(&self) -> Option<DateTime<Utc>> {
        self.not_after
    }

    /// Rounded days until expiry (valid records only).
    pub const fn days_left(&self) -> Option<i64> {
        self.days_left
    }

    /// SAN DNS names in certificate order (empty unless valid).
    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    pub fn private_key_path(&self) -> Option<&Path> {
        self.private_key_path.as_deref()
    }

    pub fn chain_path(&self) -> Option<&Path> {
        self.chain_path.as_deref()
    }

    pub fn cert_path(&self) -> Option<&Path> {
        self.cert_path.as_deref()
    }
}
