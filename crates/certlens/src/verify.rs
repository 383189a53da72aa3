//! Leaf verification against the certificates bundled in its own chain file.
//!
//! ## Trust model
//!
//! The chain file is the only source of trust anchors. Every certificate it
//! holds is treated as a root, the system trust store is never consulted and
//! no hostname is checked. Since `fullchain.pem` normally starts with the
//! leaf itself, a leaf that appears in its own pool is trusted directly.
//!
//! What is still enforced:
//!
//! - the leaf, and the anchor that signed it, are inside their validity window
//! - the anchor's subject matches the leaf's issuer and its key verifies the
//!   leaf signature
//! - a leaf carrying extended key usage allows `serverAuth`

use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::pem::Pem;

use crate::error::InspectError;
use crate::record::Verified;

/// Layout of the `expiry` field (the Unix `date` format).
pub const EXPIRY_FORMAT: &str = "%a %b %e %H:%M:%S UTC %Y";

const SECS_PER_DAY: f64 = 86_400.0;

/// Why a leaf was not trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainFailure {
    #[error("certificate has expired (not after {0})")]
    Expired(String),

    #[error("certificate is not yet valid (not before {0})")]
    NotYetValid(String),

    #[error("certificate signed by unknown authority")]
    UnknownAuthority,

    #[error("certificate specifies an incompatible key usage")]
    IncompatibleUsage,

    #[error("malformed extension: {0}")]
    Extension(String),

    #[error("certificate could not be parsed: {0}")]
    Malformed(String),
}

/// Certificates parsed out of a chain file, kept as DER.
#[derive(Debug, Clone, Default)]
pub struct TrustPool {
    certs: Vec<Vec<u8>>,
}

impl TrustPool {
    /// Parse every `CERTIFICATE` block in a PEM bundle.
    ///
    /// Malformed blocks and blocks that are not valid DER certificates are
    /// skipped; a bundle with nothing usable left is an error.
    pub fn from_pem(bundle: &[u8], source: &Path) -> Result<Self, InspectError> {
        let certs: Vec<Vec<u8>> = Pem::iter_from_buffer(bundle)
            .filter_map(|block| match block {
                Ok(block) => Some(block),
                Err(e) => {
                    debug!(path = %source.display(), error = %e, "skipping malformed PEM block");
                    None
                }
            })
            .filter(|block| block.label == "CERTIFICATE")
            .filter_map(|block| {
                if let Err(e) = x509_parser::parse_x509_certificate(&block.contents) {
                    debug!(path = %source.display(), error = %e, "skipping cert in chain");
                    return None;
                }
                Some(block.contents)
            })
            .collect();

        if certs.is_empty() {
            return Err(InspectError::InvalidChain {
                path: source.to_path_buf(),
                reason: "no certificates found".into(),
            });
        }
        Ok(Self { certs })
    }

    /// Number of anchors in the pool.
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    fn contains(&self, der: &[u8]) -> bool {
        self.certs.iter().any(|c| c == der)
    }

    fn anchors(&self) -> impl Iterator<Item = X509Certificate<'_>> {
        self.certs
            .iter()
            .filter_map(|der| x509_parser::parse_x509_certificate(der).ok().map(|(_, c)| c))
    }
}

/// Decode the first PEM block of a leaf file into DER.
pub fn decode_leaf(pem_bytes: &[u8], source: &Path) -> Result<Vec<u8>, InspectError> {
    let block = pem::parse(pem_bytes).map_err(|e| InspectError::InvalidCertificate {
        path: source.to_path_buf(),
        reason: format!("failed to parse certificate PEM: {e}"),
    })?;
    let der = block.into_contents();

    x509_parser::parse_x509_certificate(&der).map_err(|e| InspectError::InvalidCertificate {
        path: source.to_path_buf(),
        reason: format!("failed to parse certificate: {e}"),
    })?;
    Ok(der)
}

/// Verify a DER leaf against `pool` at `now` and derive its metadata.
pub fn verify_leaf(
    leaf_der: &[u8],
    pool: &TrustPool,
    now: DateTime<Utc>,
) -> Result<Verified, ChainFailure> {
    let (_, leaf) = x509_parser::parse_x509_certificate(leaf_der)
        .map_err(|e| ChainFailure::Malformed(e.to_string()))?;

    check_validity(&leaf, now)?;

    if !pool.contains(leaf_der) && !pool.anchors().any(|anchor| signs(&anchor, &leaf, now)) {
        return Err(ChainFailure::UnknownAuthority);
    }

    check_server_auth(&leaf)?;

    let not_after = to_utc(leaf.validity().not_after.timestamp());
    Ok(Verified {
        not_after,
        expiry: format_expiry(not_after),
        days_left: days_left(not_after, now),
        dns_names: dns_names(&leaf)?,
    })
}

fn signs(anchor: &X509Certificate<'_>, leaf: &X509Certificate<'_>, now: DateTime<Utc>) -> bool {
    anchor.subject().as_raw() == leaf.issuer().as_raw()
        && check_validity(anchor, now).is_ok()
        && leaf.verify_signature(Some(anchor.public_key())).is_ok()
}

fn check_validity(cert: &X509Certificate<'_>, now: DateTime<Utc>) -> Result<(), ChainFailure> {
    let validity = cert.validity();
    let ts = now.timestamp();
    if ts < validity.not_before.timestamp() {
        return Err(ChainFailure::NotYetValid(validity.not_before.to_string()));
    }
    if ts > validity.not_after.timestamp() {
        return Err(ChainFailure::Expired(validity.not_after.to_string()));
    }
    Ok(())
}

fn check_server_auth(leaf: &X509Certificate<'_>) -> Result<(), ChainFailure> {
    let eku = leaf
        .extended_key_usage()
        .map_err(|e| ChainFailure::Extension(e.to_string()))?;
    match eku {
        Some(ext) if !(ext.value.any || ext.value.server_auth) => {
            Err(ChainFailure::IncompatibleUsage)
        }
        _ => Ok(()),
    }
}

fn dns_names(leaf: &X509Certificate<'_>) -> Result<Vec<String>, ChainFailure> {
    let san = leaf
        .subject_alternative_name()
        .map_err(|e| ChainFailure::Extension(e.to_string()))?;

    Ok(san
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    x509_parser::extensions::GeneralName::DNSName(dns) => Some((*dns).to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default())
}

fn to_utc(epoch: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Format a not-after instant for the `expiry` field.
pub fn format_expiry(not_after: DateTime<Utc>) -> String {
    not_after.format(EXPIRY_FORMAT).to_string()
}

/// Days from `now` until `not_after`, rounded half away from zero.
///
/// Negative once the instant has passed.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn days_left(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (not_after - now).num_milliseconds() as f64;
    (millis / 1000.0 / SECS_PER_DAY).round() as i64
}

#[cfg(test)]
pub(crate) mod testing {
    //! rcgen fixtures shared by the inspector tests.

    use rcgen::{
        BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
        IsCa, KeyPair,
    };
    use time::{Duration, OffsetDateTime};

    pub struct Ca {
        pub cert: rcgen::Certificate,
        pub key: KeyPair,
    }

    impl Ca {
        pub fn new(name: &str) -> Self {
            let key = KeyPair::generate().unwrap();
            let mut params = CertificateParams::default();
            let mut dn = DistinguishedName::new();
            dn.push(DnType::CommonName, name);
            params.distinguished_name = dn;
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
            params.not_before = OffsetDateTime::now_utc() - Duration::days(1);
            params.not_after = OffsetDateTime::now_utc() + Duration::days(3650);
            let cert = params.self_signed(&key).unwrap();
            Self { cert, key }
        }

        pub fn pem(&self) -> String {
            self.cert.pem()
        }
    }

    pub struct Leaf {
        pub pem: String,
        pub key_pem: String,
    }

    pub fn leaf_params(sans: &[&str], not_after: OffsetDateTime) -> CertificateParams {
        let names: Vec<String> = sans.iter().map(|s| (*s).to_string()).collect();
        let mut params = CertificateParams::new(names).unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, sans.first().copied().unwrap_or("leaf"));
        params.distinguished_name = dn;
        params.not_before = OffsetDateTime::now_utc() - Duration::days(30);
        params.not_after = not_after;
        params
    }

    pub fn leaf(ca: &Ca, sans: &[&str], not_after: OffsetDateTime) -> Leaf {
        sign(ca, leaf_params(sans, not_after))
    }

    pub fn client_only_leaf(ca: &Ca, sans: &[&str]) -> Leaf {
        let mut params = leaf_params(sans, OffsetDateTime::now_utc() + Duration::days(90));
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        sign(ca, params)
    }

    fn sign(ca: &Ca, params: CertificateParams) -> Leaf {
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &ca.cert, &ca.key).unwrap();
        Leaf {
            pem: cert.pem(),
            key_pem: key.serialize_pem(),
        }
    }
}
