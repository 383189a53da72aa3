//! Live certificate discovery: scan, resolve, verify.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{InspectError, Result};
use crate::policy::DomainErrorPolicy;
use crate::record::{CertPaths, CertificateRecord, Verified, CERT_FILE, CHAIN_FILE, PRIVATE_KEY_FILE};
use crate::verify::{decode_leaf, verify_leaf, TrustPool};

/// Default certificate root (one directory per domain).
pub const DEFAULT_LIVE_DIR: &str = "/certs/live";

/// Lists and verifies the certificates under a live directory.
#[derive(Debug, Clone)]
pub struct CertificateInspector {
    root: PathBuf,
    policy: DomainErrorPolicy,
}

impl Default for CertificateInspector {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_DIR)
    }
}

impl CertificateInspector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: DomainErrorPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: DomainErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn policy(&self) -> DomainErrorPolicy {
        self.policy
    }

    /// List every domain under the root, verified as of now.
    pub fn list(&self) -> Result<Vec<CertificateRecord>> {
        self.list_at(Utc::now())
    }

    /// List every domain under the root, verified as of `now`.
    ///
    /// Per-domain failures are handled according to the configured
    /// [`DomainErrorPolicy`]; only `Abort` turns them into an error.
    pub fn list_at(&self, now: DateTime<Utc>) -> Result<Vec<CertificateRecord>> {
        let domains = match self.scan_domains() {
            Ok(domains) => domains,
            Err(e) if self.policy != DomainErrorPolicy::Abort => {
                warn!(root = %self.root.display(), error = %e, "certificate root not readable");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut records = Vec::with_capacity(domains.len());
        for domain in domains {
            let paths = match self.resolve_paths(&domain) {
                Ok(paths) => paths,
                Err(e) => {
                    records.extend(self.reject(&domain, e, CertificateRecord::unresolved(&domain))?);
                    continue;
                }
            };

            let record = CertificateRecord::unverified(&domain, paths.clone());
            match verify_paths(&domain, &paths, now) {
                Ok(verified) => {
                    debug!(domain = %domain, "certificate verified");
                    records.push(record.with_verified(verified));
                }
                Err(e) => records.extend(self.reject(&domain, e, record)?),
            }
        }

        Ok(records)
    }

    /// Hydrate and verify a single domain, ignoring the error policy.
    pub fn inspect_domain(&self, domain: &str, now: DateTime<Utc>) -> Result<CertificateRecord> {
        let paths = self.resolve_paths(domain)?;
        let verified = verify_paths(domain, &paths, now)?;
        Ok(CertificateRecord::unverified(domain, paths).with_verified(verified))
    }

    /// Names of the immediate subdirectories of the root, in directory order.
    pub fn scan_domains(&self) -> Result<Vec<String>> {
        std::fs::metadata(&self.root).map_err(|e| InspectError::Scan {
            path: self.root.clone(),
            reason: e.to_string(),
        })?;

        let domains = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(root = %self.root.display(), error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();

        Ok(domains)
    }

    /// Resolve the three live files of `domain` through their symlinks.
    pub fn resolve_paths(&self, domain: &str) -> Result<CertPaths> {
        let dir = self.root.join(domain);
        let resolve = |name: &str| {
            let path = dir.join(name);
            std::fs::canonicalize(&path).map_err(|e| InspectError::resolve(&path, e))
        };

        Ok(CertPaths {
            private_key: resolve(PRIVATE_KEY_FILE)?,
            chain: resolve(CHAIN_FILE)?,
            cert: resolve(CERT_FILE)?,
        })
    }

    fn reject(
        &self,
        domain: &str,
        err: InspectError,
        fallback: CertificateRecord,
    ) -> Result<Option<CertificateRecord>> {
        match self.policy {
            DomainErrorPolicy::LogAndSkip => {
                info!(domain = %domain, error = %err, "certs not found or invalid, skipping");
                Ok(None)
            }
            DomainErrorPolicy::CollectAsInvalid => {
                info!(domain = %domain, error = %err, "certs not found or invalid");
                Ok(Some(fallback))
            }
            DomainErrorPolicy::Abort => Err(err),
        }
    }
}

/// Read the chain and leaf behind `paths` and verify one against the other.
fn verify_paths(domain: &str, paths: &CertPaths, now: DateTime<Utc>) -> Result<Verified> {
    let bundle = std::fs::read(&paths.chain).map_err(|e| InspectError::read(&paths.chain, e))?;
    let leaf = std::fs::read(&paths.cert).map_err(|e| InspectError::read(&paths.cert, e))?;

    let pool = TrustPool::from_pem(&bundle, &paths.chain)?;
    let leaf_der = decode_leaf(&leaf, &paths.cert)?;

    verify_leaf(&leaf_der, &pool, now).map_err(|e| InspectError::ChainVerification {
        domain: domain.to_string(),
        reason: e.to_string(),
    })
}
