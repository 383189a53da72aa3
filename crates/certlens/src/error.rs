//! Error types for certificate inspection and archiving.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for certificate inspection.
pub type Result<T> = std::result::Result<T, InspectError>;

/// Errors raised while hydrating and verifying a domain's certificates.
#[derive(Error, Debug)]
pub enum InspectError {
    /// The certificate root could not be enumerated.
    #[error("failed to scan {path}: {reason}")]
    Scan {
        /// Directory being scanned
        path: PathBuf,
        /// Underlying walk failure
        reason: String,
    },

    /// A live certificate path is missing or its symlink is broken.
    #[error("cannot resolve {path}: {source}")]
    PathResolution {
        /// Path that failed to resolve
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A resolved certificate file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The chain file holds no usable certificate.
    #[error("invalid certificate chain in {path}: {reason}")]
    InvalidChain {
        /// Chain file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The leaf file has no PEM block, or the block is not a certificate.
    #[error("invalid certificate in {path}: {reason}")]
    InvalidCertificate {
        /// Leaf certificate file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The leaf does not verify against its own chain.
    #[error("certificate for {domain} failed verification: {reason}")]
    ChainVerification {
        /// Domain directory name
        domain: String,
        /// Verification failure
        reason: String,
    },
}

impl InspectError {
    pub(crate) fn resolve(path: &Path, source: std::io::Error) -> Self {
        Self::PathResolution {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Errors raised while building a zip archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The target archive file could not be created.
    #[error("cannot create archive {path}: {source}")]
    ArchiveCreation {
        /// Target archive path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The source path does not exist or is inaccessible.
    #[error("cannot stat {path}: {source}")]
    SourceStat {
        /// Source directory
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The requested domain is not a single plain directory name.
    #[error("invalid domain name: {0:?}")]
    InvalidDomain(String),

    /// Traversal, read or write of a single entry failed.
    #[error("archiving {path} failed: {reason}")]
    Walk {
        /// Entry being processed
        path: PathBuf,
        /// What went wrong
        reason: String,
    },
}

impl ArchiveError {
    pub(crate) fn walk(path: &Path, reason: impl ToString) -> Self {
        Self::Walk {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}
