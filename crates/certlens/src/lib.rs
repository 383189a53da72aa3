//! # certlens
//!
//! Read-only inspection of the certificates a renewal tool keeps on disk,
//! plus zipping a domain's certificate directory for download.
//!
//! ## Layout
//!
//! ```text
//! /certs/live/<domain>/privkey.pem    -> ../../archive/<domain>/privkey3.pem
//! /certs/live/<domain>/fullchain.pem  -> ../../archive/<domain>/fullchain3.pem
//! /certs/live/<domain>/cert.pem       -> ../../archive/<domain>/cert3.pem
//! /certs/archive/<domain>/            (zipped by ArchiveBuilder)
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! CertificateInspector::list()
//!   scan_domains()        immediate subdirectories of the live root
//!   -> resolve_paths()    follow the live symlinks
//!   -> verify_leaf()      cert.pem against the anchors in fullchain.pem
//!   -> CertificateRecord  valid / expiry / days_left / dns_names
//!
//! ArchiveBuilder::build(domain)
//!   <archive>/<domain>/ -> <archive>/<domain>.zip
//! ```
//!
//! Both halves are synchronous and share no state; callers on an async
//! runtime should run them on a blocking thread.

pub mod archive;
pub mod error;
pub mod inspector;
pub mod policy;
pub mod record;
pub mod verify;

pub use archive::{zip_dir, ArchiveBuilder, ArchiveRequest, ArchiveSummary};
pub use error::{ArchiveError, InspectError, Result};
pub use inspector::CertificateInspector;
pub use policy::DomainErrorPolicy;
pub use record::{CertPaths, CertificateRecord};
