//! certlens-srv: certificate inspection backend for a desktop extension.
//!
//! Listens on a Unix domain socket only; there is no TCP listener and no TLS
//! on the API itself.
//!
//! # Endpoints
//!
//! - `GET /certificates` - JSON array of verified certificate records
//! - `GET /download/{domain}` - zip `<archive_dir>/<domain>` next to itself,
//!   answering `{"path": "<archive_dir>/<domain>.zip"}`
//!
//! Listing answers `200` whatever subset of domains verified. A failed
//! download answers `500` with the error text as a JSON string.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod server;

// Re-exports for convenience.
pub use config::ServerConfig;
pub use error::SrvError;
pub use server::{build_router, AppState};

/// Result type for certlens-srv operations.
pub type Result<T> = std::result::Result<T, SrvError>;
