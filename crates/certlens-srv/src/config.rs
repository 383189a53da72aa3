//! Server configuration for certlens-srv.

use certlens::archive::DEFAULT_ARCHIVE_DIR;
use certlens::inspector::DEFAULT_LIVE_DIR;
use certlens::DomainErrorPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Socket the extension host connects to.
pub const DEFAULT_SOCKET: &str = "/run/guest-services/backend.sock";

/// Configuration for a certlens-srv backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Unix domain socket to listen on (default: /run/guest-services/backend.sock).
    pub socket: PathBuf,

    /// One directory per domain, holding the live symlinks (default: /certs/live).
    pub live_dir: PathBuf,

    /// Versioned certificate directories, zipped on download (default: /certs/archive).
    pub archive_dir: PathBuf,

    /// Upper bound on draining in-flight requests at shutdown (seconds).
    pub shutdown_timeout_secs: u64,

    /// What a listing does with a domain that fails to verify.
    pub on_domain_error: DomainErrorPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET),
            live_dir: PathBuf::from(DEFAULT_LIVE_DIR),
            archive_dir: PathBuf::from(DEFAULT_ARCHIVE_DIR),
            shutdown_timeout_secs: default_shutdown_timeout(),
            on_domain_error: DomainErrorPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::SrvError::Config(e.to_string()))
    }

    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

const fn default_shutdown_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.socket, PathBuf::from("/run/guest-services/backend.sock"));
        assert_eq!(config.live_dir, PathBuf::from("/certs/live"));
        assert_eq!(config.archive_dir, PathBuf::from("/certs/archive"));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(config.on_domain_error, DomainErrorPolicy::LogAndSkip);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            live_dir = "/srv/le/live"
            on_domain_error = "collect-as-invalid"
            "#,
        )
        .unwrap();
        assert_eq!(config.live_dir, PathBuf::from("/srv/le/live"));
        assert_eq!(config.on_domain_error, DomainErrorPolicy::CollectAsInvalid);
        assert_eq!(config.archive_dir, PathBuf::from("/certs/archive"));
        assert_eq!(config.shutdown_timeout_secs, 10);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = ServerConfig::from_toml("on_domain_error = \"retry\"").unwrap_err();
        assert!(matches!(err, crate::SrvError::Config(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load(Path::new("/nonexistent/certlens.toml")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }
}
