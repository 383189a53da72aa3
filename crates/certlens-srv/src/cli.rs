//! Command-line argument definitions using clap.

use certlens::DomainErrorPolicy;
use clap::Parser;
use std::path::PathBuf;

use crate::config::ServerConfig;

/// Certificate inspection backend for the desktop extension.
///
/// Serves `GET /certificates` and `GET /download/{domain}` over a Unix socket.
#[derive(Parser, Debug)]
#[command(name = "certlens-srv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Unix domain socket to listen on
    #[arg(long, env = "CERTLENS_SOCKET")]
    pub socket: Option<PathBuf>,

    /// TOML config file (missing file means defaults)
    #[arg(short, long, env = "CERTLENS_CONFIG", default_value = "/etc/certlens/certlens.toml")]
    pub config: PathBuf,

    /// Directory with one live subdirectory per domain
    #[arg(long)]
    pub live_dir: Option<PathBuf>,

    /// Directory with the versioned certificate generations
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,

    /// log-and-skip, collect-as-invalid or abort
    #[arg(long)]
    pub on_domain_error: Option<DomainErrorPolicy>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Layer command-line values over `config`.
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(socket) = &self.socket {
            config.socket.clone_from(socket);
        }
        if let Some(dir) = &self.live_dir {
            config.live_dir.clone_from(dir);
        }
        if let Some(dir) = &self.archive_dir {
            config.archive_dir.clone_from(dir);
        }
        if let Some(policy) = self.on_domain_error {
            config.on_domain_error = policy;
        }
        config
    }
}
