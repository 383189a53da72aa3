//! Request handlers. The core calls block on the filesystem, so each one
//! runs on tokio's blocking pool.

use axum::extract::{Path, State};
use axum::Json;
use certlens::CertificateRecord;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::server::AppState;
use crate::SrvError;

/// Body of a successful download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    /// Where the archive was written
    pub path: String,
}

/// `GET /certificates`
pub async fn list_certificates(
    State(state): State<AppState>,
) -> Result<Json<Vec<CertificateRecord>>, SrvError> {
    let inspector = state.inspector.clone();
    let records = tokio::task::spawn_blocking(move || inspector.list()).await??;

    info!(count = records.len(), "listed certificates");
    Ok(Json(records))
}

/// `GET /download/{domain}`
pub async fn download(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<DownloadResponse>, SrvError> {
    let archives = state.archives.clone();
    let name = domain.clone();
    let built = tokio::task::spawn_blocking(move || archives.build(&name)).await?;

    match built {
        Ok(summary) => Ok(Json(DownloadResponse {
            path: summary.path.display().to_string(),
        })),
        Err(e) => {
            warn!(domain = %domain, error = %e, "archive build failed");
            Err(e.into())
        }
    }
}
