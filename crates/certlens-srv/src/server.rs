//! HTTP server runner: binds the Unix socket and serves the certificate API.

use axum::routing::get;
use axum::Router;
use certlens::{ArchiveBuilder, CertificateInspector};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::handlers;
use crate::SrvError;

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    pub inspector: Arc<CertificateInspector>,
    pub archives: Arc<ArchiveBuilder>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            inspector: Arc::new(
                CertificateInspector::new(&config.live_dir).with_policy(config.on_domain_error),
            ),
            archives: Arc::new(ArchiveBuilder::new(&config.archive_dir)),
        }
    }
}

/// Build the router with both endpoints and request logging.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/certificates", get(handlers::list_certificates))
        .route("/download/{domain}", get(handlers::download))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `path`, replacing any socket file left behind by a previous run.
pub fn bind(path: &Path) -> crate::Result<UnixListener> {
    let bind_err = |source| SrvError::Bind {
        path: path.display().to_string(),
        source,
    };

    match std::fs::remove_file(path) {
        Ok(()) => info!(path = %path.display(), "removed stale socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(bind_err(e)),
    }

    UnixListener::bind(path).map_err(bind_err)
}

/// Serve until Ctrl-C / SIGTERM, then drain for at most the configured timeout.
pub async fn run(config: &ServerConfig) -> crate::Result<()> {
    let listener = bind(&config.socket)?;
    info!(
        socket = %config.socket.display(),
        live_dir = %config.live_dir.display(),
        archive_dir = %config.archive_dir.display(),
        policy = %config.on_domain_error,
        "certlens-srv listening"
    );

    let app = build_router(AppState::from_config(config));
    serve_until(listener, app, shutdown_signal(), config.shutdown_timeout()).await
}

/// Serve `app` until `shutdown` resolves, then give in-flight requests
/// `drain` to finish before abandoning them.
pub async fn serve_until<F>(
    listener: UnixListener,
    app: Router,
    shutdown: F,
    drain: Duration,
) -> crate::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            return joined?.map_err(|e| SrvError::Serve(e.to_string()));
        }
        () = shutdown => {}
    }

    info!(timeout_secs = drain.as_secs(), "shutting down");
    let _ = stop_tx.send(());

    if let Ok(joined) = tokio::time::timeout(drain, &mut server).await {
        joined?.map_err(|e| SrvError::Serve(e.to_string()))
    } else {
        warn!("drain timeout elapsed, abandoning in-flight requests");
        server.abort();
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
