use std::{future::Future, net::SocketAddr, path::PathBuf, sync::Arc};

use common::env::ensure_snapshot_dir;
use configs::AppConfig;
use service::CustomerStore;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, AppState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    let raw = cfg.server.bind_addr();
    raw.parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address {raw}: {e}")))
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
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

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!(service = "server", event = "shutdown_signal", "shutdown signal received");
}

/// Load the snapshot, bind the listener, serve until `shutdown` resolves,
/// then flush the snapshot.
pub async fn run_with_config<F>(cfg: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let snapshot_path = PathBuf::from(&cfg.storage.snapshot_path);
    ensure_snapshot_dir(&cfg.storage.snapshot_path)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    // must finish before the listener accepts anything
    let store = Arc::new(CustomerStore::new());
    if let Err(e) = store.load_from_snapshot(&snapshot_path).await {
        warn!(
            service = "server",
            event = "snapshot_load_failed",
            code = e.code(),
            error = %e,
            "serving with an empty customer store"
        );
    }

    let addr = bind_addr(&cfg)?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, snapshot = %snapshot_path.display(), "starting customer server");
    serve(listener, store, snapshot_path, shutdown).await
}

/// Serve on an already bound listener. The snapshot is written once serving
/// stops, whether it ended by signal or by error; a failed write is logged
/// and does not change the result.
pub async fn serve<F>(
    listener: TcpListener,
    store: Arc<CustomerStore>,
    snapshot_path: PathBuf,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(store.clone());
    let app = routes::build_router(state, build_cors());

    let served = axum::serve(listener, app).with_graceful_shutdown(shutdown).await;

    match store.save_snapshot(&snapshot_path).await {
        Ok(count) => info!(service = "server", event = "snapshot_flushed", count, "customer store flushed"),
        Err(e) => warn!(service = "server", event = "snapshot_flush_failed", error = %e, "shutdown continues without snapshot"),
    }

    served?;
    Ok(())
}
