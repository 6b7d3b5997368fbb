//! faultline server
//!
//! Synthetic traffic for observability tooling:
//! - `/api/success` : 200 after 100..2100ms
//! - `/api/failure` : random 4xx/5xx, delayed 504, or an unhandled fault
//! - `/metrics`     : Prometheus text exposition

use tokio::net::TcpListener;

use faultline_core::error::{FaultlineError, Result};
use faultline_server::{app_state::AppState, config, obs, router};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load()?;
    obs::logging::init(cfg.log.format);

    let listen = cfg.server.listen_addr()?;
    let collect_interval = cfg.metrics.collect_interval();
    let state = AppState::new(cfg)?;
    let collector = state
        .process_collector()
        .map(|c| c.spawn(collect_interval));
    let app = router::build_router(state);

    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| FaultlineError::Internal(format!("failed to bind {listen}: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| FaultlineError::Internal(format!("local_addr failed: {e}")))?
        .port();
    tracing::info!(%listen, "Server running on http://localhost:{port}");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| FaultlineError::Internal(format!("server failed: {e}")));

    if let Some(handle) = collector {
        handle.abort();
    }
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("signal received, starting graceful shutdown");
}
