//! HTTP surface, object storage, and process bootstrap for the catalog
//! service. The two binaries (`bazar-server`, `bazar-worker`) assemble their
//! processes from these modules.

pub mod api;
pub mod bootstrap;
pub mod middleware;
pub mod storage;

/// Signal future shared by both binaries: resolves on ctrl-c or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
