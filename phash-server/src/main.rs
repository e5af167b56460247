//! pHash Server - REST API for perceptual image hashing
//!
//! Exposes phash-core functionality via HTTP endpoints:
//! - POST /phash - Hash an uploaded image
//! - POST /process-image/ - Hash an image by URL
//! - POST /compare-images/ - Compare two images by URL
//! - POST /compare-hash/ - Compare an image by URL with a known hash

use std::future::Future;
use std::net::SocketAddr;

use phash_server::{create_router_with_state, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "phash_server=info,phash_core=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    let addr = config.socket_addr();

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    tracing::info!(
        hash_size = state.config.hash_size,
        highfreq_factor = state.config.highfreq_factor,
        threshold = state.config.similarity_threshold,
        max_upload_bytes = state.config.max_upload_bytes,
        fetch_spool = ?state.config.fetch_spool,
        "pHash service v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let app = create_router_with_state(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API docs at http://{}/docs", addr);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Resolve on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = wait_for_signal("Ctrl+C", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}

/// Wait for `listener`; if it could not be installed, never resolve.
async fn wait_for_signal(name: &'static str, listener: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = listener.await {
        tracing::error!(error = %e, "Failed to listen for {}", name);
        std::future::pending::<()>().await;
    }
}
