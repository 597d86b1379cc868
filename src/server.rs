//! HTTP server initialization and runtime setup.
//!
//! Builds the shared state, serves the application router and coordinates
//! graceful shutdown.

use crate::config::Config;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Upper bound on draining in-flight connections after a shutdown signal.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Global and per-client rate limiters with their background workers
/// - In-memory URL store with its expiry sweeper
/// - Axum HTTP server
///
/// On SIGINT or SIGTERM the listener stops accepting, in-flight connections
/// get [`DRAIN_TIMEOUT`] to finish and every background worker is stopped
/// before returning.
///
/// # Errors
///
/// Returns an error if:
/// - A limiter rejects its settings
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen_addr))?;

    let state = AppState::new(Arc::new(config)).context("Failed to build application state")?;
    tracing::info!("Rate limiters and URL store started");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    let app = app_router(state.clone());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let mut server: JoinHandle<io::Result<()>> = tokio::spawn(async move {
        axum::serve(
            listener,
            ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await
    });

    let outcome = tokio::select! {
        result = &mut server => Some(result),
        _ = shutdown_signal() => None,
    };

    let result = match outcome {
        Some(early) => {
            tracing::error!("Server stopped without a shutdown signal");
            flatten(early)
        }
        None => {
            tracing::info!(
                "Shutdown signal received, draining connections for up to {:?}",
                DRAIN_TIMEOUT
            );
            let _ = shutdown_tx.send(());

            match timeout(DRAIN_TIMEOUT, &mut server).await {
                Ok(result) => flatten(result),
                Err(_) => {
                    tracing::warn!("Connections still open after drain timeout, closing them");
                    server.abort();
                    Ok(())
                }
            }
        }
    };

    state.offline();
    tracing::info!("Server stopped");

    result
}

fn flatten(result: Result<io::Result<()>, tokio::task::JoinError>) -> Result<()> {
    result
        .context("Server task failed")?
        .context("Server error")
}

/// Completes on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
