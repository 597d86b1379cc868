//! A throwaway copy of the whole service for load testing.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::stress::StressTestError;
use crate::config::Config;
use crate::routes::core_router;
use crate::state::AppState;

/// Limiters, URL store and HTTP server separate from production state.
///
/// Dropping the stack shuts the server down and stops every background
/// worker, whichever way the owning stress run ends.
pub struct IsolatedStack {
    state: AppState,
    addr: SocketAddr,
    server: JoinHandle<io::Result<()>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl IsolatedStack {
    /// Binds the stress listener and starts serving a fresh stack on it.
    ///
    /// # Errors
    ///
    /// Returns [`StressTestError::ServerStart`] if the listener cannot be
    /// bound or the stack cannot be built.
    pub async fn start(config: &Config) -> Result<Self, StressTestError> {
        let listener = TcpListener::bind(&config.stress_test.listen_addr)
            .await
            .map_err(StressTestError::ServerStart)?;
        let addr = listener.local_addr().map_err(StressTestError::ServerStart)?;

        let state = AppState::new(Arc::new(config.clone()))
            .map_err(|e| StressTestError::ServerStart(io::Error::other(e)))?;

        let app = core_router(state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        });

        info!(%addr, "Isolated test server listening");

        Ok(Self {
            state,
            addr,
            server,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL the load generator should target.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    #[cfg(test)]
    pub(crate) fn server_abort_handle(&self) -> tokio::task::AbortHandle {
        self.server.abort_handle()
    }

    /// Completes when the server task ends on its own.
    ///
    /// Must not be polled again once it has completed.
    pub async fn stopped(&mut self) {
        match (&mut self.server).await {
            Ok(Ok(())) => warn!(addr = %self.addr, "Isolated test server exited"),
            Ok(Err(e)) => warn!(addr = %self.addr, error = %e, "Isolated test server failed"),
            Err(e) => warn!(addr = %self.addr, error = %e, "Isolated test server task aborted"),
        }
    }
}

impl Drop for IsolatedStack {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        // Open keep-alive connections would hold a graceful shutdown open.
        self.server.abort();
        self.state.offline();
        info!(addr = %self.addr, "Isolated test stack torn down");
    }
}
