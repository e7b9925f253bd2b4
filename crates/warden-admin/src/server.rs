//! Admin server implementation.

use crate::error::AdminError;
use crate::routes;
use crate::state::AppState;
use tokio::net::TcpListener;
use tokio::sync::watch;
use warden_core::AdminConfig;

/// The admin API server.
pub struct AdminServer {
    config: AdminConfig,
    state: AppState,
}

impl AdminServer {
    /// Create a new admin server with the given configuration.
    pub fn new(config: AdminConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve the admin API until shutdown is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), AdminError> {
        let addr = self.config.listen_address();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AdminError::StartupFailed(format!("{}: {}", addr, e)))?;

        tracing::info!(address = %addr, "Admin API listening");

        let app = routes::create_router(self.state.clone());
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await
            .map_err(|e| AdminError::StartupFailed(e.to_string()))?;

        tracing::info!("Admin API stopped");
        Ok(())
    }

    /// Get the configured listen port.
    pub fn listen_port(&self) -> u16 {
        self.config.listen_port
    }
}
