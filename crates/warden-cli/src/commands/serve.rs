//! `warden serve` - run the proxy and the admin API.
//!
//! Both services share one query store and stop together on Ctrl-C or
//! SIGTERM.

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};
use warden_admin::{AdminServer, AppState};
use warden_core::WardenConfig;
use warden_proxy::WardenProxy;

pub async fn run(config: WardenConfig) -> Result<()> {
    let store = warden_store::open_store(&config.store).context("Failed to open query store")?;
    info!(
        backend = ?config.store.backend,
        directory = %config.store.directory.display(),
        "Query store ready"
    );

    if !config.executor.uses_env_credentials() && config.executor.password.is_some() {
        warn!("Executor password is set inline; consider password_env or database_url_env");
    }

    let proxy = WardenProxy::from_config(&config, store.clone())?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let admin_handle = if config.admin.enabled {
        let admin = AdminServer::new(config.admin.clone(), AppState::new(store));
        let rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = admin.run(rx).await {
                tracing::error!(error = %e, "Admin API error");
            }
        }))
    } else {
        info!("Admin API disabled");
        None
    };

    let mut proxy_handle = tokio::spawn(proxy.run(shutdown_rx));

    let finished = tokio::select! {
        _ = shutdown_signal() => None,
        result = &mut proxy_handle => Some(result),
    };
    let _ = shutdown_tx.send(true);

    let proxy_result = match finished {
        Some(result) => result,
        None => {
            info!("Shutdown signal received");
            proxy_handle.await
        }
    };

    if let Some(handle) = admin_handle
        && let Err(e) = handle.await
    {
        tracing::error!(error = %e, "Admin task failed");
    }

    proxy_result
        .context("Proxy task failed")?
        .context("Proxy server error")?;
    info!("Warden stopped");
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
