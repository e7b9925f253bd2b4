//! Main proxy server implementation.
//!
//! Accepts client connections, spawns a [`Session`] per connection and runs
//! the approval coordinator alongside the accept loop.

use crate::classifier::RuleSet;
use crate::coordinator::ApprovalCoordinator;
use crate::error::ProxyError;
use crate::executor::{PgStatementExecutor, StatementExecutor};
use crate::session::{Session, SessionContext};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpListener;
use tokio::sync::watch;
use warden_core::{ApprovalsConfig, ProxyConfig, UpstreamConfig, WardenConfig};
use warden_store::QueryRecordStore;

/// The Warden interception proxy.
pub struct WardenProxy {
    config: ProxyConfig,
    upstream: UpstreamConfig,
    coordinator: Arc<ApprovalCoordinator>,
    rules: RuleSet,
    next_session: AtomicU64,
}

impl WardenProxy {
    /// Create a new proxy.
    pub fn new(
        config: ProxyConfig,
        upstream: UpstreamConfig,
        approvals: ApprovalsConfig,
        rules: RuleSet,
        store: Arc<dyn QueryRecordStore>,
        executor: Arc<dyn StatementExecutor>,
    ) -> Self {
        let coordinator = Arc::new(ApprovalCoordinator::new(store, executor, approvals));
        Self {
            config,
            upstream,
            coordinator,
            rules,
            next_session: AtomicU64::new(1),
        }
    }

    /// Build a proxy from the full configuration, executing approved
    /// statements with the configured executor credentials.
    pub fn from_config(
        config: &WardenConfig,
        store: Arc<dyn QueryRecordStore>,
    ) -> Result<Self, ProxyError> {
        let rules = RuleSet::builtin()
            .with_extra_patterns(&config.classifier.extra_patterns)
            .map_err(|e| anyhow::anyhow!("invalid classifier pattern: {}", e))?;
        let executor = Arc::new(PgStatementExecutor::from_config(
            &config.executor,
            &config.upstream,
        ));

        tracing::info!(
            rules = rules.len(),
            env_credentials = config.executor.uses_env_credentials(),
            "Configured query interception"
        );

        Ok(Self::new(
            config.proxy.clone(),
            config.upstream.clone(),
            config.approvals.clone(),
            rules,
            store,
            executor,
        ))
    }

    /// Get a reference to the proxy configuration.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The coordinator tracking withheld statements.
    pub fn coordinator(&self) -> &Arc<ApprovalCoordinator> {
        &self.coordinator
    }

    /// Bind to the configured listen address.
    pub async fn bind(&self) -> Result<TcpListener, ProxyError> {
        let listen_addr = self.config.listen_address();
        TcpListener::bind(&listen_addr)
            .await
            .map_err(|e| ProxyError::BindFailed {
                address: listen_addr,
                source: e,
            })
    }

    /// Run the proxy server until shutdown is signalled.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), ProxyError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ProxyError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            listen_addr = %local_addr,
            upstream = %self.upstream.address(),
            "Proxy server listening"
        );

        let coordinator_task = tokio::spawn(self.coordinator.clone().run(shutdown.clone()));

        let context = Arc::new(SessionContext {
            coordinator: self.coordinator.clone(),
            rules: self.rules,
            upstream_address: self.upstream.address(),
            max_message_size: self.config.max_message_size,
            read_buffer_size: self.config.read_buffer_size,
        });

        loop {
            if *shutdown.borrow() {
                break;
            }

            let (socket, peer_addr) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!(error = %ProxyError::AcceptFailed(e), "Failed to accept connection");
                        continue;
                    }
                },
                _ = shutdown.changed() => break,
            };

            let session_id = self.next_session.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(session = session_id, peer = %peer_addr, "New connection");

            let session = Session::new(session_id, peer_addr, context.clone());
            tokio::spawn(async move {
                if let Err(e) = session.run(socket).await {
                    tracing::warn!(session = session_id, peer = %peer_addr, error = %e, "Connection error");
                }
            });
        }

        tracing::info!("Proxy server shutting down");
        if let Err(e) = coordinator_task.await {
            tracing::error!(error = %e, "Approval coordinator task failed");
        }
        Ok(())
    }
}
