//! Approval workflow coordination.
//!
//! The coordinator owns the in-memory map from query ID to the client
//! connection waiting on that query. Sessions add entries through
//! [`ApprovalCoordinator::submit`]; the background loop in
//! [`ApprovalCoordinator::run`] watches the store for resolved records and
//! removes entries as it acts on them.
//!
//! An entry is removed from the map before its statement is dispatched, and
//! removal happens under the map lock, so an approved statement is executed
//! at most once no matter how many times the approval is observed.
//!
//! Dispatched statements run on tasks the coordinator owns. A poll pass never
//! waits for them, so a statement stuck on a lock only holds up its own client.

use crate::connection::{ClientConnection, Delivery};
use crate::executor::{StatementExecutor, execute_and_notify};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;
use warden_core::{ApprovalsConfig, ClientInfo, QueryStatus};
use warden_store::{QueryRecordStore, StoreError};

/// A withheld statement and the client waiting for it.
#[derive(Debug, Clone)]
pub struct PendingExecution {
    pub query_id: Uuid,
    /// Used only to attempt a write, never to keep the client alive.
    pub connection: Weak<ClientConnection>,
    pub query: String,
    pub enqueued_at: DateTime<Utc>,
}

/// What one poll pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Approved statements handed to the executor.
    pub executed: usize,
    /// Rejected statements whose clients were notified.
    pub rejected: usize,
}

/// Links queued statements to their clients and runs them once approved.
pub struct ApprovalCoordinator {
    store: Arc<dyn QueryRecordStore>,
    executor: Arc<dyn StatementExecutor>,
    config: ApprovalsConfig,
    pending: Mutex<HashMap<Uuid, PendingExecution>>,
    executions: Mutex<JoinSet<()>>,
}

impl ApprovalCoordinator {
    pub fn new(
        store: Arc<dyn QueryRecordStore>,
        executor: Arc<dyn StatementExecutor>,
        config: ApprovalsConfig,
    ) -> Self {
        Self {
            store,
            executor,
            config,
            pending: Mutex::new(HashMap::new()),
            executions: Mutex::new(JoinSet::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, PendingExecution>> {
        // Nothing panics while holding this lock, but don't wedge the proxy if it did.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn executions(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.executions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a dangerous statement and remember who is waiting for it.
    pub async fn submit(
        &self,
        query: &str,
        connection: &Arc<ClientConnection>,
        client_info: ClientInfo,
    ) -> Result<Uuid, StoreError> {
        let query_id = Uuid::new_v4();
        self.store
            .create(query_id, query, &self.config.submitter_label, client_info)
            .await?;

        self.entries().insert(
            query_id,
            PendingExecution {
                query_id,
                connection: Arc::downgrade(connection),
                query: query.to_string(),
                enqueued_at: Utc::now(),
            },
        );

        tracing::info!(
            query_id = %query_id,
            session = connection.id(),
            "Query queued for approval"
        );
        Ok(query_id)
    }

    /// Remove and return the entry for a query, if still tracked.
    fn take(&self, query_id: &Uuid) -> Option<PendingExecution> {
        self.entries().remove(query_id)
    }

    /// Check if a query is still waiting in the map.
    pub fn is_tracking(&self, query_id: &Uuid) -> bool {
        self.entries().contains_key(query_id)
    }

    /// Number of statements still waiting.
    pub fn pending_count(&self) -> usize {
        self.entries().len()
    }

    /// Number of dispatched executions that have not been reaped yet.
    pub fn in_flight(&self) -> usize {
        self.executions().len()
    }

    /// Act on every resolved record that still has a waiting client.
    ///
    /// Both lists are read before any entry is taken, so a store failure
    /// leaves every entry in place for the next pass. Approved statements
    /// are dispatched without waiting for them to finish.
    pub async fn poll_once(&self) -> Result<PollSummary, StoreError> {
        let approved = self.store.list_by_status(QueryStatus::Approved).await?;
        // Without notification, rejected entries stay put and the client keeps waiting.
        let rejected = if self.config.notify_on_reject {
            self.store.list_by_status(QueryStatus::Rejected).await?
        } else {
            Vec::new()
        };

        self.reap_executions();
        let mut summary = PollSummary::default();

        for record in approved {
            let Some(entry) = self.take(&record.id) else {
                continue;
            };
            summary.executed += 1;
            self.dispatch(entry);
        }

        for record in rejected {
            let Some(entry) = self.take(&record.id) else {
                continue;
            };
            summary.rejected += 1;

            let reason = record
                .rejection_reason
                .as_deref()
                .unwrap_or("No reason provided");
            notify_rejection(&entry, reason).await;
        }

        Ok(summary)
    }

    fn dispatch(&self, entry: PendingExecution) {
        tracing::debug!(query_id = %entry.query_id, "Dispatching approved query");
        let executor = self.executor.clone();
        self.executions().spawn(async move {
            execute_and_notify(
                executor.as_ref(),
                entry.query_id,
                &entry.query,
                &entry.connection,
            )
            .await;
        });
    }

    /// Collect finished executions without waiting on running ones.
    fn reap_executions(&self) {
        let mut executions = self.executions();
        while let Some(joined) = executions.try_join_next() {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Execution task failed");
            }
        }
    }

    /// Wait up to `grace` for dispatched executions, then abort the rest.
    ///
    /// Returns the number of executions that were aborted.
    pub async fn drain(&self, grace: Duration) -> usize {
        let mut executions = std::mem::take(&mut *self.executions());

        let finished = tokio::time::timeout(grace, async {
            while let Some(joined) = executions.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Execution task failed");
                }
            }
        })
        .await;

        if finished.is_ok() {
            return 0;
        }

        let abandoned = executions.len();
        tracing::warn!(abandoned, "Aborting executions still running at shutdown");
        executions.shutdown().await;
        abandoned
    }

    /// Poll until shutdown is signalled.
    ///
    /// Polls on a fixed interval and additionally whenever the store reports
    /// a status change for a tracked query.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut changes = self.store.subscribe();
        let mut changes_open = true;

        tracing::info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "Approval coordinator started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                change = changes.recv(), if changes_open => match change {
                    Ok(change) if !self.is_tracking(&change.id) => continue,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Status notifications lagged, polling");
                    }
                    Err(RecvError::Closed) => {
                        changes_open = false;
                        continue;
                    }
                },
                _ = shutdown.changed() => break,
            }

            match self.poll_once().await {
                Ok(summary) if summary != PollSummary::default() => {
                    tracing::debug!(
                        executed = summary.executed,
                        rejected = summary.rejected,
                        "Processed resolved queries"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Failed to poll query store"),
            }
        }

        self.drain(self.config.shutdown_grace()).await;
        tracing::info!(
            waiting = self.pending_count(),
            "Approval coordinator stopped"
        );
    }
}

async fn notify_rejection(entry: &PendingExecution, reason: &str) {
    let Some(conn) = entry.connection.upgrade() else {
        return;
    };
    let message = format!("Query rejected: {}", reason);
    match conn.send_error(&message).await {
        Ok(Delivery::Written) => {
            tracing::info!(query_id = %entry.query_id, session = conn.id(), "Client notified of rejection");
        }
        Ok(Delivery::Discarded) => {}
        Err(e) => {
            tracing::warn!(query_id = %entry.query_id, error = %e, "Failed to notify client of rejection");
        }
    }
}
