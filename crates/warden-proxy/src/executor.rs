//! Execution of approved statements.
//!
//! Approved statements run on a fresh backend connection opened with the
//! executor's own credentials, never the submitting client's. The outcome is
//! reported back to the client connection that submitted the statement, if
//! that connection is still open.

use crate::connection::{ClientConnection, Delivery};
use crate::error::ExecutorError;
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::str::FromStr;
use std::sync::Weak;
use std::time::Duration;
use uuid::Uuid;
use warden_core::{ExecutorConfig, UpstreamConfig};

/// Extra time allowed past the server-side statement timeout before the
/// connection is abandoned locally.
const STATEMENT_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Result of a successful execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub rows_affected: u64,
}

/// Runs approved statements against the backend.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Run one statement on a dedicated connection.
    async fn execute(&self, query: &str) -> Result<ExecutionOutcome, ExecutorError>;
}

/// Executor backed by a one-shot Postgres connection per statement.
pub struct PgStatementExecutor {
    connection_string: String,
    connect_timeout: Duration,
    statement_timeout: Option<Duration>,
}

impl PgStatementExecutor {
    pub fn new(connection_string: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            connection_string: connection_string.into(),
            connect_timeout,
            statement_timeout: None,
        }
    }

    /// Cancel statements that run longer than `timeout`. Zero disables the limit.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Build an executor from configuration.
    pub fn from_config(executor: &ExecutorConfig, upstream: &UpstreamConfig) -> Self {
        Self::new(
            executor.connection_string(upstream),
            Duration::from_secs(executor.connect_timeout_secs),
        )
        .with_statement_timeout(Duration::from_secs(executor.statement_timeout_secs))
    }

    /// Parse the connection string and attach the server-side statement timeout.
    fn connect_options(&self) -> Result<PgConnectOptions, ExecutorError> {
        let options = PgConnectOptions::from_str(&self.connection_string)
            .map_err(|e| ExecutorError::ConnectFailed(describe(&e)))?;
        Ok(match self.statement_timeout {
            Some(limit) => options.options([(
                "statement_timeout",
                format!("{}ms", limit.as_millis()),
            )]),
            None => options,
        })
    }

    async fn connect(&self) -> Result<PgConnection, ExecutorError> {
        let options = self.connect_options()?;
        match tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&options)).await
        {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(ExecutorError::ConnectFailed(describe(&e))),
            Err(_) => Err(ExecutorError::ConnectTimeout(self.connect_timeout.as_secs())),
        }
    }
}

#[async_trait]
impl StatementExecutor for PgStatementExecutor {
    async fn execute(&self, query: &str) -> Result<ExecutionOutcome, ExecutorError> {
        let mut conn = self.connect().await?;

        // Simple query protocol, so multi-statement text runs as submitted.
        let running = sqlx::Executor::execute(&mut conn, query);
        let result = match self.statement_timeout {
            Some(limit) => match tokio::time::timeout(limit + STATEMENT_TIMEOUT_SLACK, running).await {
                Ok(result) => result,
                // The connection is mid-statement; drop it rather than close it.
                Err(_) => return Err(ExecutorError::StatementTimeout(limit.as_secs())),
            },
            None => running.await,
        };

        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "Failed to close execution connection cleanly");
        }

        let done = result.map_err(|e| ExecutorError::Statement(describe(&e)))?;
        Ok(ExecutionOutcome {
            rows_affected: done.rows_affected(),
        })
    }
}

/// Prefer the backend's own message for database errors.
fn describe(error: &sqlx::Error) -> String {
    match error {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}

/// Notice text for a successful execution.
pub fn success_message(outcome: &ExecutionOutcome) -> String {
    format!(
        "Query executed successfully. Rows affected: {}",
        outcome.rows_affected
    )
}

/// Error text for a failed execution.
pub fn failure_message(error: &ExecutorError) -> String {
    format!("Query execution failed: {}", error)
}

/// Run an approved statement and report the outcome to its client.
///
/// The connection is upgraded only for the write itself; if the client is
/// gone or no longer open the outcome is logged and dropped.
pub async fn execute_and_notify(
    executor: &dyn StatementExecutor,
    query_id: Uuid,
    query: &str,
    connection: &Weak<ClientConnection>,
) -> Option<Delivery> {
    let result = executor.execute(query).await;

    let message = match &result {
        Ok(outcome) => {
            tracing::info!(
                query_id = %query_id,
                rows_affected = outcome.rows_affected,
                "Approved query executed"
            );
            Ok(success_message(outcome))
        }
        Err(e) => {
            tracing::error!(query_id = %query_id, error = %e, "Approved query failed");
            Err(failure_message(e))
        }
    };

    let Some(conn) = connection.upgrade() else {
        tracing::debug!(query_id = %query_id, "Client gone, discarding execution result");
        return None;
    };

    let delivery = match &message {
        Ok(text) => conn.send_notice(text).await,
        Err(text) => conn.send_error(text).await,
    };

    match delivery {
        Ok(Delivery::Discarded) => {
            tracing::debug!(
                query_id = %query_id,
                session = conn.id(),
                state = %conn.state(),
                "Client no longer open, discarding execution result"
            );
            Some(Delivery::Discarded)
        }
        Ok(Delivery::Written) => Some(Delivery::Written),
        Err(e) => {
            tracing::warn!(
                query_id = %query_id,
                session = conn.id(),
                error = %e,
                "Failed to deliver execution result"
            );
            None
        }
    }
}
