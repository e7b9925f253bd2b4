//! # warden-core
//!
//! Shared types for the Warden approval proxy.
//!
//! This crate holds the query record model that flows between the proxy, the
//! record store and the admin API, plus the configuration types loaded from
//! `warden.yaml`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// Configuration types shared across all Warden crates
pub mod config;

pub use config::{
    AdminConfig, ApprovalsConfig, ClassifierConfig, ConfigError, ExecutorConfig, ProxyConfig,
    StoreBackend, StoreConfig, UpstreamConfig, WardenConfig,
};

/// Lifecycle status of an intercepted query.
///
/// `Pending` moves to exactly one of the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// Waiting for a reviewer.
    Pending,
    /// Approved; the proxy will execute it on behalf of the client.
    Approved,
    /// Rejected by a reviewer.
    Rejected,
}

impl QueryStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [QueryStatus; 3] = [
        QueryStatus::Pending,
        QueryStatus::Approved,
        QueryStatus::Rejected,
    ];

    /// Whether no further transition is allowed from this status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, QueryStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Pending => "pending",
            QueryStatus::Approved => "approved",
            QueryStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(QueryStatus::Pending),
            "approved" => Ok(QueryStatus::Approved),
            "rejected" => Ok(QueryStatus::Rejected),
            other => Err(format!("unknown query status '{}'", other)),
        }
    }
}

/// Network identity of the client that submitted a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Remote IP address, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
    /// Remote TCP port, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<u16>,
}

impl ClientInfo {
    /// Build client info from a socket address.
    pub fn from_socket_addr(addr: std::net::SocketAddr) -> Self {
        Self {
            remote_address: Some(addr.ip().to_string()),
            remote_port: Some(addr.port()),
        }
    }
}

impl fmt::Display for ClientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.remote_address, self.remote_port) {
            (Some(addr), Some(port)) => write!(f, "{}:{}", addr, port),
            (Some(addr), None) => f.write_str(addr),
            _ => f.write_str("unknown"),
        }
    }
}

/// A dangerous statement withheld from the backend pending review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Unique query ID.
    pub id: Uuid,
    /// Statement text as received from the client (trimmed).
    pub query: String,
    /// Label identifying who submitted the statement.
    pub submitter: String,
    /// Client connection details.
    #[serde(default)]
    pub client_info: ClientInfo,
    /// Current status.
    pub status: QueryStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Reviewer supplied reason for a rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl QueryRecord {
    /// Create a new pending record.
    pub fn new(
        id: Uuid,
        query: impl Into<String>,
        submitter: impl Into<String>,
        client_info: ClientInfo,
    ) -> Self {
        Self {
            id,
            query: query.into(),
            submitter: submitter.into(),
            client_info,
            status: QueryStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            rejection_reason: None,
        }
    }

    /// Check if the record is still waiting for review.
    pub fn is_pending(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    /// Apply a status transition to this record.
    ///
    /// Callers are responsible for checking that the record is still pending.
    pub fn apply(&mut self, transition: &StatusTransition) {
        self.status = transition.status;
        self.resolved_at = Some(transition.at);
        if transition.status == QueryStatus::Rejected {
            self.rejection_reason = transition.reason.clone();
        }
    }
}

/// Fields carried by a status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    /// Target status.
    pub status: QueryStatus,
    /// When the decision was taken.
    pub at: DateTime<Utc>,
    /// Rejection reason, ignored for approvals.
    pub reason: Option<String>,
}

impl StatusTransition {
    /// An approval stamped with the current time.
    pub fn approve() -> Self {
        Self {
            status: QueryStatus::Approved,
            at: Utc::now(),
            reason: None,
        }
    }

    /// A rejection stamped with the current time.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            status: QueryStatus::Rejected,
            at: Utc::now(),
            reason: Some(reason.into()),
        }
    }
}
