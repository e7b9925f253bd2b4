//! Approval workflow and classification settings.

use serde::{Deserialize, Serialize};

/// Configuration for the approval coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalsConfig {
    /// How often the store is polled for resolved queries, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Label recorded as the submitter of intercepted queries.
    #[serde(default = "default_submitter_label")]
    pub submitter_label: String,

    /// Send an Error frame to the waiting client when its query is rejected.
    #[serde(default = "default_true")]
    pub notify_on_reject: bool,

    /// How long shutdown waits for in-flight executions, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for ApprovalsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            submitter_label: default_submitter_label(),
            notify_on_reject: true,
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl ApprovalsConfig {
    /// The poll interval as a `Duration`.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    /// The shutdown grace period as a `Duration`.
    pub fn shutdown_grace(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Extra classification rules appended after the built-in table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Additional regular expressions, matched against the upper-cased,
    /// trimmed statement text.
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

fn default_submitter_label() -> String {
    "developer".to_string()
}

fn default_true() -> bool {
    true
}
