//! Admin API configuration.
//!
//! This module defines configuration for the HTTP surface reviewers use to
//! approve or reject queued statements.

use serde::{Deserialize, Serialize};

/// Configuration for the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Whether the admin API is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Host to bind the admin API to.
    #[serde(default = "default_host")]
    pub listen_addr: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub listen_port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            listen_addr: default_host(),
            listen_port: default_port(),
        }
    }
}

impl AdminConfig {
    /// The `host:port` string the admin API binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}
