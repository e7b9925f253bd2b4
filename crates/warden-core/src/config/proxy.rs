//! Proxy configuration types.

use serde::{Deserialize, Serialize};

/// Configuration for the Postgres wire protocol proxy listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Port to listen on for incoming Postgres connections.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Largest single protocol message accepted from a client, in bytes.
    /// Anything larger is treated as malformed input.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Initial capacity of each per-connection receive buffer.
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
            max_message_size: default_max_message_size(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl ProxyConfig {
    /// The `host:port` string the proxy binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    5432
}

fn default_max_message_size() -> usize {
    16 * 1024 * 1024
}

fn default_read_buffer_size() -> usize {
    8 * 1024
}
