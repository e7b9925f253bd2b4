//! Configuration types for the Warden approval proxy.
//!
//! Configuration is loaded from a single YAML file (`warden.yaml` by default).
//! Every field has a default, so an empty file yields a working local setup:
//! proxy on `0.0.0.0:5432`, backend at `localhost:5433`, admin API on
//! `127.0.0.1:3001`, records under `data/queries`.

pub mod admin;
pub mod approvals;
pub mod proxy;
pub mod store;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use admin::AdminConfig;
pub use approvals::{ApprovalsConfig, ClassifierConfig};
pub use proxy::ProxyConfig;
pub use store::{StoreBackend, StoreConfig};
pub use upstream::{ExecutorConfig, UpstreamConfig};

/// Complete Warden configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Proxy listener settings.
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Backend Postgres address.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Credentials for executing approved statements.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Approval workflow settings.
    #[serde(default)]
    pub approvals: ApprovalsConfig,

    /// Query record store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Admin API settings.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Classification rule additions.
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WardenConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    ///
    /// An empty document is accepted and produces the defaults.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Serialize the effective configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::from)
    }

    /// Reject settings the proxy cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.approvals.poll_interval_ms == 0 {
            return Err(ConfigError::Config(
                "approvals.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.proxy.max_message_size < 8 {
            return Err(ConfigError::Config(
                "proxy.max_message_size must be at least 8 bytes".to_string(),
            ));
        }
        for pattern in &self.classifier.extra_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                ConfigError::Config(format!("invalid classifier pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        let config = WardenConfig::from_yaml("").unwrap();
        assert_eq!(config.proxy.listen_port, 5432);
        assert_eq!(config.upstream.port, 5433);
        assert_eq!(config.admin.listen_port, 3001);
        assert_eq!(config.approvals.poll_interval_ms, 1000);
        assert_eq!(config.store.backend, StoreBackend::File);
        config.validate().unwrap();
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
proxy:
  listen_port: 6432
  max_message_size: 1048576
upstream:
  host: db.internal
  port: 5432
executor:
  database: testdb
  username: testuser
  password_env: WARDEN_EXEC_PASSWORD
  statement_timeout_secs: 30
approvals:
  poll_interval_ms: 250
  notify_on_reject: false
  shutdown_grace_ms: 1000
store:
  backend: memory
admin:
  enabled: false
classifier:
  extra_patterns:
    - "GRANT\\s+"
"#;
        let config = WardenConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.proxy.listen_port, 6432);
        assert_eq!(config.upstream.address(), "db.internal:5432");
        assert_eq!(config.executor.username, "testuser");
        assert_eq!(config.executor.statement_timeout_secs, 30);
        assert!(!config.approvals.notify_on_reject);
        assert_eq!(config.approvals.shutdown_grace(), std::time::Duration::from_secs(1));
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(!config.admin.enabled);
        assert_eq!(config.classifier.extra_patterns.len(), 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = WardenConfig::default();
        config.approvals.poll_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Config(_))));

        let mut config = WardenConfig::default();
        config.classifier.extra_patterns.push("(unclosed".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Config(_))));
    }

    #[test]
    fn test_yaml_round_trip_preserves_ports() {
        let mut config = WardenConfig::default();
        config.proxy.listen_port = 7000;
        let yaml = config.to_yaml().unwrap();
        let parsed = WardenConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.proxy.listen_port, 7000);
    }
}
