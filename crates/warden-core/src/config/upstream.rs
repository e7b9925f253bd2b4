//! Upstream database configuration types.
//!
//! The proxy talks to the backend in two ways: raw byte forwarding for every
//! client connection (only `host`/`port` matter), and a dedicated connection
//! opened with the executor's own credentials whenever an approved statement
//! runs. The executor URL is resolved in this order:
//! 1. `database_url_env` - reference an environment variable
//! 2. `database_url` - provide the URL directly
//! 3. Individual fields (database, username, password / password_env)

use serde::{Deserialize, Serialize};

/// Address of the backend Postgres server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Hostname of the upstream Postgres server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the upstream Postgres server.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl UpstreamConfig {
    /// The `host:port` string used to dial the backend.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Credentials used to execute approved statements.
///
/// These are deliberately separate from whatever the original client used to
/// authenticate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Environment variable name containing the PostgreSQL connection URL.
    /// Highest precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url_env: Option<String>,

    /// Full PostgreSQL connection URL.
    /// Second precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Database name to connect to.
    #[serde(default = "default_database")]
    pub database: String,

    /// Username for the execution connection.
    #[serde(default = "default_username")]
    pub username: String,

    /// Password for the execution connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Seconds to wait for the execution connection to be established.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Seconds an approved statement may run before it is cancelled.
    /// Zero disables the limit.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            database_url_env: None,
            database_url: None,
            database: default_database(),
            username: default_username(),
            password: None,
            password_env: None,
            connect_timeout_secs: default_connect_timeout(),
            statement_timeout_secs: default_statement_timeout(),
        }
    }
}

impl ExecutorConfig {
    /// Build a PostgreSQL connection string for the given upstream.
    pub fn connection_string(&self, upstream: &UpstreamConfig) -> String {
        // Method 1: Environment variable with connection URL
        if let Some(env_var) = &self.database_url_env
            && let Ok(url) = std::env::var(env_var)
        {
            return url;
        }

        // Method 2: Direct URL
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        // Method 3: Individual fields
        match self.get_password() {
            Some(password) => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.username, password, upstream.host, upstream.port, self.database
            ),
            None => format!(
                "postgresql://{}@{}:{}/{}",
                self.username, upstream.host, upstream.port, self.database
            ),
        }
    }

    /// Get the password, checking password_env first.
    fn get_password(&self) -> Option<String> {
        if let Some(env_var) = &self.password_env
            && let Ok(password) = std::env::var(env_var)
        {
            return Some(password);
        }
        self.password.clone()
    }

    /// Check if this configuration uses environment variables.
    pub fn uses_env_credentials(&self) -> bool {
        self.database_url_env.is_some() || self.password_env.is_some()
    }
}

// Default value functions
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5433
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_username() -> String {
    "postgres".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_statement_timeout() -> u64 {
    300
}
