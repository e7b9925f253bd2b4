//! CLI command implementations for Warden.

pub mod classify;
pub mod config;
pub mod serve;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use warden_core::WardenConfig;

/// Configuration file selection and command line overrides.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Path to the YAML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port the proxy listens on.
    #[arg(long, env = "WARDEN_LISTEN_PORT")]
    pub listen_port: Option<u16>,

    /// Backend Postgres host.
    #[arg(long, env = "WARDEN_UPSTREAM_HOST")]
    pub upstream_host: Option<String>,

    /// Backend Postgres port.
    #[arg(long, env = "WARDEN_UPSTREAM_PORT")]
    pub upstream_port: Option<u16>,

    /// Port the admin API listens on.
    #[arg(long, env = "WARDEN_ADMIN_PORT")]
    pub admin_port: Option<u16>,
}

impl ConfigArgs {
    /// Load the configuration file, apply overrides and validate the result.
    pub fn load(&self) -> Result<WardenConfig> {
        let mut config = match &self.config {
            Some(path) => WardenConfig::from_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?,
            None => WardenConfig::default(),
        };

        if let Some(port) = self.listen_port {
            config.proxy.listen_port = port;
        }
        if let Some(host) = &self.upstream_host {
            config.upstream.host = host.clone();
        }
        if let Some(port) = self.upstream_port {
            config.upstream.port = port;
        }
        if let Some(port) = self.admin_port {
            config.admin.listen_port = port;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}
