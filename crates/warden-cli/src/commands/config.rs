//! `warden config` - print the effective configuration.

use anyhow::Result;
use warden_core::WardenConfig;

pub fn run(config: &WardenConfig) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}
