//! `warden classify` - check how a statement would be treated.

use anyhow::{Context, Result};
use warden_core::WardenConfig;
use warden_proxy::RuleSet;

/// Describe the classification of `sql` under the configured rules.
pub fn describe(sql: &str, config: &WardenConfig) -> Result<String> {
    let rules = RuleSet::builtin()
        .with_extra_patterns(&config.classifier.extra_patterns)
        .context("Invalid classifier pattern")?;

    Ok(match rules.matching_rule(sql) {
        Some(rule) => format!("DANGEROUS (rule: {})", rule.name),
        None => "SAFE".to_string(),
    })
}

pub fn run(sql: &str, config: &WardenConfig) -> Result<()> {
    println!("{}", describe(sql, config)?);
    Ok(())
}
