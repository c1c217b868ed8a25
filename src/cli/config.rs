//! CLI configuration inspection
//!
//! Provides `devbox config {show,get,defaults}`.

use crate::server::config::AppConfig;
use crate::server::DEFAULT_CONFIG;
use anyhow::{Context, Result};
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective merged configuration
    Show,
    /// Get a specific setting value
    Get {
        /// Setting key (dot notation: supervisor.default_shell)
        key: String,
    },
    /// Print the built-in defaults
    Defaults,
}

/// Execute a config subcommand
pub fn run(command: ConfigCommands, config: &AppConfig) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let rendered =
                toml::to_string_pretty(config).context("Failed to serialize config")?;
            println!("{rendered}");
        }
        ConfigCommands::Get { key } => println!("{}", lookup(config, &key)?),
        ConfigCommands::Defaults => println!("{DEFAULT_CONFIG}"),
    }
    Ok(())
}

/// Resolve a dotted key against the effective configuration
fn lookup(config: &AppConfig, key: &str) -> Result<String> {
    let mut value = toml::Value::try_from(config).context("Failed to serialize config")?;
    for part in key.split('.') {
        value = value
            .get(part)
            .cloned()
            .with_context(|| format!("Unknown setting: {key}"))?;
    }
    Ok(match value {
        toml::Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_nested_value() {
        let config = AppConfig::default();
        assert_eq!(lookup(&config, "server.host").unwrap(), "127.0.0.1");
        assert_eq!(lookup(&config, "supervisor.terminate_grace_secs").unwrap(), "5");
    }

    #[test]
    fn test_lookup_unknown_key() {
        assert!(lookup(&AppConfig::default(), "server.nope").is_err());
    }
}
