//! CLI module for Devbox
//!
//! Provides commands:
//! - `serve`: Run the HTTP and WebSocket server (default)
//! - `config`: Inspect the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod config;

use crate::server::config::AppConfig;
use config::ConfigCommands;

/// Devbox process supervisor CLI
#[derive(Parser, Debug)]
#[command(name = "devbox")]
#[command(about = "Shell session and process supervisor with live log streaming")]
#[command(version)]
pub struct Cli {
    /// Configuration file layered over the defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,
        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Run the CLI command
pub async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Config(command)) => config::run(command, &config),
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            crate::server::run(config).await
        }
        None => crate::server::run(config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["devbox", "serve", "--host", "0.0.0.0", "-p", "8080"]);
        match cli.command {
            Some(Commands::Serve { host, port }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_defaults_to_serve() {
        let cli = Cli::parse_from(["devbox", "--config", "custom.toml"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_parse_config_get() {
        let cli = Cli::parse_from(["devbox", "config", "get", "server.port"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config(ConfigCommands::Get { .. }))
        ));
    }
}
