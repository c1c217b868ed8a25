//! Server configuration types
//!
//! Contains all configuration structures for the Devbox server.

use devbox_core::{config as engine, SupervisorConfig};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub supervisor: SupervisorSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9757,
        }
    }
}

/// Supervision engine settings (exposed to TOML)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// Shell for sessions that do not name one
    #[serde(default = "default_shell")]
    pub default_shell: String,
    /// Raw lines and entries kept per session or process
    #[serde(default = "default_log_buffer_capacity")]
    pub log_buffer_capacity: usize,
    /// Seconds between SIGTERM and SIGKILL on terminate
    #[serde(default = "default_terminate_grace_secs")]
    pub terminate_grace_secs: u64,
    /// Seconds a terminated session stays queryable
    #[serde(default = "default_removal_delay_secs")]
    pub removal_delay_secs: u64,
    /// Seconds between sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Idle seconds before a finished target is reclaimed
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Replay tail when a subscriber does not ask for one
    #[serde(default = "default_tail")]
    pub default_tail: usize,
}

fn default_shell() -> String {
    engine::DEFAULT_SHELL.to_string()
}
fn default_log_buffer_capacity() -> usize {
    engine::DEFAULT_LOG_BUFFER_CAPACITY
}
fn default_terminate_grace_secs() -> u64 {
    engine::DEFAULT_TERMINATE_GRACE_SECS
}
fn default_removal_delay_secs() -> u64 {
    engine::DEFAULT_REMOVAL_DELAY_SECS
}
fn default_sweep_interval_secs() -> u64 {
    engine::DEFAULT_SWEEP_INTERVAL_SECS
}
fn default_retention_secs() -> u64 {
    engine::DEFAULT_RETENTION_SECS
}
fn default_tail() -> usize {
    engine::DEFAULT_TAIL
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            default_shell: default_shell(),
            log_buffer_capacity: default_log_buffer_capacity(),
            terminate_grace_secs: default_terminate_grace_secs(),
            removal_delay_secs: default_removal_delay_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            retention_secs: default_retention_secs(),
            default_tail: default_tail(),
        }
    }
}

impl SupervisorSettings {
    /// Engine configuration for these settings
    pub fn to_supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig::default()
            .with_default_shell(self.default_shell.clone())
            .with_log_buffer_capacity(self.log_buffer_capacity)
            .with_terminate_grace(self.terminate_grace_secs)
            .with_removal_delay(self.removal_delay_secs)
            .with_sweep_interval(self.sweep_interval_secs)
            .with_retention(self.retention_secs)
            .with_default_tail(self.default_tail)
    }
}

/// Service log output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
    /// Directory for daily-rolling log files
    #[serde(default)]
    pub file: Option<String>,
}

fn default_filter() -> String {
    "devbox=info,devbox_core=info,tower_http=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine() {
        let config = AppConfig::default().supervisor.to_supervisor_config();
        assert_eq!(config.default_shell, "/bin/sh");
        assert_eq!(config.log_buffer_capacity, 1000);
        assert_eq!(config.terminate_grace_secs, 5);
        assert_eq!(config.default_tail, 100);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [supervisor]
            terminate_grace_secs = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.supervisor.terminate_grace_secs, 2);
        assert_eq!(config.supervisor.retention_secs, 1800);
        assert!(!config.logging.json);
    }
}
