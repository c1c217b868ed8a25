//! Engine configuration

use std::time::Duration;

/// Default shell for new sessions and shell-form process commands
pub const DEFAULT_SHELL: &str = "/bin/sh";
/// Maximum raw lines and structured entries kept per target
pub const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
/// Grace period between SIGTERM and SIGKILL on session terminate
pub const DEFAULT_TERMINATE_GRACE_SECS: u64 = 5;
/// Delay before a terminated session leaves the registry
pub const DEFAULT_REMOVAL_DELAY_SECS: u64 = 60;
/// Sweeper interval
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
/// Idle time after which terminal sessions are reclaimed
pub const DEFAULT_RETENTION_SECS: u64 = 1800;
/// Replay window when a subscriber does not ask for one
pub const DEFAULT_TAIL: usize = 100;

/// Supervisor configuration
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Shell used when a create request omits one
    pub default_shell: String,
    /// Bound on each per-target log buffer
    pub log_buffer_capacity: usize,
    /// Terminate grace period in seconds
    pub terminate_grace_secs: u64,
    /// Registry retention after terminate in seconds
    pub removal_delay_secs: u64,
    /// Sweeper interval in seconds
    pub sweep_interval_secs: u64,
    /// Idle retention window in seconds
    pub retention_secs: u64,
    /// Default replay tail
    pub default_tail: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            default_shell: DEFAULT_SHELL.to_string(),
            log_buffer_capacity: DEFAULT_LOG_BUFFER_CAPACITY,
            terminate_grace_secs: DEFAULT_TERMINATE_GRACE_SECS,
            removal_delay_secs: DEFAULT_REMOVAL_DELAY_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            retention_secs: DEFAULT_RETENTION_SECS,
            default_tail: DEFAULT_TAIL,
        }
    }
}

impl SupervisorConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set default shell
    pub fn with_default_shell(mut self, shell: impl Into<String>) -> Self {
        self.default_shell = shell.into();
        self
    }

    /// Set log buffer capacity
    pub fn with_log_buffer_capacity(mut self, capacity: usize) -> Self {
        self.log_buffer_capacity = capacity.max(1);
        self
    }

    /// Set terminate grace period
    pub fn with_terminate_grace(mut self, secs: u64) -> Self {
        self.terminate_grace_secs = secs;
        self
    }

    /// Set removal delay after terminate
    pub fn with_removal_delay(mut self, secs: u64) -> Self {
        self.removal_delay_secs = secs;
        self
    }

    /// Set sweep interval
    pub fn with_sweep_interval(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    /// Set retention window
    pub fn with_retention(mut self, secs: u64) -> Self {
        self.retention_secs = secs;
        self
    }

    /// Set default replay tail
    pub fn with_default_tail(mut self, tail: usize) -> Self {
        self.default_tail = tail;
        self
    }

    pub(crate) fn terminate_grace(&self) -> Duration {
        Duration::from_secs(self.terminate_grace_secs)
    }

    pub(crate) fn removal_delay(&self) -> Duration {
        Duration::from_secs(self.removal_delay_secs)
    }

    pub(crate) fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub(crate) fn retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.retention_secs).unwrap_or(i64::MAX))
    }
}
