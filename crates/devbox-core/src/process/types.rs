//! Process data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::logs::LogEntry;

/// Process lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// Still running
    Running,
    /// Exited on its own with an exit code
    Exited,
    /// Ended by a signal or a timeout
    Killed,
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Exited => write!(f, "exited"),
            Self::Killed => write!(f, "killed"),
        }
    }
}

/// How a process was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// Fire-and-forget, output streamed into the log model
    Async,
    /// Caller waits for exit, output captured
    Sync,
}

/// Parameters for a process execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecRequest {
    /// Program, or a shell command line when `args` is empty
    pub command: String,
    /// Program arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory, defaults to the service's own
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Environment overrides on top of the host environment
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Deadline in milliseconds; absent or zero means none
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ExecRequest {
    /// Request for `command`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run in this directory
    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment override
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Set a deadline in milliseconds
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

/// Point-in-time view of a process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Registry id
    pub id: String,
    /// OS process id
    pub pid: Option<u32>,
    /// Program or command line
    pub command: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub working_dir: String,
    /// Execution mode
    pub mode: ExecMode,
    /// Lifecycle status
    pub status: ProcessStatus,
    /// Exit code once exited
    pub exit_code: Option<i32>,
    /// Deadline in milliseconds
    pub timeout_ms: Option<u64>,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub ended_at: Option<DateTime<Utc>>,
}

/// Outcome of a synchronous execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Registry id
    pub id: String,
    /// OS process id
    pub pid: Option<u32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Exit code, -1 when ended by a signal
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Log window of a process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessLogs {
    /// Process id
    pub process_id: String,
    /// Raw lines, oldest first
    pub lines: Vec<String>,
    /// Structured entries, oldest first
    pub entries: Vec<LogEntry>,
}
