//! Session data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::logs::LogEntry;

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Shell is running and accepts input
    Active,
    /// Stopped on request
    Terminated,
    /// Shell exited with a non-zero status or could not be waited on
    Failed,
    /// Shell exited cleanly
    Completed,
}

impl SessionStatus {
    /// No transition leaves a terminal status
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Terminated => write!(f, "terminated"),
            Self::Failed => write!(f, "failed"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Parameters for creating a session; empty fields take defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Shell executable
    #[serde(default)]
    pub shell: Option<String>,
    /// Initial working directory
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Environment overrides on top of the host environment
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl CreateSessionRequest {
    /// Request with every field defaulted
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this shell
    pub fn shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    /// Start in this directory
    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment override
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session id
    pub id: String,
    /// Shell executable
    pub shell: String,
    /// Recorded working directory
    pub working_dir: String,
    /// Recorded environment
    pub env: HashMap<String, String>,
    /// Lifecycle status
    pub status: SessionStatus,
    /// Accepting input
    pub active: bool,
    /// Shell OS process id
    pub pid: Option<u32>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutating operation
    pub last_used_at: DateTime<Utc>,
}

/// Outcome of writing a command into a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExecResult {
    /// Session id
    pub session_id: String,
    /// Command as written
    pub command: String,
    /// Always empty: output flows into the session log stream
    pub stdout: String,
    /// Always empty: output flows into the session log stream
    pub stderr: String,
}

/// Log window of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLogs {
    /// Session id
    pub session_id: String,
    /// Raw lines, oldest first
    pub lines: Vec<String>,
    /// Structured entries, oldest first
    pub entries: Vec<LogEntry>,
}
