//! Log entry model shared by sessions and processes

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Severity / stream of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Subprocess standard output
    Stdout,
    /// Subprocess standard error
    Stderr,
    /// Supervisor bookkeeping
    System,
    /// Informational supervisor message
    Info,
    /// Supervisor-detected failure
    Error,
}

impl LogLevel {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::System => "system",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            "system" => Ok(Self::System),
            "info" => Ok(Self::Info),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Kind of target that produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Interactive shell session
    Session,
    /// Standalone process execution
    Process,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Session => write!(f, "session"),
            Self::Process => write!(f, "process"),
        }
    }
}

/// One structured, sequenced unit of output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Level
    pub level: LogLevel,
    /// Producer: `stdout`, `stderr`, `system` or `command`
    pub source: String,
    /// Session or process id
    pub target_id: String,
    /// Target kind
    pub target_type: TargetType,
    /// Strictly increasing per target, starting at 1
    pub sequence: u64,
    /// Line text without trailing newline
    pub message: String,
}

/// Level and start-time filter applied to replay and live delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Accepted levels; empty accepts every level
    pub levels: HashSet<LogLevel>,
    /// Only entries at or after this epoch-millisecond timestamp
    pub start_time: Option<i64>,
}

impl LogFilter {
    /// Filter that accepts everything
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to the given levels
    #[must_use]
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = LogLevel>) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    /// Restrict to entries at or after `start_time`
    #[must_use]
    pub fn since(mut self, start_time: i64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Whether `entry` passes the filter
    #[must_use]
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if !self.levels.is_empty() && !self.levels.contains(&entry.level) {
            return false;
        }
        match self.start_time {
            Some(start) => entry.timestamp >= start,
            None => true,
        }
    }
}
