//! Error types for devbox-core
//!
//! Every failure raised by the registries and the supervisor maps onto a
//! small taxonomy ([`ErrorKind`]) and a stable machine-readable code, so
//! callers can tell "fix the request" apart from "retry" and "give up".

use serde::Serialize;
use thiserror::Error;

/// Error category used by outer layers to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed input
    Validation,
    /// Unknown session or process id, or missing directory
    NotFound,
    /// Operation requires an active target but it is terminal
    Conflict,
    /// Subprocess spawn, pipe or signal failure
    Operational,
    /// Deadline exceeded
    Timeout,
    /// Unexpected failure
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Operational => write!(f, "operational"),
            Self::Timeout => write!(f, "timeout"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Request failed validation
    #[error("invalid request: {0}")]
    Validation(String),

    /// Session id is not registered
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Process id is not registered
    #[error("process not found: {0}")]
    ProcessNotFound(String),

    /// Working directory does not exist or is not a directory
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Session exists but is no longer active
    #[error("session {0} is not active")]
    SessionNotActive(String),

    /// Process exists but has already finished
    #[error("process {0} is not running")]
    ProcessNotRunning(String),

    /// Subprocess could not be started
    #[error("failed to spawn {command}: {message}")]
    Spawn {
        /// Program that failed to start
        command: String,
        /// OS error description
        message: String,
    },

    /// Writing to a shell's input pipe failed
    #[error("failed to write to session {session_id}: {message}")]
    PipeWrite {
        /// Session whose pipe failed
        session_id: String,
        /// OS error description
        message: String,
    },

    /// Signal delivery failed
    #[error("failed to signal pid {pid}: {message}")]
    Signal {
        /// Target OS process id
        pid: u32,
        /// OS error description
        message: String,
    },

    /// Execution exceeded its deadline
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Category of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::SessionNotFound(_) | Self::ProcessNotFound(_) | Self::DirectoryNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::SessionNotActive(_) | Self::ProcessNotRunning(_) => ErrorKind::Conflict,
            Self::Spawn { .. } | Self::Signal { .. } => ErrorKind::Operational,
            Self::Timeout(_) => ErrorKind::Timeout,
            // a failed stdin write means the shell is gone underneath a live record
            Self::PipeWrite { .. } | Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "INVALID_REQUEST",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::ProcessNotFound(_) => "PROCESS_NOT_FOUND",
            Self::DirectoryNotFound(_) => "DIRECTORY_NOT_FOUND",
            Self::SessionNotActive(_) => "SESSION_NOT_ACTIVE",
            Self::ProcessNotRunning(_) => "PROCESS_NOT_RUNNING",
            Self::Spawn { .. } => "SPAWN_FAILED",
            Self::PipeWrite { .. } => "PIPE_WRITE_FAILED",
            Self::Signal { .. } => "SIGNAL_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::Io(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the same request may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Operational | ErrorKind::Timeout)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::SessionNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            Error::DirectoryNotFound("/nope".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            Error::SessionNotActive("x".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(Error::Timeout(100).kind(), ErrorKind::Timeout);
        assert_eq!(
            Error::Spawn {
                command: "nope".into(),
                message: "No such file".into()
            }
            .kind(),
            ErrorKind::Operational
        );
        assert_eq!(
            Error::PipeWrite {
                session_id: "x".into(),
                message: "broken pipe".into()
            }
            .kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_codes_are_distinct_per_category() {
        assert_eq!(Error::Validation("empty".into()).code(), "INVALID_REQUEST");
        assert_eq!(Error::ProcessNotFound("p".into()).code(), "PROCESS_NOT_FOUND");
        assert_ne!(
            Error::SessionNotFound("s".into()).code(),
            Error::SessionNotActive("s".into()).code()
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::Timeout(100).to_string(), "timed out after 100ms");
        assert_eq!(
            Error::SessionNotActive("abc".into()).to_string(),
            "session abc is not active"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(Error::Timeout(5).is_retryable());
        assert!(!Error::Validation("x".into()).is_retryable());
        assert!(!Error::SessionNotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: Error = io.into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
