//! Devbox Core - Supervision Engine
//!
//! This crate owns the lifecycles of the shells and processes a devbox
//! service runs on behalf of remote callers:
//! - Sessions: long-lived shells fed through stdin, with working directory
//!   and environment tracking and a terminate escalation
//! - Processes: fire-and-forget or blocking executions with timeouts
//! - Logs: bounded, sequenced per-target log buffers
//! - Broadcast: replay-then-follow delivery of log entries to live connections
//! - Sweeper: periodic reclamation of idle terminal targets
//! - Shutdown: coordinated stop of background tasks and supervised work

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broadcast;
pub mod config;
pub mod environment;
pub mod error;
pub mod logs;
pub mod process;
pub mod runtime;
pub mod session;
pub mod shutdown;
pub mod signal;
pub mod sweeper;

mod output;

pub use broadcast::{
    Connection, ConnectionId, LogBroadcaster, LogDelivery, SubscribeOptions, Subscription,
    SubscriptionInfo,
};
pub use config::SupervisorConfig;
pub use error::{Error, ErrorKind, Result};
pub use logs::{LogBuffer, LogEntry, LogFilter, LogLevel, TargetType};
pub use process::{
    ExecMode, ExecRequest, ProcessInfo, ProcessLogs, ProcessManager, ProcessResult, ProcessStatus,
};
pub use runtime::{Runtime, SweepReport};
pub use session::{
    CreateSessionRequest, SessionExecResult, SessionInfo, SessionLogs, SessionManager,
    SessionStatus,
};
pub use shutdown::{shutdown_signal_with_controller, wait_for_shutdown_signal, ShutdownController};
pub use sweeper::spawn_sweeper;
