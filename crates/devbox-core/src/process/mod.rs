//! Non-interactive process executions
//!
//! Async executions return immediately and stream output into the same log
//! model as sessions. Sync executions block until exit or timeout and return
//! captured output.

mod manager;
mod types;


pub use manager::ProcessManager;
pub use types::{ExecMode, ExecRequest, ProcessInfo, ProcessLogs, ProcessResult, ProcessStatus};
