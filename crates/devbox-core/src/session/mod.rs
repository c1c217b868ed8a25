//! Interactive shell sessions
//!
//! A session is a long-lived shell fed through its stdin pipe. Its stdout and
//! stderr are drained into a bounded log buffer and published live.
//!
//! Status transitions are forward-only:
//! `active -> completed` (clean exit), `active -> failed` (error exit),
//! `active -> terminated` (terminate request). All three are terminal.

mod handle;
mod manager;
mod supervisor;
mod types;


pub use manager::SessionManager;
pub use types::{CreateSessionRequest, SessionExecResult, SessionInfo, SessionLogs, SessionStatus};
