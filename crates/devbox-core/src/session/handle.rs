//! Live session record

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::sync::{watch, Mutex, Notify, RwLock};
use tokio_util::sync::CancellationToken;

use super::types::{SessionInfo, SessionStatus};
use crate::error::{Error, Result};
use crate::logs::LogBuffer;

/// Mutable fields updated by request handlers
pub(crate) struct SessionState {
    pub(crate) working_dir: PathBuf,
    pub(crate) env: HashMap<String, String>,
    pub(crate) last_used_at: DateTime<Utc>,
}

/// A registered shell session.
///
/// The exit monitor owns the only `watch::Sender` for `exit_status`, so it is
/// the single writer of the exit-derived terminal status. Terminate only
/// raises `termination_requested`; [`Session::status`] reports `terminated`
/// for a requested shutdown until the monitor confirms the exit.
pub(crate) struct Session {
    pub(crate) id: String,
    pub(crate) shell: String,
    pub(crate) pid: Option<u32>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) state: RwLock<SessionState>,
    pub(crate) stdin: Mutex<Option<ChildStdin>>,
    pub(crate) active: AtomicBool,
    pub(crate) termination_requested: AtomicBool,
    pub(crate) exit_status: watch::Receiver<SessionStatus>,
    pub(crate) kill_switch: Notify,
    pub(crate) cancel: CancellationToken,
    pub(crate) logs: Arc<LogBuffer>,
}

impl Session {
    /// Status as seen by readers
    pub(crate) fn status(&self) -> SessionStatus {
        let observed = *self.exit_status.borrow();
        if observed == SessionStatus::Active && self.termination_requested.load(Ordering::SeqCst) {
            SessionStatus::Terminated
        } else {
            observed
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.status() == SessionStatus::Active
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::SessionNotActive(self.id.clone()))
        }
    }

    /// Whether the monitor has observed the shell's exit
    pub(crate) fn has_exited(&self) -> bool {
        self.exit_status.borrow().is_terminal()
    }

    /// Wait until the monitor observes exit. Returns false on timeout.
    pub(crate) async fn wait_for_exit(&self, limit: Duration) -> bool {
        let mut rx = self.exit_status.clone();
        let waited = tokio::time::timeout(limit, rx.wait_for(|status| status.is_terminal()))
            .await
            .is_ok();
        waited
    }

    /// Write one line to the shell's input pipe
    pub(crate) async fn write_line(&self, line: &str) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        let pipe = stdin
            .as_mut()
            .ok_or_else(|| Error::SessionNotActive(self.id.clone()))?;

        let mut payload = String::with_capacity(line.len() + 1);
        payload.push_str(line);
        payload.push('\n');

        let written = match pipe.write_all(payload.as_bytes()).await {
            Ok(()) => pipe.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| Error::PipeWrite {
            session_id: self.id.clone(),
            message: e.to_string(),
        })
    }

    /// Close the input pipe; later writes report the session as inactive
    pub(crate) async fn close_stdin(&self) {
        if let Some(mut pipe) = self.stdin.lock().await.take() {
            let _ = pipe.shutdown().await;
        }
    }

    /// Bump last-used-at, never moving it backwards
    pub(crate) async fn touch(&self) {
        let now = Utc::now();
        let mut state = self.state.write().await;
        if now > state.last_used_at {
            state.last_used_at = now;
        }
    }

    pub(crate) async fn last_used_at(&self) -> DateTime<Utc> {
        self.state.read().await.last_used_at
    }

    pub(crate) async fn info(&self) -> SessionInfo {
        let state = self.state.read().await;
        SessionInfo {
            id: self.id.clone(),
            shell: self.shell.clone(),
            working_dir: state.working_dir.display().to_string(),
            env: state.env.clone(),
            status: self.status(),
            active: self.is_active(),
            pid: self.pid,
            created_at: self.created_at,
            last_used_at: state.last_used_at,
        }
    }
}
