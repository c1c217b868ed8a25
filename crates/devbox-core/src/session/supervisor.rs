//! Shell Supervisor
//!
//! Spawns a session's shell with piped stdio and launches its three
//! background workers: a stdout drain, a stderr drain and the exit monitor.

use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::handle::{Session, SessionState};
use super::types::SessionStatus;
use crate::error::{Error, Result};
use crate::logs::{LogBuffer, LogLevel};
use crate::output::{await_drains, describe_exit, drain_lines};

/// How long the exit monitor waits for the drain workers to reach EOF
const DRAIN_WAIT: Duration = Duration::from_secs(1);

/// Everything needed to start one shell
pub(crate) struct ShellSpec<'a> {
    pub(crate) id: String,
    pub(crate) shell: String,
    pub(crate) working_dir: &'a Path,
    pub(crate) env: HashMap<String, String>,
    pub(crate) logs: Arc<LogBuffer>,
}

/// Spawn the shell and start its workers. Nothing is left running on error.
pub(crate) fn launch(spec: ShellSpec<'_>) -> Result<Arc<Session>> {
    let mut command = Command::new(&spec.shell);
    command
        .current_dir(spec.working_dir)
        .env_clear()
        .envs(&spec.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| Error::Spawn {
        command: spec.shell.clone(),
        message: e.to_string(),
    })?;

    let (Some(stdin), Some(stdout), Some(stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        let _ = child.start_kill();
        return Err(Error::Internal(format!(
            "shell {} started without piped stdio",
            spec.shell
        )));
    };

    let now = Utc::now();
    let (status_tx, status_rx) = watch::channel(SessionStatus::Active);
    let session = Arc::new(Session {
        id: spec.id,
        shell: spec.shell,
        pid: child.id(),
        created_at: now,
        state: RwLock::new(SessionState {
            working_dir: spec.working_dir.to_path_buf(),
            env: spec.env,
            last_used_at: now,
        }),
        stdin: Mutex::new(Some(stdin)),
        active: AtomicBool::new(true),
        termination_requested: AtomicBool::new(false),
        exit_status: status_rx,
        kill_switch: Notify::new(),
        cancel: CancellationToken::new(),
        logs: spec.logs,
    });

    let drains = vec![
        tokio::spawn(drain_lines(
            stdout,
            LogLevel::Stdout,
            session.logs.clone(),
            session.cancel.clone(),
        )),
        tokio::spawn(drain_lines(
            stderr,
            LogLevel::Stderr,
            session.logs.clone(),
            session.cancel.clone(),
        )),
    ];
    tokio::spawn(monitor_exit(child, session.clone(), status_tx, drains));

    debug!(session_id = %session.id, pid = ?session.pid, "Shell workers started");
    Ok(session)
}

/// Exit monitor: waits for the shell, records the outcome and publishes the
/// terminal status. Owning `status_tx` makes this the only writer of it.
async fn monitor_exit(
    mut child: Child,
    session: Arc<Session>,
    status_tx: watch::Sender<SessionStatus>,
    drains: Vec<JoinHandle<()>>,
) {
    let waited = tokio::select! {
        status = child.wait() => status,
        _ = session.kill_switch.notified() => {
            if let Err(e) = child.start_kill() {
                warn!(session_id = %session.id, error = %e, "Force kill failed");
            }
            child.wait().await
        }
    };

    if !await_drains(drains, DRAIN_WAIT).await {
        debug!(session_id = %session.id, "Output still open after shell exit");
    }

    let requested = session.termination_requested.load(Ordering::SeqCst);
    let status = match &waited {
        Ok(exit) => {
            let description = describe_exit(exit);
            if requested {
                session
                    .logs
                    .append(
                        LogLevel::Info,
                        "system",
                        format!("session terminated ({description})"),
                    )
                    .await;
                SessionStatus::Terminated
            } else if exit.success() {
                session
                    .logs
                    .append(
                        LogLevel::Info,
                        "system",
                        format!("shell exited ({description})"),
                    )
                    .await;
                SessionStatus::Completed
            } else {
                session
                    .logs
                    .append(
                        LogLevel::Error,
                        "system",
                        format!("shell exited with failure ({description})"),
                    )
                    .await;
                SessionStatus::Failed
            }
        }
        Err(e) => {
            session
                .logs
                .append(
                    LogLevel::Error,
                    "system",
                    format!("failed to wait for shell: {e}"),
                )
                .await;
            if requested {
                SessionStatus::Terminated
            } else {
                SessionStatus::Failed
            }
        }
    };

    session.active.store(false, Ordering::SeqCst);
    status_tx.send_replace(status);
    info!(session_id = %session.id, status = %status, "Session shell exited");
}
