//! Session Registry

use chrono::{DateTime, Utc};
use futures::future::join_all;
use nix::sys::signal::Signal;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::handle::Session;
use super::supervisor::{launch, ShellSpec};
use super::types::{CreateSessionRequest, SessionExecResult, SessionInfo, SessionLogs};
use crate::broadcast::LogBroadcaster;
use crate::config::SupervisorConfig;
use crate::environment::{
    current_dir, merged_environment, require_directory, shell_quote, validate_environment,
    validate_shell_names,
};
use crate::error::{Error, Result};
use crate::logs::{LogBuffer, LogFilter, LogLevel, TargetType};
use crate::signal::signal_process_group;

/// Extra wait for the monitor to reap a force-killed shell
const FORCE_KILL_WAIT: Duration = Duration::from_secs(2);

type SessionMap = Arc<RwLock<HashMap<String, Arc<Session>>>>;

/// Registry of interactive shell sessions.
///
/// The map lock is held only for lookups, inserts and removals. Each session
/// carries its own locks for mutable fields and for its log buffer.
pub struct SessionManager {
    sessions: SessionMap,
    broadcaster: Arc<LogBroadcaster>,
    config: SupervisorConfig,
}

impl SessionManager {
    /// Create an empty registry
    pub fn new(config: SupervisorConfig, broadcaster: Arc<LogBroadcaster>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            broadcaster,
            config,
        }
    }

    async fn session(&self, id: &str) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Start a new shell session
    pub async fn create(&self, request: CreateSessionRequest) -> Result<SessionInfo> {
        let shell = request
            .shell
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.config.default_shell.clone());

        let base = current_dir()?;
        let working_dir = match request.working_dir.as_deref() {
            Some(dir) if !dir.trim().is_empty() => require_directory(&base, dir).await?,
            _ => base,
        };

        validate_environment(&request.env)?;
        let env = merged_environment(&request.env);

        let id = Uuid::new_v4().to_string();
        let logs = Arc::new(LogBuffer::new(
            id.clone(),
            TargetType::Session,
            self.config.log_buffer_capacity,
            self.broadcaster.clone(),
        ));

        let session = launch(ShellSpec {
            id: id.clone(),
            shell,
            working_dir: &working_dir,
            env,
            logs,
        })?;

        self.sessions
            .write()
            .await
            .insert(id.clone(), session.clone());

        info!(
            session_id = %id,
            shell = %session.shell,
            pid = ?session.pid,
            working_dir = %working_dir.display(),
            "Session created"
        );
        Ok(session.info().await)
    }

    /// Get a session's current view
    pub async fn get(&self, id: &str) -> Result<SessionInfo> {
        Ok(self.session(id).await?.info().await)
    }

    /// List sessions, oldest first
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();
        let mut infos = Vec::with_capacity(sessions.len());
        for session in sessions {
            infos.push(session.info().await);
        }
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    /// Number of registered sessions
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Write a command line into the session's shell.
    ///
    /// Output is not correlated with the command; it arrives in the
    /// session's continuous log stream.
    pub async fn exec(&self, id: &str, command: &str) -> Result<SessionExecResult> {
        if command.trim().is_empty() {
            return Err(Error::Validation("command must not be empty".to_string()));
        }
        let session = self.session(id).await?;
        session.ensure_active()?;

        session.write_line(command).await?;
        session.touch().await;
        session
            .logs
            .append(LogLevel::System, "command", format!("$ {command}"))
            .await;

        debug!(session_id = %id, "Command written to session");
        Ok(SessionExecResult {
            session_id: id.to_string(),
            command: command.to_string(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    /// Change the session's working directory and mirror it into the shell
    pub async fn change_directory(&self, id: &str, path: &str) -> Result<SessionInfo> {
        if path.trim().is_empty() {
            return Err(Error::Validation("path must not be empty".to_string()));
        }
        let session = self.session(id).await?;
        session.ensure_active()?;

        let current = session.state.read().await.working_dir.clone();
        let target = require_directory(&current, path).await?;
        let target_display = target.display().to_string();
        let quoted = shell_quote(&target_display)?;

        session.write_line(&format!("cd {quoted}")).await?;
        {
            let mut state = session.state.write().await;
            state.working_dir = target;
        }
        session.touch().await;
        session
            .logs
            .append(LogLevel::System, "command", format!("$ cd {quoted}"))
            .await;

        debug!(session_id = %id, working_dir = %target_display, "Session directory changed");
        Ok(session.info().await)
    }

    /// Merge variables into the session's environment and export them in the shell
    pub async fn update_environment(
        &self,
        id: &str,
        env: HashMap<String, String>,
    ) -> Result<SessionInfo> {
        validate_shell_names(env.keys())?;
        let session = self.session(id).await?;
        session.ensure_active()?;

        let mut names: Vec<&String> = env.keys().collect();
        names.sort();
        for name in names {
            let value = shell_quote(&env[name])?;
            session
                .write_line(&format!("export {name}={value}"))
                .await?;
        }

        {
            let mut state = session.state.write().await;
            state.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        session.touch().await;

        debug!(session_id = %id, count = env.len(), "Session environment updated");
        Ok(session.info().await)
    }

    /// Stop a session: close stdin, SIGTERM, wait out the grace period, then
    /// SIGKILL. Idempotent. The record stays fetchable for the removal delay.
    pub async fn terminate(&self, id: &str) -> Result<SessionInfo> {
        let session = self.session(id).await?;

        if session.termination_requested.swap(true, Ordering::SeqCst) {
            debug!(session_id = %id, "Terminate already requested");
            return Ok(session.info().await);
        }
        session.active.store(false, Ordering::SeqCst);
        session.touch().await;
        info!(session_id = %id, pid = ?session.pid, "Terminating session");

        session.close_stdin().await;

        if !session.has_exited() {
            if let Some(pid) = session.pid {
                if let Err(e) = signal_process_group(pid, Signal::SIGTERM) {
                    warn!(session_id = %id, error = %e, "Graceful signal failed, escalating");
                }
            }

            if !session.wait_for_exit(self.config.terminate_grace()).await {
                warn!(
                    session_id = %id,
                    grace_secs = self.config.terminate_grace_secs,
                    "Grace period elapsed, force killing session"
                );
                if let Some(pid) = session.pid {
                    if let Err(e) = signal_process_group(pid, Signal::SIGKILL) {
                        warn!(session_id = %id, error = %e, "Force kill signal failed");
                    }
                }
                session.kill_switch.notify_one();
                if !session.wait_for_exit(FORCE_KILL_WAIT).await {
                    warn!(session_id = %id, "Shell did not exit after force kill");
                }
            }
        }

        session.cancel.cancel();
        self.schedule_removal(id.to_string());
        Ok(session.info().await)
    }

    /// Terminate every session still accepting input
    pub async fn terminate_all(&self) -> usize {
        let ids: Vec<String> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, session)| session.is_active())
            .map(|(id, _)| id.clone())
            .collect();

        let results = join_all(ids.iter().map(|id| self.terminate(id))).await;
        results.iter().filter(|r| r.is_ok()).count()
    }

    fn schedule_removal(&self, id: String) {
        let sessions = Arc::clone(&self.sessions);
        let broadcaster = Arc::clone(&self.broadcaster);
        let delay = self.config.removal_delay();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sessions.write().await.remove(&id).is_some() {
                broadcaster.remove_target(&id);
                debug!(session_id = %id, "Terminated session removed from registry");
            }
        });
    }

    /// Raw lines and entries from the tail of a session's log
    pub async fn logs(&self, id: &str, tail: Option<usize>) -> Result<SessionLogs> {
        let session = self.session(id).await?;
        let tail = tail.unwrap_or(self.config.log_buffer_capacity);
        Ok(SessionLogs {
            session_id: id.to_string(),
            lines: session.logs.lines(tail).await,
            entries: session.logs.tail(tail, &LogFilter::all()).await,
        })
    }

    /// Log buffer of a session
    pub async fn log_buffer(&self, id: &str) -> Result<Arc<LogBuffer>> {
        Ok(self.session(id).await?.logs.clone())
    }

    /// Remove non-active sessions idle since before `now - retention`.
    /// Returns the removed ids.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Vec<String> {
        let cutoff = now - self.config.retention();
        let snapshot: Vec<(String, Arc<Session>)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, session) in snapshot {
            if !session.is_active() && session.last_used_at().await < cutoff {
                expired.push((id, session));
            }
        }
        if expired.is_empty() {
            return Vec::new();
        }

        let mut removed = Vec::with_capacity(expired.len());
        {
            let mut sessions = self.sessions.write().await;
            for (id, session) in expired {
                let same = sessions
                    .get(&id)
                    .is_some_and(|current| Arc::ptr_eq(current, &session));
                if same {
                    sessions.remove(&id);
                    session.cancel.cancel();
                    removed.push(id);
                }
            }
        }
        for id in &removed {
            self.broadcaster.remove_target(id);
        }
        removed
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl SessionManager {
    /// Backdate a session's last-used-at for sweep tests
    pub(crate) async fn backdate(&self, id: &str, at: DateTime<Utc>) {
        if let Ok(session) = self.session(id).await {
            session.state.write().await.last_used_at = at;
        }
    }
}
