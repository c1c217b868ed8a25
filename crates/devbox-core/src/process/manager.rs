//! Process Registry

use chrono::{DateTime, Utc};
use nix::sys::signal::Signal;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{
    ExecMode, ExecRequest, ProcessInfo, ProcessLogs, ProcessResult, ProcessStatus,
};
use crate::broadcast::LogBroadcaster;
use crate::config::SupervisorConfig;
use crate::environment::{current_dir, require_directory, validate_environment};
use crate::error::{Error, Result};
use crate::logs::{LogBuffer, LogFilter, LogLevel, TargetType};
use crate::output::{await_drains, describe_exit, drain_lines, read_all};
use crate::signal::{parse_signal, signal_process_group};

/// How long an exit monitor waits for the drain workers to reach EOF
const DRAIN_WAIT: Duration = Duration::from_secs(1);

struct ProcessState {
    status: ProcessStatus,
    exit_code: Option<i32>,
    ended_at: Option<DateTime<Utc>>,
}

struct ManagedProcess {
    id: String,
    pid: Option<u32>,
    command: String,
    args: Vec<String>,
    working_dir: PathBuf,
    mode: ExecMode,
    timeout_ms: Option<u64>,
    started_at: DateTime<Utc>,
    state: RwLock<ProcessState>,
    cancel: CancellationToken,
    logs: Arc<LogBuffer>,
}

impl ManagedProcess {
    async fn info(&self) -> ProcessInfo {
        let state = self.state.read().await;
        ProcessInfo {
            id: self.id.clone(),
            pid: self.pid,
            command: self.command.clone(),
            args: self.args.clone(),
            working_dir: self.working_dir.display().to_string(),
            mode: self.mode,
            status: state.status,
            exit_code: state.exit_code,
            timeout_ms: self.timeout_ms,
            started_at: self.started_at,
            ended_at: state.ended_at,
        }
    }

    async fn is_running(&self) -> bool {
        self.state.read().await.status == ProcessStatus::Running
    }

    /// Record the exit. Only the first call has an effect.
    async fn finish(&self, status: ProcessStatus, exit_code: Option<i32>) {
        let mut state = self.state.write().await;
        if state.status != ProcessStatus::Running {
            return;
        }
        state.status = status;
        state.exit_code = exit_code;
        state.ended_at = Some(Utc::now());
    }
}

fn exit_outcome(exit: &ExitStatus) -> (ProcessStatus, Option<i32>) {
    match exit.code() {
        Some(code) => (ProcessStatus::Exited, Some(code)),
        None => (ProcessStatus::Killed, None),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Registry of non-interactive process executions
pub struct ProcessManager {
    processes: Arc<RwLock<HashMap<String, Arc<ManagedProcess>>>>,
    broadcaster: Arc<LogBroadcaster>,
    config: SupervisorConfig,
}

impl ProcessManager {
    /// Create an empty registry
    pub fn new(config: SupervisorConfig, broadcaster: Arc<LogBroadcaster>) -> Self {
        Self {
            processes: Arc::new(RwLock::new(HashMap::new())),
            broadcaster,
            config,
        }
    }

    async fn process(&self, id: &str) -> Result<Arc<ManagedProcess>> {
        self.processes
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ProcessNotFound(id.to_string()))
    }

    /// Validate the request and spawn it with piped output
    async fn spawn(
        &self,
        request: &ExecRequest,
        mode: ExecMode,
    ) -> Result<(Arc<ManagedProcess>, Child)> {
        if request.command.trim().is_empty() {
            return Err(Error::Validation("command must not be empty".to_string()));
        }
        validate_environment(&request.env)?;

        let base = current_dir()?;
        let working_dir = match request.working_dir.as_deref() {
            Some(dir) if !dir.trim().is_empty() => require_directory(&base, dir).await?,
            _ => base,
        };

        // without arguments the command line is handed to the shell
        let mut command = if request.args.is_empty() {
            let mut shell = Command::new(&self.config.default_shell);
            shell.arg("-c").arg(&request.command);
            shell
        } else {
            let mut program = Command::new(&request.command);
            program.args(&request.args);
            program
        };
        command
            .current_dir(&working_dir)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| Error::Spawn {
            command: request.command.clone(),
            message: e.to_string(),
        })?;

        let id = Uuid::new_v4().to_string();
        let process = Arc::new(ManagedProcess {
            id: id.clone(),
            pid: child.id(),
            command: request.command.clone(),
            args: request.args.clone(),
            working_dir,
            mode,
            timeout_ms: request.timeout_ms.filter(|ms| *ms > 0),
            started_at: Utc::now(),
            state: RwLock::new(ProcessState {
                status: ProcessStatus::Running,
                exit_code: None,
                ended_at: None,
            }),
            cancel: CancellationToken::new(),
            logs: Arc::new(LogBuffer::new(
                id.clone(),
                TargetType::Process,
                self.config.log_buffer_capacity,
                self.broadcaster.clone(),
            )),
        });

        self.processes.write().await.insert(id, process.clone());
        info!(
            process_id = %process.id,
            pid = ?process.pid,
            command = %process.command,
            mode = ?mode,
            "Process started"
        );
        Ok((process, child))
    }

    /// Start a process and return immediately. Output streams into the
    /// process's log buffer.
    pub async fn execute_async(&self, request: ExecRequest) -> Result<ProcessInfo> {
        let (process, mut child) = self.spawn(&request, ExecMode::Async).await?;

        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(tokio::spawn(drain_lines(
                stdout,
                LogLevel::Stdout,
                process.logs.clone(),
                process.cancel.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(tokio::spawn(drain_lines(
                stderr,
                LogLevel::Stderr,
                process.logs.clone(),
                process.cancel.clone(),
            )));
        }
        tokio::spawn(monitor_process(child, process.clone(), drains));

        Ok(process.info().await)
    }

    /// Run a process to completion and return its captured output.
    ///
    /// A detached task owns the child and always settles its status, so a
    /// caller that stops waiting does not leave the record `running`. The
    /// deadline covers both the exit and the end of output; on expiry the
    /// process group is killed and a timeout error returned.
    pub async fn execute_sync(&self, request: ExecRequest) -> Result<ProcessResult> {
        let started = Instant::now();
        let (process, child) = self.spawn(&request, ExecMode::Sync).await?;

        let task = tokio::spawn(run_to_completion(child, process.clone(), started));
        match task.await {
            Ok(result) => result,
            Err(e) => {
                process.finish(ProcessStatus::Killed, None).await;
                Err(Error::Internal(format!("sync execution task failed: {e}")))
            }
        }
    }

    /// List processes, oldest first
    pub async fn list(&self) -> Vec<ProcessInfo> {
        let processes: Vec<Arc<ManagedProcess>> =
            self.processes.read().await.values().cloned().collect();
        let mut infos = Vec::with_capacity(processes.len());
        for process in processes {
            infos.push(process.info().await);
        }
        infos.sort_by_key(|info| info.started_at);
        infos
    }

    /// Number of registered processes
    pub async fn count(&self) -> usize {
        self.processes.read().await.len()
    }

    /// Current view of one process
    pub async fn status(&self, id: &str) -> Result<ProcessInfo> {
        Ok(self.process(id).await?.info().await)
    }

    /// Raw lines and entries from the tail of a process's log
    pub async fn logs(&self, id: &str, tail: Option<usize>) -> Result<ProcessLogs> {
        let process = self.process(id).await?;
        let tail = tail.unwrap_or(self.config.log_buffer_capacity);
        Ok(ProcessLogs {
            process_id: id.to_string(),
            lines: process.logs.lines(tail).await,
            entries: process.logs.tail(tail, &LogFilter::all()).await,
        })
    }

    /// Log buffer of a process
    pub async fn log_buffer(&self, id: &str) -> Result<Arc<LogBuffer>> {
        Ok(self.process(id).await?.logs.clone())
    }

    /// Send a signal (SIGTERM when `signal` is `None`) to a running process.
    /// No grace period: the caller waits if it wants one.
    pub async fn kill(&self, id: &str, signal: Option<&str>) -> Result<ProcessInfo> {
        let process = self.process(id).await?;
        let signal = parse_signal(signal.unwrap_or("SIGTERM"))?;

        if !process.is_running().await {
            return Err(Error::ProcessNotRunning(id.to_string()));
        }
        let pid = process
            .pid
            .ok_or_else(|| Error::ProcessNotRunning(id.to_string()))?;

        signal_process_group(pid, signal)?;
        process
            .logs
            .append(LogLevel::System, "system", format!("sent {signal}"))
            .await;
        info!(process_id = %id, pid, signal = %signal, "Signal sent to process");
        Ok(process.info().await)
    }

    /// Kill every running process
    pub async fn kill_all(&self) -> usize {
        let processes: Vec<Arc<ManagedProcess>> =
            self.processes.read().await.values().cloned().collect();
        let mut killed = 0;
        for process in processes {
            if !process.is_running().await {
                continue;
            }
            if let Some(pid) = process.pid {
                match signal_process_group(pid, Signal::SIGKILL) {
                    Ok(()) => killed += 1,
                    Err(e) => warn!(process_id = %process.id, error = %e, "Kill failed"),
                }
            }
        }
        killed
    }

    /// Remove finished processes that ended before `now - retention`.
    /// Returns the removed ids.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Vec<String> {
        let cutoff = now - self.config.retention();
        let snapshot: Vec<(String, Arc<ManagedProcess>)> = self
            .processes
            .read()
            .await
            .iter()
            .map(|(id, process)| (id.clone(), process.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, process) in snapshot {
            let ended = process.state.read().await.ended_at;
            if ended.is_some_and(|at| at < cutoff) {
                expired.push(id);
            }
        }
        if expired.is_empty() {
            return expired;
        }

        {
            let mut processes = self.processes.write().await;
            for id in &expired {
                if let Some(process) = processes.remove(id) {
                    process.cancel.cancel();
                }
            }
        }
        for id in &expired {
            self.broadcaster.remove_target(id);
        }
        expired
    }
}

impl std::fmt::Debug for ProcessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Wait for a sync execution's exit and output under one deadline, then
/// settle its status and copy the output into its log buffer
async fn run_to_completion(
    mut child: Child,
    process: Arc<ManagedProcess>,
    started: Instant,
) -> Result<ProcessResult> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let outcome = {
        let collect = async {
            tokio::join!(child.wait(), read_all(stdout), read_all(stderr))
        };
        match process.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), collect)
                .await
                .ok(),
            None => Some(collect.await),
        }
    };

    let Some((waited, stdout, stderr)) = outcome else {
        let limit = process.timeout_ms.unwrap_or_default();
        warn!(process_id = %process.id, timeout_ms = limit, "Process timed out, killing");
        if let Some(pid) = process.pid {
            if let Err(e) = signal_process_group(pid, Signal::SIGKILL) {
                debug!(process_id = %process.id, error = %e, "Group kill failed");
            }
        }
        if let Err(e) = child.kill().await {
            debug!(process_id = %process.id, error = %e, "Child kill failed");
        }
        process.finish(ProcessStatus::Killed, None).await;
        process
            .logs
            .append(
                LogLevel::Error,
                "system",
                format!("process timed out after {limit}ms"),
            )
            .await;
        return Err(Error::Timeout(limit));
    };

    let exit = match waited {
        Ok(exit) => exit,
        Err(e) => {
            process.finish(ProcessStatus::Killed, None).await;
            process
                .logs
                .append(
                    LogLevel::Error,
                    "system",
                    format!("failed to wait for process: {e}"),
                )
                .await;
            return Err(Error::Internal(format!("failed to wait for process: {e}")));
        }
    };

    let (status, exit_code) = exit_outcome(&exit);
    process.finish(status, exit_code).await;
    for line in stdout.lines() {
        process.logs.append(LogLevel::Stdout, "stdout", line).await;
    }
    for line in stderr.lines() {
        process.logs.append(LogLevel::Stderr, "stderr", line).await;
    }
    process
        .logs
        .append(
            LogLevel::Info,
            "system",
            format!("process exited ({})", describe_exit(&exit)),
        )
        .await;

    Ok(ProcessResult {
        id: process.id.clone(),
        pid: process.pid,
        stdout,
        stderr,
        exit_code: exit_code.unwrap_or(-1),
        duration_ms: millis(started.elapsed()),
    })
}

/// Exit monitor for async executions, enforcing the optional deadline
async fn monitor_process(
    mut child: Child,
    process: Arc<ManagedProcess>,
    drains: Vec<JoinHandle<()>>,
) {
    let deadline = async {
        match process.timeout_ms {
            Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            None => std::future::pending().await,
        }
    };

    let (waited, timed_out) = tokio::select! {
        waited = child.wait() => (waited, false),
        _ = deadline => {
            if let Some(pid) = process.pid {
                if let Err(e) = signal_process_group(pid, Signal::SIGKILL) {
                    debug!(process_id = %process.id, error = %e, "Group kill failed");
                }
            }
            if let Err(e) = child.start_kill() {
                debug!(process_id = %process.id, error = %e, "Child kill failed");
            }
            (child.wait().await, true)
        }
    };

    if !await_drains(drains, DRAIN_WAIT).await {
        debug!(process_id = %process.id, "Output still open after exit");
    }

    match waited {
        Ok(exit) if timed_out => {
            process.finish(ProcessStatus::Killed, exit.code()).await;
            process
                .logs
                .append(
                    LogLevel::Error,
                    "system",
                    format!(
                        "process timed out after {}ms",
                        process.timeout_ms.unwrap_or_default()
                    ),
                )
                .await;
        }
        Ok(exit) => {
            let (status, exit_code) = exit_outcome(&exit);
            process.finish(status, exit_code).await;
            let level = if exit.success() {
                LogLevel::Info
            } else {
                LogLevel::Error
            };
            process
                .logs
                .append(level, "system", format!("process exited ({})", describe_exit(&exit)))
                .await;
        }
        Err(e) => {
            process.finish(ProcessStatus::Killed, None).await;
            process
                .logs
                .append(
                    LogLevel::Error,
                    "system",
                    format!("failed to wait for process: {e}"),
                )
                .await;
        }
    }

    info!(process_id = %process.id, "Process finished");
}
