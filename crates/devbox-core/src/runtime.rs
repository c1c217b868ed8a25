//! Engine facade
//!
//! Owns one broadcaster and the two registries that publish through it.
//! Independent runtimes share nothing, so tests can run many side by side.

use std::sync::Arc;
use tracing::info;

use crate::broadcast::{Connection, ConnectionId, LogBroadcaster, SubscribeOptions, Subscription};
use crate::config::SupervisorConfig;
use crate::error::Result;
use crate::logs::{LogBuffer, TargetType};
use crate::process::ProcessManager;
use crate::session::SessionManager;

/// Outcome of one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Removed session ids
    pub sessions: Vec<String>,
    /// Removed process ids
    pub processes: Vec<String>,
}

impl SweepReport {
    /// Total removed
    #[must_use]
    pub fn total(&self) -> usize {
        self.sessions.len() + self.processes.len()
    }
}

/// Sessions, processes and log delivery behind one handle
#[derive(Debug)]
pub struct Runtime {
    config: SupervisorConfig,
    broadcaster: Arc<LogBroadcaster>,
    sessions: SessionManager,
    processes: ProcessManager,
}

impl Runtime {
    /// Build a runtime from configuration
    pub fn new(config: SupervisorConfig) -> Arc<Self> {
        let broadcaster = Arc::new(LogBroadcaster::new());
        Arc::new(Self {
            sessions: SessionManager::new(config.clone(), broadcaster.clone()),
            processes: ProcessManager::new(config.clone(), broadcaster.clone()),
            broadcaster,
            config,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Session registry
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Process registry
    pub fn processes(&self) -> &ProcessManager {
        &self.processes
    }

    /// Log broadcaster
    pub fn broadcaster(&self) -> &Arc<LogBroadcaster> {
        &self.broadcaster
    }

    /// Find a target's log buffer; unknown ids are not-found errors
    pub async fn log_buffer(&self, target_type: TargetType, target_id: &str) -> Result<Arc<LogBuffer>> {
        match target_type {
            TargetType::Session => self.sessions.log_buffer(target_id).await,
            TargetType::Process => self.processes.log_buffer(target_id).await,
        }
    }

    /// Replay a target's tail to `connection` and, when following,
    /// register it for live entries
    pub async fn subscribe(
        &self,
        connection: &Connection,
        target_type: TargetType,
        target_id: &str,
        options: &SubscribeOptions,
    ) -> Result<Subscription> {
        let buffer = self.log_buffer(target_type, target_id).await?;
        Ok(self.broadcaster.subscribe(connection, &buffer, options).await)
    }

    /// Drop one registration; idempotent
    pub fn unsubscribe(&self, connection_id: ConnectionId, target_id: &str) -> bool {
        self.broadcaster.unsubscribe(connection_id, target_id)
    }

    /// Reclaim idle terminal sessions and old finished processes
    pub async fn sweep(&self) -> SweepReport {
        let now = chrono::Utc::now();
        SweepReport {
            sessions: self.sessions.sweep(now).await,
            processes: self.processes.sweep(now).await,
        }
    }

    /// Terminate every active session and kill every running process
    pub async fn shutdown(&self) {
        let sessions = self.sessions.terminate_all().await;
        let processes = self.processes.kill_all().await;
        info!(sessions, processes, "Runtime stopped supervised work");
    }
}
