//! Graceful Shutdown
//!
//! Coordinates service shutdown: background tasks hold child tokens of one
//! [`CancellationToken`], and the supervised shells and processes are
//! stopped through the runtime before the process exits.
//!
//! ## Usage
//!
//! ```ignore
//! let shutdown = ShutdownController::new();
//! spawn_sweeper(runtime.clone(), shutdown.token());
//!
//! axum::serve(listener, app)
//!     .with_graceful_shutdown(shutdown_signal_with_controller(shutdown, runtime))
//!     .await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::runtime::Runtime;

/// Default bound on stopping supervised work
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Shutdown controller for coordinating graceful shutdown
#[derive(Debug)]
pub struct ShutdownController {
    cancel_token: CancellationToken,
    shutdown_initiated: AtomicBool,
    timeout: Duration,
}

impl ShutdownController {
    /// Create a new shutdown controller with default timeout
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS))
    }

    /// Create a new shutdown controller with custom timeout
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            cancel_token: CancellationToken::new(),
            shutdown_initiated: AtomicBool::new(false),
            timeout,
        })
    }

    /// Get a cancellation token for a component
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Check if shutdown has been initiated
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Cancel background tasks, then stop every supervised session and
    /// process, giving up after the timeout. Only the first call acts.
    pub async fn shutdown(&self, runtime: &Runtime) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Shutdown already initiated");
            return;
        }

        info!("Initiating graceful shutdown...");
        self.cancel_token.cancel();

        if tokio::time::timeout(self.timeout, runtime.shutdown())
            .await
            .is_err()
        {
            warn!(
                timeout_secs = self.timeout.as_secs(),
                "Shutdown timeout exceeded, abandoning remaining sessions"
            );
        }
        info!("Graceful shutdown complete");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}

/// Signal future for `with_graceful_shutdown` that also stops supervised work
pub async fn shutdown_signal_with_controller(
    controller: Arc<ShutdownController>,
    runtime: Arc<Runtime>,
) {
    wait_for_shutdown_signal().await;
    controller.shutdown(&runtime).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupervisorConfig;
    use crate::session::{CreateSessionRequest, SessionStatus};

    #[tokio::test]
    async fn test_cancellation_propagation() {
        let controller = ShutdownController::new();
        let token = controller.token();
        assert!(!token.is_cancelled());
        assert!(!controller.is_shutting_down());

        let runtime = Runtime::new(SupervisorConfig::default());
        controller.shutdown(&runtime).await;

        assert!(token.is_cancelled());
        assert!(controller.is_shutting_down());
    }

    #[tokio::test]
    async fn test_shutdown_terminates_sessions() {
        let controller = ShutdownController::new();
        let runtime = Runtime::new(SupervisorConfig::default().with_terminate_grace(1));
        let session = runtime
            .sessions()
            .create(CreateSessionRequest::new())
            .await
            .unwrap();

        controller.shutdown(&runtime).await;

        let info = runtime.sessions().get(&session.id).await.unwrap();
        assert_eq!(info.status, SessionStatus::Terminated);
        assert!(!info.active);
    }

    #[tokio::test]
    async fn test_double_shutdown() {
        let controller = ShutdownController::new();
        let runtime = Runtime::new(SupervisorConfig::default());

        let first = {
            let controller = controller.clone();
            let runtime = runtime.clone();
            tokio::spawn(async move { controller.shutdown(&runtime).await })
        };
        let second = {
            let controller = controller.clone();
            let runtime = runtime.clone();
            tokio::spawn(async move { controller.shutdown(&runtime).await })
        };
        let _ = tokio::join!(first, second);

        assert!(controller.is_shutting_down());
    }
}
