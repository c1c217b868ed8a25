//! Lifecycle Sweeper
//!
//! Periodically reclaims sessions that are no longer active and have been
//! idle past the retention window, plus finished processes older than it.
//! Active sessions are never touched, however old.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::runtime::Runtime;

/// Run sweeps on the configured interval until `shutdown` fires
pub fn spawn_sweeper(runtime: Arc<Runtime>, shutdown: CancellationToken) -> JoinHandle<()> {
    let interval = runtime.config().sweep_interval();
    info!(
        interval_secs = interval.as_secs(),
        retention_secs = runtime.config().retention_secs,
        "Lifecycle sweeper started"
    );

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let report = runtime.sweep().await;
                    if report.total() > 0 {
                        info!(
                            sessions = report.sessions.len(),
                            processes = report.processes.len(),
                            "Sweep reclaimed idle targets"
                        );
                    } else {
                        debug!("Sweep found nothing to reclaim");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Lifecycle sweeper shutting down");
                    break;
                }
            }
        }
    })
}
