//! Background task startup functions

use devbox_core::{spawn_sweeper, Runtime, ShutdownController};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Start the lifecycle sweeper, stopped by the shutdown controller
pub fn start_sweeper(
    runtime: &Arc<Runtime>,
    shutdown_controller: &ShutdownController,
) -> JoinHandle<()> {
    let handle = spawn_sweeper(runtime.clone(), shutdown_controller.token());
    info!(
        "Lifecycle sweeper scheduled (every {}s, retention {}s)",
        runtime.config().sweep_interval_secs,
        runtime.config().retention_secs
    );
    handle
}
