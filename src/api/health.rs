//! Health check endpoint
//!
//! `/health` reports liveness, the build version and how many sessions and
//! processes the engine is currently tracking.

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use devbox_core::{ProcessStatus, Runtime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: TargetCounts,
    pub processes: TargetCounts,
}

/// Tracked and live counts for one registry
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetCounts {
    pub total: usize,
    pub active: usize,
}

async fn health_check(Extension(runtime): Extension<Arc<Runtime>>) -> Json<HealthResponse> {
    let sessions = runtime.sessions().list().await;
    let processes = runtime.processes().list().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: TargetCounts {
            total: sessions.len(),
            active: sessions.iter().filter(|s| s.active).count(),
        },
        processes: TargetCounts {
            total: processes.len(),
            active: processes
                .iter()
                .filter(|p| p.status == ProcessStatus::Running)
                .count(),
        },
    })
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}
