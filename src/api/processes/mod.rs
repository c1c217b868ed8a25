//! Processes API endpoints
//!
//! POST /api/v1/processes          - Start a process in the background
//! POST /api/v1/processes/exec     - Run a process and wait for its output
//! GET  /api/v1/processes          - List processes (`?status=running`)
//! GET  /api/v1/processes/:id      - Process status
//! GET  /api/v1/processes/:id/logs - Log tail (`?tail=N&stream=true`)
//! POST /api/v1/processes/:id/kill - Send a signal (`{"signal": "KILL"}`)

pub mod handlers;
pub mod types;


pub use handlers::{
    execute_async, execute_sync, get_process, get_process_logs, kill_process, list_processes,
};

use axum::{
    routing::{get, post},
    Router,
};

/// Create processes routes
pub fn processes_routes() -> Router {
    Router::new()
        .route("/api/v1/processes", post(execute_async).get(list_processes))
        .route("/api/v1/processes/exec", post(execute_sync))
        .route("/api/v1/processes/:id", get(get_process))
        .route("/api/v1/processes/:id/logs", get(get_process_logs))
        .route("/api/v1/processes/:id/kill", post(kill_process))
}
