//! WebSocket module for Devbox
//!
//! Provides real-time communication endpoints:
//! - /ws/logs - Session and process log stream

pub mod logs;

pub use logs::logs_handler;

use axum::{routing::get, Router};

/// Create the WebSocket router
pub fn websocket_router() -> Router {
    Router::new().route("/ws/logs", get(logs_handler))
}
