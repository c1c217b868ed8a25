//! Web API module for Devbox
//!
//! Provides REST API endpoints for:
//! - Interactive shell sessions
//! - One-shot process execution
//! - Health checks

pub mod health;
pub mod processes;
pub mod response;
pub mod sessions;
pub mod stream;

use axum::Router;

pub use health::health_routes;
pub use processes::processes_routes;
pub use sessions::sessions_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(sessions_routes())
        .merge(processes_routes())
}
