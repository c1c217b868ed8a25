//! Sessions API endpoints
//!
//! POST   /api/v1/sessions          - Create a session
//! GET    /api/v1/sessions          - List sessions (`?status=active`)
//! GET    /api/v1/sessions/:id      - Get session details
//! DELETE /api/v1/sessions/:id      - Terminate a session
//! POST   /api/v1/sessions/:id/exec - Write a command into the shell
//! POST   /api/v1/sessions/:id/cd   - Change working directory
//! PATCH  /api/v1/sessions/:id/env  - Merge environment variables
//! GET    /api/v1/sessions/:id/logs - Log tail (`?tail=N&stream=true`)

pub mod handlers;
pub mod types;

#[cfg(test)]
mod tests;

pub use handlers::{
    change_directory, create_session, exec_command, get_session, get_session_logs,
    list_sessions, terminate_session, update_environment,
};

use axum::{
    routing::{get, patch, post},
    Router,
};

/// Create sessions routes
pub fn sessions_routes() -> Router {
    Router::new()
        .route("/api/v1/sessions", post(create_session).get(list_sessions))
        .route(
            "/api/v1/sessions/:id",
            get(get_session).delete(terminate_session),
        )
        .route("/api/v1/sessions/:id/exec", post(exec_command))
        .route("/api/v1/sessions/:id/cd", post(change_directory))
        .route("/api/v1/sessions/:id/env", patch(update_environment))
        .route("/api/v1/sessions/:id/logs", get(get_session_logs))
}
