//! Log stream WebSocket module
//!
//! Clients subscribe to a session or process, receive the tail of its log
//! flagged `isHistory: true`, then live entries as they are produced.
//! Entries near the replay boundary may arrive twice; clients drop any
//! entry whose `sequence` they have already seen.

pub mod handlers;
pub mod protocol;
pub mod session;

use axum::{extract::ws::WebSocketUpgrade, response::IntoResponse, Extension};
use devbox_core::Runtime;
use std::sync::Arc;

/// WebSocket upgrade handler
pub async fn logs_handler(
    ws: WebSocketUpgrade,
    Extension(runtime): Extension<Arc<Runtime>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::handle_socket(socket, runtime))
}

#[cfg(test)]
mod tests;
