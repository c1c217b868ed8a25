use devbox_core::SessionStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query parameters for listing sessions
#[derive(Debug, Default, Deserialize)]
pub struct ListSessionsQuery {
    /// Only sessions with this status
    pub status: Option<SessionStatus>,
}

/// Body of an exec request
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecCommandRequest {
    pub command: String,
}

/// Body of a change-directory request
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangeDirectoryRequest {
    pub path: String,
}

/// Body of an environment update
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEnvironmentRequest {
    pub env: HashMap<String, String>,
}

pub use super::super::stream::LogsQuery;
