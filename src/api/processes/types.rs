use devbox_core::ProcessStatus;
use serde::{Deserialize, Serialize};

/// Query parameters for listing processes
#[derive(Debug, Default, Deserialize)]
pub struct ListProcessesQuery {
    /// Only processes with this status
    pub status: Option<ProcessStatus>,
}

/// Body of a kill request; the signal defaults to SIGTERM
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct KillRequest {
    #[serde(default)]
    pub signal: Option<String>,
}

pub use super::super::stream::LogsQuery;
