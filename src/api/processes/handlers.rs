use axum::{
    extract::{Path, Query},
    response::{IntoResponse, Response},
    Extension, Json,
};
use devbox_core::{ExecRequest, ProcessInfo, ProcessResult, Runtime, TargetType};
use std::sync::Arc;
use tracing::info;

use super::super::response::{ok, ApiError, ApiResult};
use super::super::stream::log_event_stream;
use super::types::{KillRequest, ListProcessesQuery, LogsQuery};

/// Start a process in the background
pub async fn execute_async(
    Extension(runtime): Extension<Arc<Runtime>>,
    Json(request): Json<ExecRequest>,
) -> ApiResult<ProcessInfo> {
    let process = runtime.processes().execute_async(request).await?;
    info!(process_id = %process.id, "Async process started via API");
    ok(process)
}

/// Run a process to completion
pub async fn execute_sync(
    Extension(runtime): Extension<Arc<Runtime>>,
    Json(request): Json<ExecRequest>,
) -> ApiResult<ProcessResult> {
    ok(runtime.processes().execute_sync(request).await?)
}

/// List processes
pub async fn list_processes(
    Extension(runtime): Extension<Arc<Runtime>>,
    Query(query): Query<ListProcessesQuery>,
) -> ApiResult<Vec<ProcessInfo>> {
    let mut processes = runtime.processes().list().await;
    if let Some(status) = query.status {
        processes.retain(|process| process.status == status);
    }
    ok(processes)
}

/// Get process status
pub async fn get_process(
    Extension(runtime): Extension<Arc<Runtime>>,
    Path(id): Path<String>,
) -> ApiResult<ProcessInfo> {
    ok(runtime.processes().status(&id).await?)
}

/// Signal a running process
pub async fn kill_process(
    Extension(runtime): Extension<Arc<Runtime>>,
    Path(id): Path<String>,
    body: Option<Json<KillRequest>>,
) -> ApiResult<ProcessInfo> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    ok(runtime
        .processes()
        .kill(&id, request.signal.as_deref())
        .await?)
}

/// Process logs, or a live event stream with `stream=true`
pub async fn get_process_logs(
    Extension(runtime): Extension<Arc<Runtime>>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Response, ApiError> {
    if query.stream {
        let sse = log_event_stream(runtime, TargetType::Process, &id, query.tail).await?;
        return Ok(sse.into_response());
    }
    Ok(ok(runtime.processes().logs(&id, query.tail).await?).into_response())
}
