use axum::{
    extract::{Path, Query},
    response::{IntoResponse, Response},
    Extension, Json,
};
use devbox_core::{
    CreateSessionRequest, Runtime, SessionExecResult, SessionInfo, TargetType,
};
use std::sync::Arc;
use tracing::info;

use super::super::response::{ok, ApiError, ApiResult};
use super::super::stream::log_event_stream;
use super::types::{
    ChangeDirectoryRequest, ExecCommandRequest, ListSessionsQuery, LogsQuery,
    UpdateEnvironmentRequest,
};

/// Create a session
pub async fn create_session(
    Extension(runtime): Extension<Arc<Runtime>>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<SessionInfo> {
    let session = runtime.sessions().create(request).await?;
    info!(session_id = %session.id, "Session created via API");
    ok(session)
}

/// List sessions
pub async fn list_sessions(
    Extension(runtime): Extension<Arc<Runtime>>,
    Query(query): Query<ListSessionsQuery>,
) -> ApiResult<Vec<SessionInfo>> {
    let mut sessions = runtime.sessions().list().await;
    if let Some(status) = query.status {
        sessions.retain(|session| session.status == status);
    }
    ok(sessions)
}

/// Get session details
pub async fn get_session(
    Extension(runtime): Extension<Arc<Runtime>>,
    Path(id): Path<String>,
) -> ApiResult<SessionInfo> {
    ok(runtime.sessions().get(&id).await?)
}

/// Terminate a session
pub async fn terminate_session(
    Extension(runtime): Extension<Arc<Runtime>>,
    Path(id): Path<String>,
) -> ApiResult<SessionInfo> {
    ok(runtime.sessions().terminate(&id).await?)
}

/// Write a command into a session's shell
pub async fn exec_command(
    Extension(runtime): Extension<Arc<Runtime>>,
    Path(id): Path<String>,
    Json(request): Json<ExecCommandRequest>,
) -> ApiResult<SessionExecResult> {
    ok(runtime.sessions().exec(&id, &request.command).await?)
}

/// Change a session's working directory
pub async fn change_directory(
    Extension(runtime): Extension<Arc<Runtime>>,
    Path(id): Path<String>,
    Json(request): Json<ChangeDirectoryRequest>,
) -> ApiResult<SessionInfo> {
    ok(runtime
        .sessions()
        .change_directory(&id, &request.path)
        .await?)
}

/// Merge environment variables into a session
pub async fn update_environment(
    Extension(runtime): Extension<Arc<Runtime>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateEnvironmentRequest>,
) -> ApiResult<SessionInfo> {
    ok(runtime
        .sessions()
        .update_environment(&id, request.env)
        .await?)
}

/// Session logs, or a live event stream with `stream=true`
pub async fn get_session_logs(
    Extension(runtime): Extension<Arc<Runtime>>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Response, ApiError> {
    if query.stream {
        let sse = log_event_stream(runtime, TargetType::Session, &id, query.tail).await?;
        return Ok(sse.into_response());
    }
    Ok(ok(runtime.sessions().logs(&id, query.tail).await?).into_response())
}
