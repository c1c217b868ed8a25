use super::types::*;
use super::*;
use axum::{
    body::Body,
    extract::{Path, Query},
    http::{Request, StatusCode},
    Extension, Json,
};
use devbox_core::{CreateSessionRequest, Runtime, SessionStatus, SupervisorConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

fn test_runtime() -> Arc<Runtime> {
    Runtime::new(
        SupervisorConfig::default()
            .with_terminate_grace(1)
            .with_removal_delay(60),
    )
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_create_and_list_sessions() {
    let runtime = test_runtime();

    let response = create_session(
        Extension(runtime.clone()),
        Json(CreateSessionRequest::new().working_dir("/tmp")),
    )
    .await
    .unwrap();
    assert!(response.0.success);
    let created = response.0.data.unwrap();
    assert_eq!(created.status, SessionStatus::Active);

    let response = list_sessions(Extension(runtime.clone()), Query(ListSessionsQuery::default()))
        .await
        .unwrap();
    let sessions = response.0.data.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, created.id);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let runtime = test_runtime();
    let first = runtime
        .sessions()
        .create(CreateSessionRequest::new())
        .await
        .unwrap();
    runtime
        .sessions()
        .create(CreateSessionRequest::new())
        .await
        .unwrap();
    terminate_session(Extension(runtime.clone()), Path(first.id.clone()))
        .await
        .unwrap();

    let response = list_sessions(
        Extension(runtime.clone()),
        Query(ListSessionsQuery {
            status: Some(SessionStatus::Active),
        }),
    )
    .await
    .unwrap();
    let active = response.0.data.unwrap();
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].id, first.id);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_exec_cd_and_env() {
    let runtime = test_runtime();
    let session = runtime
        .sessions()
        .create(CreateSessionRequest::new())
        .await
        .unwrap();

    let response = exec_command(
        Extension(runtime.clone()),
        Path(session.id.clone()),
        Json(ExecCommandRequest {
            command: "echo hi".to_string(),
        }),
    )
    .await
    .unwrap();
    let exec = response.0.data.unwrap();
    assert_eq!(exec.command, "echo hi");
    assert!(exec.stdout.is_empty());

    let response = change_directory(
        Extension(runtime.clone()),
        Path(session.id.clone()),
        Json(ChangeDirectoryRequest {
            path: "/tmp".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(response.0.data.unwrap().working_dir, "/tmp");

    let response = update_environment(
        Extension(runtime.clone()),
        Path(session.id.clone()),
        Json(UpdateEnvironmentRequest {
            env: HashMap::from([("FOO".to_string(), "bar".to_string())]),
        }),
    )
    .await
    .unwrap();
    assert_eq!(
        response.0.data.unwrap().env.get("FOO").map(String::as_str),
        Some("bar")
    );

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let app = sessions_routes().layer(Extension(test_runtime()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/sessions/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_missing_directory_is_404() {
    let app = sessions_routes().layer(Extension(test_runtime()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/sessions")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"working_dir":"/definitely/not/here"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "DIRECTORY_NOT_FOUND");
}

#[tokio::test]
async fn test_exec_after_terminate_is_conflict() {
    let runtime = test_runtime();
    let session = runtime
        .sessions()
        .create(CreateSessionRequest::new())
        .await
        .unwrap();
    runtime.sessions().terminate(&session.id).await.unwrap();

    let app = sessions_routes().layer(Extension(runtime.clone()));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/sessions/{}/exec", session.id))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"command":"echo late"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "SESSION_NOT_ACTIVE");
}

#[tokio::test]
async fn test_logs_returns_tail() {
    let runtime = test_runtime();
    let session = runtime
        .sessions()
        .create(CreateSessionRequest::new())
        .await
        .unwrap();
    runtime
        .sessions()
        .exec(&session.id, "echo from-api")
        .await
        .unwrap();

    let mut found = false;
    for _ in 0..50 {
        let logs = runtime.sessions().logs(&session.id, None).await.unwrap();
        if logs.lines.iter().any(|line| line == "from-api") {
            found = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert!(found);

    let app = sessions_routes().layer(Extension(runtime.clone()));
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/sessions/{}/logs?tail=1", session.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 1);

    runtime.shutdown().await;
}
