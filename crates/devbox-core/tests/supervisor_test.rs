//! End-to-end supervision scenarios against real shells and processes

use devbox_core::signal::process_exists;
use devbox_core::{
    Connection, CreateSessionRequest, ExecRequest, LogFilter, LogLevel, Runtime, SessionStatus,
    SubscribeOptions, SupervisorConfig, TargetType,
};
use std::sync::Arc;
use std::time::Duration;

fn runtime() -> Arc<Runtime> {
    Runtime::new(SupervisorConfig::default())
}

#[tokio::test]
async fn test_echo_in_tmp_shows_in_tail() {
    let runtime = runtime();
    let sessions = runtime.sessions();
    let session = sessions
        .create(CreateSessionRequest::new().working_dir("/tmp"))
        .await
        .unwrap();
    assert_eq!(session.working_dir, "/tmp");

    sessions.exec(&session.id, "echo hello").await.unwrap();

    let mut found = false;
    for _ in 0..100 {
        let logs = sessions.logs(&session.id, Some(5)).await.unwrap();
        if logs.entries.iter().any(|e| e.message.contains("hello")) {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(found);

    sessions.terminate(&session.id).await.unwrap();
}

#[tokio::test]
async fn test_immediate_terminate_then_info() {
    let runtime = runtime();
    let sessions = runtime.sessions();
    let session = sessions.create(CreateSessionRequest::new()).await.unwrap();
    sessions.terminate(&session.id).await.unwrap();

    let info = sessions.get(&session.id).await.unwrap();
    assert!(matches!(
        info.status,
        SessionStatus::Terminated | SessionStatus::Failed | SessionStatus::Completed
    ));
    assert!(!info.active);
    assert!(!process_exists(session.pid.unwrap()));
}

#[tokio::test]
async fn test_terminate_escalates_when_term_is_ignored() {
    let runtime = Runtime::new(SupervisorConfig::default().with_terminate_grace(1));
    let sessions = runtime.sessions();
    let session = sessions.create(CreateSessionRequest::new()).await.unwrap();

    // the shell ignores SIGTERM and keeps its stdin busy
    sessions
        .exec(&session.id, "trap '' TERM; while true; do sleep 1; done")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = std::time::Instant::now();
    let info = sessions.terminate(&session.id).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(900));
    assert_eq!(info.status, SessionStatus::Terminated);
    assert!(!process_exists(session.pid.unwrap()));
}

#[tokio::test]
async fn test_sync_exit_one_returns_code() {
    let runtime = runtime();
    let result = runtime
        .processes()
        .execute_sync(ExecRequest::new("exit 1"))
        .await
        .unwrap();
    assert_eq!(result.exit_code, 1);
}

#[tokio::test]
async fn test_sync_timeout_leaves_nothing_running() {
    let runtime = runtime();
    let err = runtime
        .processes()
        .execute_sync(ExecRequest::new("sleep 5").timeout_ms(100))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TIMEOUT");

    let processes = runtime.processes().list().await;
    let pid = processes[0].pid.unwrap();
    assert!(!process_exists(pid));
}

#[tokio::test]
async fn test_subscribe_replays_tail_then_follows() {
    let runtime = runtime();
    let process = runtime
        .processes()
        .execute_async(ExecRequest::new(
            "i=1; while [ $i -le 50 ]; do echo line$i; i=$((i+1)); done; sleep 30",
        ))
        .await
        .unwrap();

    let buffer = runtime
        .log_buffer(TargetType::Process, &process.id)
        .await
        .unwrap();
    for _ in 0..100 {
        let stdout = buffer
            .tail(100, &LogFilter::all().with_levels([LogLevel::Stdout]))
            .await;
        if stdout.len() == 50 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let (connection, mut deliveries) = Connection::new();
    let options = SubscribeOptions {
        filter: LogFilter::all().with_levels([LogLevel::Stdout]),
        tail: 10,
        follow: true,
    };
    let subscription = runtime
        .subscribe(&connection, TargetType::Process, &process.id, &options)
        .await
        .unwrap();

    assert_eq!(subscription.history.len(), 10);
    assert_eq!(subscription.history[0].message, "line41");
    assert_eq!(subscription.history[9].message, "line50");
    assert!(subscription
        .history
        .windows(2)
        .all(|w| w[0].sequence < w[1].sequence));

    buffer.append(LogLevel::Stdout, "stdout", "after").await;
    let live = tokio::time::timeout(Duration::from_secs(2), deliveries.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(!live.is_history);
    assert_eq!(live.entry.message, "after");
    assert!(live.entry.sequence > subscription.history[9].sequence);

    runtime.processes().kill(&process.id, Some("KILL")).await.unwrap();
}

#[tokio::test]
async fn test_subscribe_unknown_target_is_error() {
    let runtime = runtime();
    let (connection, _rx) = Connection::new();
    let err = runtime
        .subscribe(
            &connection,
            TargetType::Session,
            "missing",
            &SubscribeOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_session_output_sequences_increase() {
    let runtime = runtime();
    let sessions = runtime.sessions();
    let session = sessions.create(CreateSessionRequest::new()).await.unwrap();

    let (connection, mut deliveries) = Connection::new();
    runtime
        .subscribe(
            &connection,
            TargetType::Session,
            &session.id,
            &SubscribeOptions::default(),
        )
        .await
        .unwrap();

    sessions
        .exec(&session.id, "for i in 1 2 3 4 5; do echo out$i; echo err$i >&2; done")
        .await
        .unwrap();

    let mut last = 0;
    let mut seen = 0;
    while seen < 11 {
        let delivery = tokio::time::timeout(Duration::from_secs(2), deliveries.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(delivery.entry.sequence > last);
        last = delivery.entry.sequence;
        seen += 1;
    }

    sessions.terminate(&session.id).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_sessions_under_stress() {
    let runtime = runtime();
    let mut handles = Vec::new();
    for _ in 0..16 {
        let runtime = runtime.clone();
        handles.push(tokio::spawn(async move {
            let info = runtime
                .sessions()
                .create(CreateSessionRequest::new())
                .await
                .unwrap();
            runtime.sessions().exec(&info.id, "echo hi").await.unwrap();
            info.id
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(runtime.sessions().count().await, 16);

    runtime.shutdown().await;
    for info in runtime.sessions().list().await {
        assert!(!info.active);
    }
}
