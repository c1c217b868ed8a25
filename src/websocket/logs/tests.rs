use super::handlers::handle_client_message;
use super::protocol::*;
use devbox_core::{Connection, ExecRequest, LogLevel, Runtime, SupervisorConfig, TargetType};

fn parse(json: &str) -> ClientMessage {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_client_message_parsing() {
    let msg = parse(
        r#"{"action":"subscribe","type":"process","target_id":"p1",
            "options":{"levels":["stdout","stderr"],"tail":10,"follow":false,"startTime":5}}"#,
    );
    assert_eq!(msg.action, ClientAction::Subscribe);
    assert_eq!(msg.target_type, Some(TargetType::Process));
    assert_eq!(msg.target_id.as_deref(), Some("p1"));

    let options = msg.options.to_subscribe_options(100);
    assert_eq!(options.tail, 10);
    assert!(!options.follow);
    assert_eq!(options.filter.start_time, Some(5));
    assert!(options.filter.levels.contains(&LogLevel::Stderr));
}

#[test]
fn test_client_message_defaults() {
    let msg = parse(r#"{"action":"list"}"#);
    assert_eq!(msg.action, ClientAction::List);
    let options = msg.options.to_subscribe_options(100);
    assert_eq!(options.tail, 100);
    assert!(options.follow);
    assert!(options.filter.levels.is_empty());
}

#[test]
fn test_invalid_action_rejected() {
    assert!(serde_json::from_str::<ClientMessage>(r#"{"action":"publish"}"#).is_err());
}

#[test]
fn test_server_log_message_shape() {
    let entry = devbox_core::LogEntry {
        timestamp: 10,
        level: LogLevel::Stdout,
        source: "stdout".into(),
        target_id: "s1".into(),
        target_type: TargetType::Session,
        sequence: 3,
        message: "hello".into(),
    };
    let json = serde_json::to_value(ServerMessage::log(entry, true)).unwrap();
    assert_eq!(json["type"], "log");
    assert_eq!(json["dataType"], "session");
    assert_eq!(json["target_id"], "s1");
    assert_eq!(json["sequence"], 3);
    assert_eq!(json["isHistory"], true);
    assert_eq!(json["log"]["message"], "hello");
}

#[test]
fn test_server_error_shape() {
    let json =
        serde_json::to_value(ServerMessage::error("SESSION_NOT_FOUND", "missing", None)).unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["code"], "SESSION_NOT_FOUND");
    assert!(json["timestamp"].as_i64().unwrap() > 0);
    assert!(json.get("context").is_none());
}

#[tokio::test]
async fn test_subscribe_unknown_target_replies_error() {
    let runtime = Runtime::new(SupervisorConfig::default());
    let (connection, _rx) = Connection::new();
    let replies = handle_client_message(
        parse(r#"{"action":"subscribe","type":"session","target_id":"nope"}"#),
        &connection,
        &runtime,
    )
    .await;

    assert_eq!(replies.len(), 1);
    match &replies[0] {
        ServerMessage::Error { code, context, .. } => {
            assert_eq!(code, "SESSION_NOT_FOUND");
            assert_eq!(context.as_ref().unwrap()["target_id"], "nope");
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn test_subscribe_missing_target_is_validation_error() {
    let runtime = Runtime::new(SupervisorConfig::default());
    let (connection, _rx) = Connection::new();
    let replies =
        handle_client_message(parse(r#"{"action":"subscribe"}"#), &connection, &runtime).await;
    assert!(matches!(
        &replies[0],
        ServerMessage::Error { code, .. } if code == "INVALID_REQUEST"
    ));
}

#[tokio::test]
async fn test_subscribe_replays_history_then_confirms() {
    let runtime = Runtime::new(SupervisorConfig::default());
    let result = runtime
        .processes()
        .execute_sync(ExecRequest::new("echo a; echo b; echo c"))
        .await
        .unwrap();

    let (connection, _rx) = Connection::new();
    let request = format!(
        r#"{{"action":"subscribe","type":"process","target_id":"{}","options":{{"levels":["stdout"],"tail":2}}}}"#,
        result.id
    );
    let replies = handle_client_message(parse(&request), &connection, &runtime).await;

    assert_eq!(replies.len(), 3);
    let messages: Vec<&str> = replies[..2]
        .iter()
        .map(|reply| match reply {
            ServerMessage::Log {
                log, is_history, ..
            } => {
                assert!(*is_history);
                log.message.as_str()
            }
            other => panic!("unexpected reply: {other:?}"),
        })
        .collect();
    assert_eq!(messages, vec!["b", "c"]);
    assert!(matches!(
        &replies[2],
        ServerMessage::SubscriptionResult {
            action: SubscriptionAction::Subscribed,
            history_count: Some(2),
            ..
        }
    ));

    let listed = handle_client_message(parse(r#"{"action":"list"}"#), &connection, &runtime).await;
    match &listed[0] {
        ServerMessage::SubscriptionResult {
            subscriptions: Some(subs),
            ..
        } => {
            assert_eq!(subs.len(), 1);
            assert_eq!(subs[0].target_id, result.id);
        }
        other => panic!("unexpected reply: {other:?}"),
    }

    let request = format!(r#"{{"action":"unsubscribe","target_id":"{}"}}"#, result.id);
    let replies = handle_client_message(parse(&request), &connection, &runtime).await;
    assert!(matches!(
        &replies[0],
        ServerMessage::SubscriptionResult {
            action: SubscriptionAction::Unsubscribed,
            ..
        }
    ));
    assert_eq!(runtime.broadcaster().subscriber_count(&result.id), 0);

    // second unsubscribe still succeeds
    let replies = handle_client_message(parse(&request), &connection, &runtime).await;
    assert!(matches!(
        &replies[0],
        ServerMessage::SubscriptionResult { .. }
    ));
}
