//! Log stream request handlers

use devbox_core::{Connection, Error, Runtime};
use serde_json::json;
use tracing::debug;

use super::protocol::{ClientAction, ClientMessage, ServerMessage, SubscriptionAction};

/// Handle one client message; returns the replies in send order
pub async fn handle_client_message(
    msg: ClientMessage,
    connection: &Connection,
    runtime: &Runtime,
) -> Vec<ServerMessage> {
    match msg.action {
        ClientAction::Subscribe => handle_subscribe(msg, connection, runtime).await,
        ClientAction::Unsubscribe => vec![handle_unsubscribe(msg, connection, runtime)],
        ClientAction::List => vec![handle_list(connection, runtime)],
    }
}

async fn handle_subscribe(
    msg: ClientMessage,
    connection: &Connection,
    runtime: &Runtime,
) -> Vec<ServerMessage> {
    let context = json!({
        "action": "subscribe",
        "type": msg.target_type,
        "target_id": msg.target_id,
    });
    let (Some(target_type), Some(target_id)) = (msg.target_type, msg.target_id) else {
        let err = Error::Validation("subscribe requires type and target_id".to_string());
        return vec![ServerMessage::from_error(&err, Some(context))];
    };

    let options = msg
        .options
        .to_subscribe_options(runtime.config().default_tail);
    match runtime
        .subscribe(connection, target_type, &target_id, &options)
        .await
    {
        Ok(subscription) => {
            debug!(
                connection_id = %connection.id(),
                target_id = %target_id,
                replayed = subscription.history.len(),
                "Subscribed to logs"
            );
            let history_count = subscription.history.len();
            let mut replies: Vec<ServerMessage> = subscription
                .history
                .into_iter()
                .map(|entry| ServerMessage::log(entry, true))
                .collect();
            replies.push(ServerMessage::SubscriptionResult {
                action: SubscriptionAction::Subscribed,
                data_type: Some(target_type),
                target_id: Some(target_id),
                history_count: Some(history_count),
                follow: Some(subscription.following),
                subscriptions: None,
            });
            replies
        }
        Err(err) => vec![ServerMessage::from_error(&err, Some(context))],
    }
}

fn handle_unsubscribe(
    msg: ClientMessage,
    connection: &Connection,
    runtime: &Runtime,
) -> ServerMessage {
    let Some(target_id) = msg.target_id else {
        let err = Error::Validation("unsubscribe requires target_id".to_string());
        return ServerMessage::from_error(&err, Some(json!({ "action": "unsubscribe" })));
    };

    let removed = runtime.unsubscribe(connection.id(), &target_id);
    debug!(connection_id = %connection.id(), target_id = %target_id, removed, "Unsubscribed");
    ServerMessage::SubscriptionResult {
        action: SubscriptionAction::Unsubscribed,
        data_type: msg.target_type,
        target_id: Some(target_id),
        history_count: None,
        follow: None,
        subscriptions: None,
    }
}

fn handle_list(connection: &Connection, runtime: &Runtime) -> ServerMessage {
    let subscriptions = runtime
        .broadcaster()
        .subscriptions(connection.id())
        .into_iter()
        .map(Into::into)
        .collect();
    ServerMessage::SubscriptionResult {
        action: SubscriptionAction::Listed,
        data_type: None,
        target_id: None,
        history_count: None,
        follow: None,
        subscriptions: Some(subscriptions),
    }
}
