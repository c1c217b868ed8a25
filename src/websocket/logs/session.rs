//! Log stream WebSocket connection loop

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info};

use devbox_core::{Connection, Runtime};

use super::handlers::handle_client_message;
use super::protocol::{ClientMessage, ServerMessage};

async fn send_message(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            error!("Failed to serialize log message: {}", e);
            true
        }
    }
}

/// Handle WebSocket connection
pub async fn handle_socket(socket: WebSocket, runtime: Arc<Runtime>) {
    let (connection, mut deliveries) = Connection::new();
    info!("Log stream connection established: {}", connection.id());

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received message: {}", text);
                        let replies = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handle_client_message(client_msg, &connection, &runtime).await
                            }
                            Err(e) => vec![ServerMessage::error(
                                "INVALID_MESSAGE",
                                format!("Invalid message format: {}", e),
                                None,
                            )],
                        };
                        let mut open = true;
                        for reply in &replies {
                            if !send_message(&mut sender, reply).await {
                                open = false;
                                break;
                            }
                        }
                        if !open {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Log stream connection closed: {}", connection.id());
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            delivery = deliveries.recv() => {
                match delivery {
                    Some(delivery) => {
                        if !send_message(&mut sender, &ServerMessage::from(delivery)).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let released = runtime.broadcaster().disconnect(connection.id());
    info!(
        "Log stream connection ended: {} ({} subscriptions released)",
        connection.id(),
        released
    );
}
