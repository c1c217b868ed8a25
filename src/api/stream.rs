//! Server-Sent Events log streaming for `?stream=true` log requests

use axum::response::sse::{Event, KeepAlive, Sse};
use devbox_core::{Connection, ConnectionId, LogFilter, Runtime, SubscribeOptions, TargetType};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

use super::response::ApiError;
use crate::websocket::logs::protocol::ServerMessage;

/// Query parameters for log requests
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    /// Number of most recent entries
    pub tail: Option<usize>,
    /// Answer with an event stream that keeps following
    #[serde(default)]
    pub stream: bool,
}

/// Releases the stream's registrations when the client goes away
struct StreamGuard {
    runtime: Arc<Runtime>,
    connection_id: ConnectionId,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.runtime.broadcaster().disconnect(self.connection_id);
        debug!(connection_id = %self.connection_id, "Log stream released");
    }
}

fn to_event(message: &ServerMessage) -> Event {
    Event::default()
        .event("log")
        .json_data(message)
        .unwrap_or_else(|_| Event::default().event("error").data("serialization failed"))
}

/// Replay the tail of a target's log, then follow it
pub async fn log_event_stream(
    runtime: Arc<Runtime>,
    target_type: TargetType,
    target_id: &str,
    tail: Option<usize>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (connection, receiver) = Connection::new();
    let options = SubscribeOptions {
        filter: LogFilter::all(),
        tail: tail.unwrap_or(runtime.config().default_tail),
        follow: true,
    };
    let subscription = runtime
        .subscribe(&connection, target_type, target_id, &options)
        .await?;

    let guard = StreamGuard {
        runtime: runtime.clone(),
        connection_id: connection.id(),
    };
    let history = stream::iter(
        subscription
            .history
            .into_iter()
            .map(|entry| ServerMessage::log(entry, true)),
    );
    let live = stream::unfold((receiver, guard), |(mut receiver, guard)| async move {
        receiver
            .recv()
            .await
            .map(|delivery| (ServerMessage::from(delivery), (receiver, guard)))
    });

    let events = history
        .chain(live)
        .map(|message| Ok::<_, Infallible>(to_event(&message)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
