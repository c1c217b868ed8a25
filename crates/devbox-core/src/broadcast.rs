//! Log Broadcaster
//!
//! Publish/subscribe hub between drain workers and live connections.
//!
//! A subscription registers the connection for live delivery first and then
//! snapshots the tail of the target's buffer. A line appended between those
//! two steps can therefore arrive twice: once in the replay and once live.
//! Delivery at the boundary is at-least-once; every delivery carries the
//! entry's sequence number so consumers can drop anything at or below the
//! last sequence they have seen.
//!
//! Each connection has a bounded queue. A subscriber that falls a full queue
//! behind is unregistered rather than buffered without limit; its receiver
//! drains what was queued and then ends, and the client resubscribes with a
//! tail to resynchronise by sequence.

use dashmap::DashMap;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::logs::{LogBuffer, LogEntry, LogFilter, LogLevel, TargetType};

/// Identifies one live connection
pub type ConnectionId = Uuid;

/// Deliveries a connection may have queued before it is dropped as too slow
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 1024;

/// An entry on its way to a connection
#[derive(Debug, Clone)]
pub struct LogDelivery {
    /// The entry
    pub entry: LogEntry,
    /// Replayed from the buffer rather than pushed live
    pub is_history: bool,
}

/// Sending half of a live connection
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    sender: mpsc::Sender<LogDelivery>,
}

impl Connection {
    /// Create a connection and the receiver its transport drains
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<LogDelivery>) {
        Self::with_capacity(SUBSCRIBER_QUEUE_CAPACITY)
    }

    /// Create a connection whose queue holds at most `capacity` deliveries
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<LogDelivery>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: Uuid::new_v4(),
                sender,
            },
            receiver,
        )
    }

    /// Connection id
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Per-subscription options
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// Level and start-time filter
    pub filter: LogFilter,
    /// Number of historical entries to replay
    pub tail: usize,
    /// Keep receiving live entries after the replay
    pub follow: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            filter: LogFilter::all(),
            tail: crate::config::DEFAULT_TAIL,
            follow: true,
        }
    }
}

/// Result of a subscribe call
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Target id
    pub target_id: String,
    /// Target type
    pub target_type: TargetType,
    /// Replayed entries, oldest first
    pub history: Vec<LogEntry>,
    /// Whether the connection is now registered for live entries
    pub following: bool,
}

/// A connection's registration, as reported by [`LogBroadcaster::subscriptions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// Target id
    pub target_id: String,
    /// Target type
    pub target_type: TargetType,
    /// Accepted levels; empty means all
    pub levels: Vec<LogLevel>,
}

struct Registration {
    target_type: TargetType,
    filter: LogFilter,
    sender: mpsc::Sender<LogDelivery>,
}

/// Routes log entries from producers to subscribed connections.
///
/// Registrations are sharded per target id, so publishing a busy target
/// does not block subscribe or unsubscribe on another one.
#[derive(Default)]
pub struct LogBroadcaster {
    subscribers: DashMap<String, HashMap<ConnectionId, Registration>>,
}

impl LogBroadcaster {
    /// Create an empty broadcaster
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` for `buffer`'s target (when following) and
    /// return the replay window.
    pub async fn subscribe(
        &self,
        connection: &Connection,
        buffer: &LogBuffer,
        options: &SubscribeOptions,
    ) -> Subscription {
        let target_id = buffer.target_id().to_string();
        let target_type = buffer.target_type();

        if options.follow {
            self.subscribers.entry(target_id.clone()).or_default().insert(
                connection.id,
                Registration {
                    target_type,
                    filter: options.filter.clone(),
                    sender: connection.sender.clone(),
                },
            );
        }

        let history = buffer.tail(options.tail, &options.filter).await;
        debug!(
            connection_id = %connection.id,
            target_id = %target_id,
            replayed = history.len(),
            follow = options.follow,
            "Log subscription registered"
        );

        Subscription {
            target_id,
            target_type,
            history,
            following: options.follow,
        }
    }

    /// Remove one registration. Returns whether it existed.
    pub fn unsubscribe(&self, connection_id: ConnectionId, target_id: &str) -> bool {
        let removed = match self.subscribers.get_mut(target_id) {
            Some(mut registrations) => registrations.remove(&connection_id).is_some(),
            None => false,
        };
        self.subscribers
            .remove_if(target_id, |_, registrations| registrations.is_empty());
        removed
    }

    /// Remove every registration held by a connection. Returns how many.
    pub fn disconnect(&self, connection_id: ConnectionId) -> usize {
        let mut removed = 0;
        self.subscribers.retain(|_, registrations| {
            if registrations.remove(&connection_id).is_some() {
                removed += 1;
            }
            !registrations.is_empty()
        });
        removed
    }

    /// Drop all registrations for a target that no longer exists
    pub fn remove_target(&self, target_id: &str) {
        self.subscribers.remove(target_id);
    }

    /// Forward `entry` to every matching registration for its target.
    /// Never waits: a connection whose queue is full or closed is
    /// unregistered. Returns the number of connections it was delivered to.
    pub fn publish(&self, entry: &LogEntry) -> usize {
        let mut delivered = 0;
        let mut dropped = Vec::new();

        if let Some(registrations) = self.subscribers.get(&entry.target_id) {
            for (connection_id, registration) in registrations.iter() {
                if !registration.filter.matches(entry) {
                    continue;
                }
                let delivery = LogDelivery {
                    entry: entry.clone(),
                    is_history: false,
                };
                match registration.sender.try_send(delivery) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(
                            connection_id = %connection_id,
                            target_id = %entry.target_id,
                            sequence = entry.sequence,
                            "Subscriber queue full, dropping subscription"
                        );
                        dropped.push(*connection_id);
                    }
                    Err(TrySendError::Closed(_)) => dropped.push(*connection_id),
                }
            }
        }

        if !dropped.is_empty() {
            if let Some(mut registrations) = self.subscribers.get_mut(&entry.target_id) {
                for connection_id in &dropped {
                    registrations.remove(connection_id);
                }
            }
            self.subscribers
                .remove_if(&entry.target_id, |_, registrations| registrations.is_empty());
        }

        delivered
    }

    /// Number of connections following a target
    #[must_use]
    pub fn subscriber_count(&self, target_id: &str) -> usize {
        self.subscribers
            .get(target_id)
            .map(|registrations| registrations.len())
            .unwrap_or(0)
    }

    /// Registrations currently held by a connection
    #[must_use]
    pub fn subscriptions(&self, connection_id: ConnectionId) -> Vec<SubscriptionInfo> {
        let mut infos: Vec<SubscriptionInfo> = self
            .subscribers
            .iter()
            .filter_map(|item| {
                item.value()
                    .get(&connection_id)
                    .map(|registration| SubscriptionInfo {
                        target_id: item.key().clone(),
                        target_type: registration.target_type,
                        levels: registration.filter.levels.iter().copied().collect(),
                    })
            })
            .collect();
        infos.sort_by(|a, b| a.target_id.cmp(&b.target_id));
        infos
    }
}

impl std::fmt::Debug for LogBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBroadcaster")
            .field("targets", &self.subscribers.len())
            .finish()
    }
}
