//! Log stream protocol messages

use devbox_core::{
    Error, LogDelivery, LogEntry, LogFilter, LogLevel, SubscribeOptions, SubscriptionInfo,
    TargetType,
};
use serde::{Deserialize, Serialize};

/// Client request action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    Subscribe,
    Unsubscribe,
    List,
}

/// Subscription options as sent by clients
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOptions {
    /// Levels to receive; empty means all
    #[serde(default)]
    pub levels: Vec<LogLevel>,
    /// Replay window
    #[serde(default)]
    pub tail: Option<usize>,
    /// Keep streaming after the replay (default true)
    #[serde(default)]
    pub follow: Option<bool>,
    /// Epoch milliseconds; older entries are skipped
    #[serde(default)]
    pub start_time: Option<i64>,
}

impl WireOptions {
    pub fn to_subscribe_options(&self, default_tail: usize) -> SubscribeOptions {
        let mut filter = LogFilter::all().with_levels(self.levels.iter().copied());
        if let Some(start) = self.start_time {
            filter = filter.since(start);
        }
        SubscribeOptions {
            filter,
            tail: self.tail.unwrap_or(default_tail),
            follow: self.follow.unwrap_or(true),
        }
    }
}

/// Messages from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    pub action: ClientAction,
    #[serde(rename = "type", default)]
    pub target_type: Option<TargetType>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub options: WireOptions,
}

/// Subscription acknowledgement kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    Subscribed,
    Unsubscribed,
    Listed,
}

/// One registration in a `listed` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionView {
    #[serde(rename = "type")]
    pub target_type: TargetType,
    pub target_id: String,
    pub levels: Vec<LogLevel>,
}

impl From<SubscriptionInfo> for SubscriptionView {
    fn from(info: SubscriptionInfo) -> Self {
        Self {
            target_type: info.target_type,
            target_id: info.target_id,
            levels: info.levels,
        }
    }
}

/// Messages from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A log entry, replayed or live
    Log {
        #[serde(rename = "dataType")]
        data_type: TargetType,
        target_id: String,
        log: LogEntry,
        sequence: u64,
        #[serde(rename = "isHistory")]
        is_history: bool,
    },
    /// Result of subscribe, unsubscribe or list
    SubscriptionResult {
        action: SubscriptionAction,
        #[serde(rename = "dataType", skip_serializing_if = "Option::is_none")]
        data_type: Option<TargetType>,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        history_count: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        follow: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        subscriptions: Option<Vec<SubscriptionView>>,
    },
    /// Request failed
    Error {
        error: String,
        code: String,
        timestamp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<serde_json::Value>,
    },
}

impl ServerMessage {
    pub fn log(entry: LogEntry, is_history: bool) -> Self {
        Self::Log {
            data_type: entry.target_type,
            target_id: entry.target_id.clone(),
            sequence: entry.sequence,
            log: entry,
            is_history,
        }
    }

    pub fn error(
        code: impl Into<String>,
        error: impl Into<String>,
        context: Option<serde_json::Value>,
    ) -> Self {
        Self::Error {
            error: error.into(),
            code: code.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            context,
        }
    }

    pub fn from_error(err: &Error, context: Option<serde_json::Value>) -> Self {
        Self::error(err.code(), err.to_string(), context)
    }
}

impl From<LogDelivery> for ServerMessage {
    fn from(delivery: LogDelivery) -> Self {
        Self::log(delivery.entry, delivery.is_history)
    }
}
