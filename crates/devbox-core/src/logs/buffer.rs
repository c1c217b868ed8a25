//! Bounded per-target log buffer

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::types::{LogEntry, LogFilter, LogLevel, TargetType};
use crate::broadcast::LogBroadcaster;

struct BufferState {
    lines: VecDeque<String>,
    entries: VecDeque<LogEntry>,
    last_sequence: u64,
}

/// Ordered raw lines and structured entries for one session or process.
///
/// Append, trim and publish happen as one step under the buffer's own lock,
/// so live delivery order always matches sequence order for the target.
pub struct LogBuffer {
    target_id: String,
    target_type: TargetType,
    capacity: usize,
    broadcaster: Arc<LogBroadcaster>,
    state: Mutex<BufferState>,
}

impl LogBuffer {
    /// Create an empty buffer that publishes through `broadcaster`
    pub fn new(
        target_id: impl Into<String>,
        target_type: TargetType,
        capacity: usize,
        broadcaster: Arc<LogBroadcaster>,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            target_id: target_id.into(),
            target_type,
            capacity,
            broadcaster,
            state: Mutex::new(BufferState {
                lines: VecDeque::with_capacity(capacity.min(64)),
                entries: VecDeque::with_capacity(capacity.min(64)),
                last_sequence: 0,
            }),
        }
    }

    /// Target id
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Target type
    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    /// Bound applied to lines and entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a line, assign the next sequence number and publish it live
    pub async fn append(
        &self,
        level: LogLevel,
        source: &str,
        message: impl Into<String>,
    ) -> LogEntry {
        let message = message.into();
        let mut state = self.state.lock().await;

        state.last_sequence += 1;
        let entry = LogEntry {
            timestamp: chrono::Utc::now().timestamp_millis(),
            level,
            source: source.to_string(),
            target_id: self.target_id.clone(),
            target_type: self.target_type,
            sequence: state.last_sequence,
            message: message.clone(),
        };

        state.lines.push_back(message);
        state.entries.push_back(entry.clone());
        while state.lines.len() > self.capacity {
            state.lines.pop_front();
        }
        while state.entries.len() > self.capacity {
            state.entries.pop_front();
        }

        self.broadcaster.publish(&entry);
        entry
    }

    /// Last `n` entries passing `filter`, oldest first
    pub async fn tail(&self, n: usize, filter: &LogFilter) -> Vec<LogEntry> {
        let state = self.state.lock().await;
        let mut matched: Vec<LogEntry> = state
            .entries
            .iter()
            .rev()
            .filter(|entry| filter.matches(entry))
            .take(n)
            .cloned()
            .collect();
        matched.reverse();
        matched
    }

    /// Last `n` raw lines, oldest first
    pub async fn lines(&self, n: usize) -> Vec<String> {
        let state = self.state.lock().await;
        let skip = state.lines.len().saturating_sub(n);
        state.lines.iter().skip(skip).cloned().collect()
    }

    /// Current `(raw lines, entries)` counts
    pub async fn len(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.lines.len(), state.entries.len())
    }

    /// Whether nothing has been appended yet
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// Sequence number of the newest entry, 0 when empty
    pub async fn last_sequence(&self) -> u64 {
        self.state.lock().await.last_sequence
    }
}

impl std::fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBuffer")
            .field("target_id", &self.target_id)
            .field("target_type", &self.target_type)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
