//! Structured log model
//!
//! Sessions and processes both turn their output into [`LogEntry`] values
//! kept in a bounded [`LogBuffer`]. The buffer is also the publish point for
//! live delivery through the [`crate::broadcast::LogBroadcaster`].

mod buffer;
mod types;


pub use buffer::LogBuffer;
pub use types::{LogEntry, LogFilter, LogLevel, TargetType};
