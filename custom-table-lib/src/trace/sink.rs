//! Log sinks
//!
//! A sink is the external transport a [`TraceLogCollector`](super::TraceLogCollector)
//! forwards entries to. Sink failures are counted by the collector and never
//! reach the code that emitted the entry.

use super::LogEntry;

/// Error returned by a sink that failed to deliver an entry.
#[derive(Debug, Clone, thiserror::Error)]
#[error("log sink failed: {0}")]
pub struct SinkError(pub String);

/// Destination for trace entries.
pub trait LogSink: Send + Sync {
    /// Delivers one entry.
    fn emit(&self, entry: &LogEntry) -> Result<(), SinkError>;
}

/// Forwards entries to the `log` facade at the matching level.
///
/// The log target is `custom_table::<component>`, so hosts can filter
/// per component with their logger configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn emit(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let target = format!("custom_table::{}", entry.component);
        match &entry.data {
            Some(data) => log::log!(
                target: &target,
                entry.level.to_log_level(),
                "[{}][{}] {} {}",
                entry.trace_id,
                entry.phase,
                entry.message,
                data
            ),
            None => log::log!(
                target: &target,
                entry.level.to_log_level(),
                "[{}][{}] {}",
                entry.trace_id,
                entry.phase,
                entry.message
            ),
        }
        Ok(())
    }
}

/// Discards every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn emit(&self, _entry: &LogEntry) -> Result<(), SinkError> {
        Ok(())
    }
}
