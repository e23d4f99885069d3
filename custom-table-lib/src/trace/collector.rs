//! Phase-tagged trace collector with a bounded buffer.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::LogCrateSink;
use super::LogEntry;
use super::LogLevel;
use super::LogSink;
use super::Phase;

/// Default number of retained entries.
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Structured, phase-tagged log collector.
///
/// Each collector carries its own trace id and a capped ring buffer of the
/// most recent entries; older entries are dropped. Every entry is also
/// forwarded to a [`LogSink`]. Recording never fails: sink errors and sink
/// panics are swallowed and counted.
///
/// The collector is cheap to clone (uses `Arc` internally); clones share the
/// buffer and trace id. A table controller owns one and hands clones to its
/// components instead of relying on a process-wide global.
///
/// # Example
///
/// ```
/// use custom_table_lib::trace::{Phase, TraceLogCollector};
///
/// let collector = TraceLogCollector::new();
/// collector.info(Phase::Init, "controller", "mounted");
///
/// let report = collector.report();
/// assert_eq!(report.total_recorded, 1);
/// assert_eq!(report.by_phase[&Phase::Init], 1);
/// ```
#[derive(Clone)]
pub struct TraceLogCollector {
    inner: Arc<CollectorInner>,
}

struct CollectorInner {
    trace_id: String,
    capacity: usize,
    buffer: Mutex<VecDeque<LogEntry>>,
    sink: Arc<dyn LogSink>,
    total_recorded: AtomicU64,
    sink_failures: AtomicU64,
}

impl TraceLogCollector {
    /// Creates a collector forwarding to the `log` facade.
    pub fn new() -> Self {
        Self::with_sink(LogCrateSink)
    }

    /// Creates a collector forwarding to a custom sink.
    pub fn with_sink(sink: impl LogSink + 'static) -> Self {
        Self::with_sink_and_capacity(sink, DEFAULT_LOG_CAPACITY)
    }

    /// Creates a collector with a custom sink and buffer capacity.
    pub fn with_sink_and_capacity(sink: impl LogSink + 'static, capacity: usize) -> Self {
        Self::with_shared_sink_and_capacity(Arc::new(sink), capacity)
    }

    /// Like [`with_sink_and_capacity`](Self::with_sink_and_capacity) for an already shared sink.
    pub fn with_shared_sink_and_capacity(sink: Arc<dyn LogSink>, capacity: usize) -> Self {
        Self {
            inner: Arc::new(CollectorInner {
                trace_id: Uuid::new_v4().to_string(),
                capacity: capacity.max(1),
                buffer: Mutex::new(VecDeque::with_capacity(capacity.clamp(1, 4096))),
                sink,
                total_recorded: AtomicU64::new(0),
                sink_failures: AtomicU64::new(0),
            }),
        }
    }

    /// The trace id shared by every entry from this collector.
    pub fn trace_id(&self) -> &str {
        &self.inner.trace_id
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Records an entry.
    pub fn record(
        &self,
        level: LogLevel,
        phase: Phase,
        component: &str,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            trace_id: self.inner.trace_id.clone(),
            phase,
            level,
            component: component.to_string(),
            message: message.into(),
            data,
        };

        let sink = &self.inner.sink;
        let delivered = std::panic::catch_unwind(AssertUnwindSafe(|| sink.emit(&entry)));
        if !matches!(delivered, Ok(Ok(()))) {
            self.inner.sink_failures.fetch_add(1, Ordering::Relaxed);
        }

        self.inner.total_recorded.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut buffer) = self.inner.buffer.lock() {
            if buffer.len() >= self.inner.capacity {
                buffer.pop_front();
            }
            buffer.push_back(entry);
        }
    }

    pub fn debug(&self, phase: Phase, component: &str, message: impl Into<String>) {
        self.record(LogLevel::Debug, phase, component, message, None);
    }

    pub fn info(&self, phase: Phase, component: &str, message: impl Into<String>) {
        self.record(LogLevel::Info, phase, component, message, None);
    }

    pub fn warn(&self, phase: Phase, component: &str, message: impl Into<String>) {
        self.record(LogLevel::Warn, phase, component, message, None);
    }

    pub fn error(&self, phase: Phase, component: &str, message: impl Into<String>) {
        self.record(LogLevel::Error, phase, component, message, None);
    }

    /// Records an entry with a structured payload.
    pub fn record_data(
        &self,
        level: LogLevel,
        phase: Phase,
        component: &str,
        message: impl Into<String>,
        data: serde_json::Value,
    ) {
        self.record(level, phase, component, message, Some(data));
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner
            .buffer
            .lock()
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Retained entries for one phase, oldest first.
    pub fn entries_for(&self, phase: Phase) -> Vec<LogEntry> {
        self.inner
            .buffer
            .lock()
            .map(|buffer| buffer.iter().filter(|e| e.phase == phase).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.inner.buffer.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all retained entries. Counters are kept.
    pub fn clear(&self) {
        if let Ok(mut buffer) = self.inner.buffer.lock() {
            buffer.clear();
        }
    }

    /// Builds an aggregate report over the retained buffer.
    pub fn report(&self) -> TraceReport {
        let entries = self.entries();
        let mut by_phase = BTreeMap::new();
        let mut error_count = 0;
        let mut warning_count = 0;

        for entry in &entries {
            *by_phase.entry(entry.phase).or_insert(0) += 1;
            match entry.level {
                LogLevel::Error => error_count += 1,
                LogLevel::Warn => warning_count += 1,
                _ => {}
            }
        }

        let total_recorded = self.inner.total_recorded.load(Ordering::Relaxed);
        TraceReport {
            trace_id: self.inner.trace_id.clone(),
            generated_at: Utc::now(),
            total_recorded,
            dropped: total_recorded.saturating_sub(entries.len() as u64),
            by_phase,
            error_count,
            warning_count,
            sink_failures: self.inner.sink_failures.load(Ordering::Relaxed),
            entries,
        }
    }

    /// Serializes the report as pretty JSON.
    ///
    /// Falls back to a minimal document if serialization fails.
    pub fn export_logs(&self) -> String {
        let report = self.report();
        serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
            serde_json::json!({
                "traceId": report.trace_id,
                "exportError": e.to_string(),
            })
            .to_string()
        })
    }
}

impl Default for TraceLogCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TraceLogCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceLogCollector")
            .field("trace_id", &self.inner.trace_id)
            .field("capacity", &self.inner.capacity)
            .field("len", &self.len())
            .finish()
    }
}

/// Aggregate view over a collector's buffer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceReport {
    pub trace_id: String,
    pub generated_at: DateTime<Utc>,
    /// Entries recorded over the collector's lifetime.
    pub total_recorded: u64,
    /// Entries evicted from the ring buffer.
    pub dropped: u64,
    pub by_phase: BTreeMap<Phase, usize>,
    pub error_count: usize,
    pub warning_count: usize,
    pub sink_failures: u64,
    pub entries: Vec<LogEntry>,
}
