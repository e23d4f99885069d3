//! Log entry types

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

/// Severity of a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The matching `log` crate level.
    pub fn to_log_level(self) -> log::Level {
        match self {
            Self::Debug => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warn => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

/// The engine phase an entry was emitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Init,
    Install,
    Activate,
    Render,
    Fetch,
    Retry,
    Selection,
    BatchAction,
    StateChange,
    Export,
    Validation,
    Deactivate,
    Uninstall,
}

impl Phase {
    /// Kebab-case name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Install => "install",
            Self::Activate => "activate",
            Self::Render => "render",
            Self::Fetch => "fetch",
            Self::Retry => "retry",
            Self::Selection => "selection",
            Self::BatchAction => "batch-action",
            Self::StateChange => "state-change",
            Self::Export => "export",
            Self::Validation => "validation",
            Self::Deactivate => "deactivate",
            Self::Uninstall => "uninstall",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, structured log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
    pub phase: Phase,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}
