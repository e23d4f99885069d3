//! Shared, versioned table state.

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::data_source::RequestParams;
use crate::trace::LogLevel;
use crate::trace::Phase;
use crate::trace::TraceLogCollector;

use super::Command;
use super::TableState;
use super::reduce;

const COMPONENT: &str = "store";

/// Result of dispatching a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State version after the command.
    pub version: u64,
    /// The parameters a request would be issued with changed.
    pub params_changed: bool,
    /// The query or filter context changed (not just the page).
    pub query_context_changed: bool,
}

/// Owns the canonical [`TableState`].
///
/// Cloning a `Store` yields another handle to the same state. All writes go
/// through [`dispatch`](Self::dispatch).
#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<TableState>>,
    version: Arc<AtomicU64>,
    collector: TraceLogCollector,
}

impl Store {
    pub fn new(state: TableState, collector: TraceLogCollector) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            version: Arc::new(AtomicU64::new(0)),
            collector,
        }
    }

    /// Applies a command through the reducer.
    pub fn dispatch(&self, command: Command) -> Transition {
        let name = command.name();
        let context_command = command.changes_query_context();

        let Ok(mut guard) = self.state.write() else {
            self.collector
                .error(Phase::StateChange, COMPONENT, format!("state lock poisoned, dropped {name}"));
            return Transition {
                version: self.version(),
                params_changed: false,
                query_context_changed: false,
            };
        };

        let before = RequestParams::from_state(&guard);
        let current = std::mem::take(&mut *guard);
        *guard = reduce(current, command);
        let params_changed = before != RequestParams::from_state(&guard);
        drop(guard);

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.collector.record_data(
            LogLevel::Debug,
            Phase::StateChange,
            COMPONENT,
            name,
            serde_json::json!({ "version": version, "paramsChanged": params_changed }),
        );

        Transition {
            version,
            params_changed,
            query_context_changed: context_command && params_changed,
        }
    }

    /// Applies several commands in order, merging their transitions.
    pub fn dispatch_all(&self, commands: impl IntoIterator<Item = Command>) -> Transition {
        let mut merged = Transition {
            version: self.version(),
            params_changed: false,
            query_context_changed: false,
        };
        for command in commands {
            let transition = self.dispatch(command);
            merged.version = transition.version;
            merged.params_changed |= transition.params_changed;
            merged.query_context_changed |= transition.query_context_changed;
        }
        merged
    }

    /// Clones the current state.
    pub fn snapshot(&self) -> TableState {
        self.state
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Reads the state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&TableState) -> R) -> Option<R> {
        self.state.read().ok().map(|guard| f(&guard))
    }

    /// Monotonic version, bumped by every dispatch.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Parameters for the current state.
    pub fn request_params(&self) -> RequestParams {
        self.read(RequestParams::from_state).unwrap_or_default()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::Value;
    use crate::trace::NullSink;

    fn store() -> Store {
        Store::new(TableState::new(10), TraceLogCollector::with_sink(NullSink))
    }

    #[test]
    fn test_dispatch_bumps_version() {
        let store = store();
        assert_eq!(store.version(), 0);
        let transition = store.dispatch(Command::SetTotal(30));
        assert_eq!(transition.version, 1);
        assert!(!transition.params_changed);
        assert_eq!(store.snapshot().total(), 30);
    }

    #[test]
    fn test_params_change_detection() {
        let store = store();
        store.dispatch(Command::SetTotal(100));

        let transition = store.dispatch(Command::SetPage(3));
        assert!(transition.params_changed);
        assert!(!transition.query_context_changed);

        let mut query = BTreeMap::new();
        query.insert("name".to_string(), Value::from("x"));
        let transition = store.dispatch(Command::MergeQuery(query.clone()));
        assert!(transition.params_changed);
        assert!(transition.query_context_changed);

        // Same query again: nothing to refetch.
        let transition = store.dispatch(Command::MergeQuery(query));
        assert!(!transition.params_changed);
        assert!(!transition.query_context_changed);
    }

    #[test]
    fn test_dispatch_is_logged() {
        let collector = TraceLogCollector::with_sink(NullSink);
        let store = Store::new(TableState::new(10), collector.clone());
        store.dispatch(Command::FetchStarted);
        let entries = collector.entries_for(Phase::StateChange);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "fetch-started");
    }
}
