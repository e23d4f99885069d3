//! The row selection engine.

use std::panic::AssertUnwindSafe;
use std::sync::RwLock;

use futures::FutureExt;

use crate::error::BatchActionError;
use crate::model::Record;
use crate::model::RowKey;
use crate::panic::extract_panic_message;
use crate::trace::LogLevel;
use crate::trace::Phase;
use crate::trace::TraceLogCollector;

use super::BatchAction;
use super::BatchInvocation;
use super::SelectionCache;
use super::SelectionConfig;
use super::SelectionMode;
use super::SelectionStat;

const COMPONENT: &str = "row-selection";

#[derive(Debug, Default)]
struct SelectionInner {
    /// Insertion order is kept for stable checkbox rendering.
    selected: Vec<RowKey>,
    /// Cumulative keys across pages; only maintained in cross-page mode.
    all_selected: Vec<RowKey>,
    page_keys: Vec<RowKey>,
    total: usize,
    cache: SelectionCache,
    version: u64,
}

impl SelectionInner {
    fn is_selected(&self, key: &RowKey) -> bool {
        self.selected.contains(key)
    }

    fn push(&mut self, key: RowKey, cross_page: bool) {
        if cross_page && !self.all_selected.contains(&key) {
            self.all_selected.push(key.clone());
        }
        self.selected.push(key);
    }

    fn remove(&mut self, key: &RowKey) -> bool {
        let before = self.selected.len();
        self.selected.retain(|k| k != key);
        self.all_selected.retain(|k| k != key);
        before != self.selected.len()
    }

    /// Drops cached rows that are neither on the page nor selected.
    fn prune_cache(&mut self) {
        let SelectionInner {
            selected,
            page_keys,
            cache,
            ..
        } = self;
        cache.retain(|key| selected.contains(key) || page_keys.contains(key));
    }
}

/// Tracks selected row keys and runs batch actions over them.
///
/// The engine is the only writer of its [`SelectionCache`]. All mutations
/// go through `select_row`, `select_all`, `clear_selection` and
/// `sync_page`; a configured `max_selection` is never exceeded.
pub struct RowSelectionEngine {
    config: SelectionConfig,
    inner: RwLock<SelectionInner>,
    collector: TraceLogCollector,
}

impl RowSelectionEngine {
    pub fn new(config: SelectionConfig, collector: TraceLogCollector) -> Self {
        Self {
            config,
            inner: RwLock::new(SelectionInner::default()),
            collector,
        }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Refreshes the current page's keys and cached rows.
    pub fn sync_page(&self, data: &[Record], total: usize) {
        let row_key = &self.config.row_key;
        let mut missing = 0;
        let Ok(mut inner) = self.inner.write() else {
            return;
        };

        inner.page_keys.clear();
        for record in data {
            match record.key(row_key) {
                Some(key) => {
                    inner.cache.set(key.clone(), record.clone());
                    inner.page_keys.push(key);
                }
                None => missing += 1,
            }
        }
        inner.total = total;
        inner.prune_cache();
        inner.version += 1;
        drop(inner);

        if missing > 0 {
            self.collector.warn(
                Phase::Selection,
                COMPONENT,
                format!("{missing} rows have no '{row_key}' key and cannot be selected"),
            );
        }
    }

    /// Adds or removes one key.
    ///
    /// Returns `true` if the selection changed. Selecting past
    /// `max_selection` is refused with a logged warning.
    pub fn select_row(&self, key: &RowKey, selected: bool) -> bool {
        let cross_page = self.config.cross_page;
        let single = self.config.mode == SelectionMode::Single;
        let Ok(mut inner) = self.inner.write() else {
            return false;
        };

        let changed = if selected {
            // Single mode replaces the current key, so nothing else is kept.
            let kept = if single { 0 } else { inner.selected.len() };
            if inner.is_selected(key) {
                false
            } else if self.config.max_selection.is_some_and(|max| kept >= max) {
                drop(inner);
                self.collector.record_data(
                    LogLevel::Warn,
                    Phase::Selection,
                    COMPONENT,
                    "max selection reached",
                    serde_json::json!({
                        "key": key.as_str(),
                        "maxSelection": self.config.max_selection,
                    }),
                );
                return false;
            } else {
                if single {
                    inner.selected.clear();
                    inner.all_selected.clear();
                }
                inner.push(key.clone(), cross_page);
                true
            }
        } else {
            inner.remove(key)
        };

        if changed {
            inner.prune_cache();
            inner.version += 1;
        }
        changed
    }

    /// Selects or deselects every key on the current page.
    ///
    /// Under a cap only the first available keys in page order are added.
    /// Returns the number of keys that changed.
    pub fn select_all(&self, selected: bool) -> usize {
        if selected && self.config.mode == SelectionMode::Single {
            self.collector.warn(
                Phase::Selection,
                COMPONENT,
                "select all is not available in single selection mode",
            );
            return 0;
        }

        let cross_page = self.config.cross_page;
        let Ok(mut inner) = self.inner.write() else {
            return 0;
        };

        let mut changed = 0;
        let mut skipped = 0;
        let page_keys = inner.page_keys.clone();
        for key in page_keys {
            if selected {
                if inner.is_selected(&key) {
                    continue;
                }
                if self
                    .config
                    .max_selection
                    .is_some_and(|max| inner.selected.len() >= max)
                {
                    skipped += 1;
                    continue;
                }
                inner.push(key, cross_page);
                changed += 1;
            } else if inner.remove(&key) {
                changed += 1;
            }
        }

        if changed > 0 {
            inner.prune_cache();
            inner.version += 1;
        }
        drop(inner);

        if skipped > 0 {
            self.collector.record_data(
                LogLevel::Warn,
                Phase::Selection,
                COMPONENT,
                "select all truncated by max selection",
                serde_json::json!({
                    "added": changed,
                    "skipped": skipped,
                    "maxSelection": self.config.max_selection,
                }),
            );
        }
        changed
    }

    /// Deselects everything. Returns the number of keys removed.
    pub fn clear_selection(&self) -> usize {
        let Ok(mut inner) = self.inner.write() else {
            return 0;
        };
        let cleared = inner.selected.len();
        inner.selected.clear();
        inner.all_selected.clear();
        inner.prune_cache();
        inner.version += 1;
        drop(inner);

        if cleared > 0 {
            self.collector.debug(
                Phase::Selection,
                COMPONENT,
                format!("cleared {cleared} selected rows"),
            );
        }
        cleared
    }

    /// Selected keys in insertion order.
    pub fn selected_keys(&self) -> Vec<RowKey> {
        self.read(|inner| inner.selected.clone()).unwrap_or_default()
    }

    /// Cached records for the selected keys, in selection order.
    ///
    /// Keys whose record was never loaded are skipped.
    pub fn selected_rows(&self) -> Vec<Record> {
        self.read(|inner| {
            inner
                .selected
                .iter()
                .filter_map(|key| inner.cache.get(key).cloned())
                .collect()
        })
        .unwrap_or_default()
    }

    /// Cumulative cross-page keys, or `None` when cross-page mode is off.
    pub fn all_selected_keys(&self) -> Option<Vec<RowKey>> {
        if !self.config.cross_page {
            return None;
        }
        self.read(|inner| inner.all_selected.clone())
    }

    pub fn is_selected(&self, key: &RowKey) -> bool {
        self.read(|inner| inner.is_selected(key)).unwrap_or(false)
    }

    /// Keys of the rows on the current page.
    pub fn page_keys(&self) -> Vec<RowKey> {
        self.read(|inner| inner.page_keys.clone())
            .unwrap_or_default()
    }

    /// Returns `true` if every key on the page is selected.
    pub fn is_page_selected(&self) -> bool {
        self.read(|inner| {
            !inner.page_keys.is_empty() && inner.page_keys.iter().all(|k| inner.is_selected(k))
        })
        .unwrap_or(false)
    }

    /// Derived counters, recomputed on every call.
    pub fn stat(&self) -> SelectionStat {
        self.read(|inner| {
            SelectionStat::new(inner.selected.len(), inner.total, inner.page_keys.len())
        })
        .unwrap_or_default()
    }

    /// Bumped on every selection or page change.
    pub fn version(&self) -> u64 {
        self.read(|inner| inner.version).unwrap_or(0)
    }

    /// Read access to the row cache.
    pub fn with_cache<R>(&self, f: impl FnOnce(&SelectionCache) -> R) -> Option<R> {
        self.read(|inner| f(&inner.cache))
    }

    /// Runs a configured batch action over the current selection.
    pub async fn execute_batch_action(&self, key: &str) -> Result<(), BatchActionError> {
        let Some(action) = self.config.batch_action(key).cloned() else {
            self.collector.warn(
                Phase::BatchAction,
                COMPONENT,
                format!("unknown batch action '{key}'"),
            );
            return Err(BatchActionError::NotFound {
                action: key.to_string(),
            });
        };
        let keys = self.selected_keys();
        let rows = self.selected_rows();
        self.run_batch_action(&action, keys, rows).await
    }

    /// Runs a batch action over explicit keys and rows.
    ///
    /// Checks run in order: permission, minimum selection, confirmation,
    /// the `before_batch_action` guard. A refusal is logged as a warning and
    /// returned. A handler failure (or panic) is logged as an error and
    /// returned as [`BatchActionError::Handler`].
    pub async fn run_batch_action(
        &self,
        action: &BatchAction,
        keys: Vec<RowKey>,
        rows: Vec<Record>,
    ) -> Result<(), BatchActionError> {
        let name = action.key.clone();

        if let (Some(permission), Some(checker)) =
            (&action.permission, &self.config.permission_checker)
            && !checker.has_permission(permission)
        {
            return Err(self.refuse(BatchActionError::PermissionDenied {
                action: name,
                permission: permission.clone(),
            }));
        }

        if keys.len() < action.min_selection {
            return Err(self.refuse(BatchActionError::BelowMinimum {
                action: name,
                required: action.min_selection,
                selected: keys.len(),
            }));
        }

        if action.confirm
            && let Some(confirmer) = &self.config.confirmer
            && !confirmer.confirm(action, keys.len()).await
        {
            return Err(self.refuse(BatchActionError::NotConfirmed { action: name }));
        }

        let invocation = BatchInvocation {
            action: name.clone(),
            keys,
            rows,
        };

        if let Some(guard) = &self.config.guard
            && !guard.before_batch_action(&invocation).await
        {
            return Err(self.refuse(BatchActionError::Vetoed { action: name }));
        }

        let count = invocation.keys.len();
        self.collector.info(
            Phase::BatchAction,
            COMPONENT,
            format!("running '{name}' on {count} rows"),
        );

        let result = AssertUnwindSafe(action.handler.handle(invocation))
            .catch_unwind()
            .await;
        let message = match result {
            Ok(Ok(())) => {
                self.collector
                    .info(Phase::BatchAction, COMPONENT, format!("'{name}' completed"));
                if !action.keep_selection {
                    self.clear_selection();
                }
                return Ok(());
            }
            Ok(Err(message)) => message,
            Err(panic) => format!("handler panicked: {}", extract_panic_message(&panic)),
        };

        self.collector.record_data(
            LogLevel::Error,
            Phase::BatchAction,
            COMPONENT,
            format!("'{name}' failed"),
            serde_json::json!({ "message": message, "rows": count }),
        );
        Err(BatchActionError::Handler {
            action: name,
            message,
        })
    }

    fn refuse(&self, error: BatchActionError) -> BatchActionError {
        self.collector
            .warn(Phase::BatchAction, COMPONENT, error.to_string());
        error
    }

    fn read<R>(&self, f: impl FnOnce(&SelectionInner) -> R) -> Option<R> {
        self.inner.read().ok().map(|inner| f(&inner))
    }
}

impl std::fmt::Debug for RowSelectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowSelectionEngine")
            .field("config", &self.config)
            .field("selected", &self.selected_keys())
            .finish_non_exhaustive()
    }
}
