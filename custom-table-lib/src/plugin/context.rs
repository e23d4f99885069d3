//! What plugins see and how they change things.

use std::sync::Arc;

use crate::data_source::FetchMode;
use crate::data_source::RetryState;
use crate::model::RowKey;
use crate::selection::RowSelectionEngine;
use crate::smart_cell::SmartCellResolver;
use crate::state::Command;
use crate::state::PaginationDescriptor;
use crate::state::Store;
use crate::state::TableState;
use crate::trace::TraceLogCollector;

use super::PluginId;

/// Named mutations available to plugins.
///
/// Plugins never touch state fields; every change goes through one of
/// these helpers, which dispatch through the store's reducer. Helpers do not
/// fetch. Changes that need new data are expressed as
/// [`Action`](super::Action)s on render nodes instead.
#[derive(Clone)]
pub struct Helpers {
    store: Store,
    selection: Arc<RowSelectionEngine>,
    cells: Arc<SmartCellResolver>,
}

impl Helpers {
    pub fn new(store: Store, selection: Arc<RowSelectionEngine>, cells: Arc<SmartCellResolver>) -> Self {
        Self {
            store,
            selection,
            cells,
        }
    }

    /// Current state, read fresh from the store.
    pub fn state(&self) -> TableState {
        self.store.snapshot()
    }

    pub fn extension(&self, key: &str) -> Option<serde_json::Value> {
        self.store
            .read(|state| state.extension(key).cloned())
            .flatten()
    }

    pub fn set_extension(&self, key: impl Into<String>, value: serde_json::Value) {
        self.store.dispatch(Command::SetExtension {
            key: key.into(),
            value,
        });
    }

    /// Moves a loaded row; out-of-range indices are ignored.
    pub fn reorder_rows(&self, from: usize, to: usize) {
        self.store.dispatch(Command::ReorderRows { from, to });
    }

    pub fn scroll_to(&self, index: usize) {
        self.store.dispatch(Command::ScrollTo(Some(index)));
    }

    pub fn set_changing_page(&self, changing: bool) {
        self.store.dispatch(Command::SetChangingPage(changing));
    }

    pub fn select_row(&self, key: &RowKey, selected: bool) -> bool {
        let changed = self.selection.select_row(key, selected);
        if changed {
            self.sync_selection_extension();
        }
        changed
    }

    pub fn select_all(&self, selected: bool) -> usize {
        let changed = self.selection.select_all(selected);
        if changed > 0 {
            self.sync_selection_extension();
        }
        changed
    }

    pub fn clear_selection(&self) -> usize {
        let cleared = self.selection.clear_selection();
        self.sync_selection_extension();
        cleared
    }

    /// Writes the selected count into the row selection extension.
    ///
    /// No-op unless that extension has been seeded.
    pub fn sync_selection_extension(&self) {
        let key = PluginId::RowSelection.to_string();
        if self.extension(&key).is_none() {
            return;
        }
        let count = self.selection.stat().selected_count;
        self.set_extension(key, serde_json::json!({ "selectedCount": count }));
    }

    /// Read access to the selection engine.
    pub fn selection(&self) -> &RowSelectionEngine {
        &self.selection
    }

    pub fn cells(&self) -> &SmartCellResolver {
        &self.cells
    }
}

impl std::fmt::Debug for Helpers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Helpers")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Snapshot handed to plugin hooks and slot methods.
///
/// Built once per render pass or lifecycle call. The state snapshot does
/// not change under a plugin; [`Helpers::state`] reads the latest.
#[derive(Debug, Clone)]
pub struct PluginContext {
    state: TableState,
    pagination: PaginationDescriptor,
    retry: RetryState,
    mode: FetchMode,
    helpers: Helpers,
    collector: TraceLogCollector,
}

impl PluginContext {
    pub fn new(
        state: TableState,
        pagination: PaginationDescriptor,
        retry: RetryState,
        mode: FetchMode,
        helpers: Helpers,
        collector: TraceLogCollector,
    ) -> Self {
        Self {
            state,
            pagination,
            retry,
            mode,
            helpers,
            collector,
        }
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn pagination(&self) -> &PaginationDescriptor {
        &self.pagination
    }

    pub fn retry(&self) -> &RetryState {
        &self.retry
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    pub fn selection(&self) -> &RowSelectionEngine {
        self.helpers.selection()
    }

    pub fn collector(&self) -> &TraceLogCollector {
        &self.collector
    }
}
