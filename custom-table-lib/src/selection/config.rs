//! Selection configuration and statistics.

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use super::BatchAction;
use super::BatchGuard;
use super::Confirmer;
use super::PermissionChecker;

/// Whether one or many rows can be selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMode {
    Single,
    #[default]
    Multi,
}

/// Row selection options.
#[derive(Clone)]
pub struct SelectionConfig {
    /// Field holding the row key.
    pub row_key: String,
    pub mode: SelectionMode,
    /// Upper bound on selected rows.
    pub max_selection: Option<usize>,
    /// Keep the selection when the query or filters change.
    pub cross_page: bool,
    pub batch_actions: Vec<BatchAction>,
    pub(crate) permission_checker: Option<Arc<dyn PermissionChecker>>,
    pub(crate) confirmer: Option<Arc<dyn Confirmer>>,
    pub(crate) guard: Option<Arc<dyn BatchGuard>>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::new("id")
    }
}

impl SelectionConfig {
    pub fn new(row_key: impl Into<String>) -> Self {
        Self {
            row_key: row_key.into(),
            mode: SelectionMode::Multi,
            max_selection: None,
            cross_page: false,
            batch_actions: Vec::new(),
            permission_checker: None,
            confirmer: None,
            guard: None,
        }
    }

    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_selection(mut self, max: usize) -> Self {
        self.max_selection = Some(max);
        self
    }

    pub fn with_cross_page(mut self, enabled: bool) -> Self {
        self.cross_page = enabled;
        self
    }

    pub fn with_batch_action(mut self, action: BatchAction) -> Self {
        self.batch_actions.push(action);
        self
    }

    pub fn with_permission_checker(mut self, checker: impl PermissionChecker + 'static) -> Self {
        self.permission_checker = Some(Arc::new(checker));
        self
    }

    pub fn with_confirmer(mut self, confirmer: impl Confirmer + 'static) -> Self {
        self.confirmer = Some(Arc::new(confirmer));
        self
    }

    /// Sets the hook that may veto a batch action right before it runs.
    pub fn with_before_batch_action(mut self, guard: impl BatchGuard + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Looks up a batch action by key.
    pub fn batch_action(&self, key: &str) -> Option<&BatchAction> {
        self.batch_actions.iter().find(|action| action.key == key)
    }
}

impl std::fmt::Debug for SelectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionConfig")
            .field("row_key", &self.row_key)
            .field("mode", &self.mode)
            .field("max_selection", &self.max_selection)
            .field("cross_page", &self.cross_page)
            .field("batch_actions", &self.batch_actions)
            .finish_non_exhaustive()
    }
}

/// Derived selection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionStat {
    pub selected_count: usize,
    pub total_count: usize,
    pub current_page_count: usize,
    /// `round(selected / total * 100)`, 0 when there are no rows.
    pub selected_percent: u32,
}

impl SelectionStat {
    pub fn new(selected_count: usize, total_count: usize, current_page_count: usize) -> Self {
        let selected_percent = if total_count == 0 {
            0
        } else {
            (selected_count as f64 / total_count as f64 * 100.0).round() as u32
        };
        Self {
            selected_count,
            total_count,
            current_page_count,
            selected_percent,
        }
    }
}
