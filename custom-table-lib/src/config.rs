//! Table configuration

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::data_source::AutoRetryConfig;
use crate::data_source::FetchMode;
use crate::model::Value;
use crate::state::PaginationConfig;
use crate::trace::DEFAULT_LOG_CAPACITY;

/// Controller-wide settings.
///
/// Loadable from JSON; every field has a default.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use custom_table_lib::TableConfig;
/// use custom_table_lib::data_source::FetchMode;
///
/// let config = TableConfig::default()
///     .with_row_key("uuid")
///     .with_mode(FetchMode::Streaming)
///     .with_debounce(Duration::from_millis(150));
/// assert_eq!(config.row_key, "uuid");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableConfig {
    /// Field holding the row key.
    ///
    /// Default: `"id"`
    pub row_key: String,

    pub mode: FetchMode,

    pub pagination: PaginationConfig,

    pub auto_retry: AutoRetryConfig,

    /// Quiet period before a query or filter change triggers a fetch.
    ///
    /// Default: 300 ms
    pub debounce: Duration,

    /// Clear the selection when the query or filters change, unless
    /// cross-page selection is on.
    ///
    /// Default: true
    pub clear_selection_on_query_change: bool,

    /// Retained trace entries.
    ///
    /// Default: 500
    pub log_capacity: usize,

    /// Follow-up increments fetched automatically while the source sets
    /// `needContinue`.
    ///
    /// Default: 5
    pub max_auto_continue: usize,

    /// Skip the fetch on mount; data loads on the first explicit refresh.
    pub manual_request: bool,

    /// Query applied at mount and restored by `reset_query`.
    pub initial_query: BTreeMap<String, Value>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_key: "id".to_string(),
            mode: FetchMode::Paginated,
            pagination: PaginationConfig::default(),
            auto_retry: AutoRetryConfig::default(),
            debounce: Duration::from_millis(300),
            clear_selection_on_query_change: true,
            log_capacity: DEFAULT_LOG_CAPACITY,
            max_auto_continue: 5,
            manual_request: false,
            initial_query: BTreeMap::new(),
        }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_key(mut self, field: impl Into<String>) -> Self {
        self.row_key = field.into();
        self
    }

    pub fn with_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_auto_retry(mut self, auto_retry: AutoRetryConfig) -> Self {
        self.auto_retry = auto_retry;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_clear_selection_on_query_change(mut self, clear: bool) -> Self {
        self.clear_selection_on_query_change = clear;
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn with_max_auto_continue(mut self, n: usize) -> Self {
        self.max_auto_continue = n;
        self
    }

    pub fn with_manual_request(mut self, manual: bool) -> Self {
        self.manual_request = manual;
        self
    }

    pub fn with_initial_query(mut self, query: BTreeMap<String, Value>) -> Self {
        self.initial_query = query;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let config: TableConfig =
            serde_json::from_str(r#"{"rowKey":"uid","mode":"streaming","maxAutoContinue":2}"#)
                .unwrap();
        assert_eq!(config.row_key, "uid");
        assert_eq!(config.mode, FetchMode::Streaming);
        assert_eq!(config.max_auto_continue, 2);
        assert_eq!(config.auto_retry.delay_ticks, 3);
        assert!(config.clear_selection_on_query_change);
    }
}
