//! Canonical table state.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::error::RequestError;
use crate::model::Record;
use crate::model::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascend,
    Descend,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascend => "ascend",
            Self::Descend => "descend",
        }
    }
}

/// The single active sort column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sorter {
    pub field: String,
    pub order: SortOrder,
}

impl Sorter {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascend,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descend,
        }
    }
}

/// Values restored by a reset.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StateDefaults {
    pub page_size: usize,
    pub query: BTreeMap<String, Value>,
}

/// Everything the table knows about its current view.
///
/// Fields are read through accessors; the only way to change a state is
/// [`reduce`](super::reduce), which enforces the invariants:
///
/// - `current >= 1`
/// - `page_size >= 1`
/// - in paginated mode `data.len() <= page_size`
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    pub(crate) query: BTreeMap<String, Value>,
    pub(crate) filters: BTreeMap<String, Vec<Value>>,
    pub(crate) sorter: Option<Sorter>,
    pub(crate) current: usize,
    pub(crate) page_size: usize,
    pub(crate) total: usize,
    pub(crate) data: Vec<Record>,
    pub(crate) error: Option<RequestError>,
    pub(crate) is_changing_page: bool,
    pub(crate) loading: bool,
    pub(crate) has_more_data: bool,
    pub(crate) extensions: BTreeMap<String, serde_json::Value>,
    pub(crate) scroll_target: Option<usize>,
    pub(crate) defaults: StateDefaults,
}

impl TableState {
    /// Creates the mount-time state: page 1, no data.
    pub fn new(page_size: usize) -> Self {
        Self::with_query(page_size, BTreeMap::new())
    }

    /// Creates the mount-time state with an initial query.
    ///
    /// The initial query is also what `ResetQuery` restores.
    pub fn with_query(page_size: usize, query: BTreeMap<String, Value>) -> Self {
        let page_size = page_size.max(1);
        Self {
            query: query.clone(),
            filters: BTreeMap::new(),
            sorter: None,
            current: 1,
            page_size,
            total: 0,
            data: Vec::new(),
            error: None,
            is_changing_page: false,
            loading: false,
            has_more_data: false,
            extensions: BTreeMap::new(),
            scroll_target: None,
            defaults: StateDefaults { page_size, query },
        }
    }

    pub fn query(&self) -> &BTreeMap<String, Value> {
        &self.query
    }

    pub fn filters(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.filters
    }

    pub fn sorter(&self) -> Option<&Sorter> {
        self.sorter.as_ref()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn data(&self) -> &[Record] {
        &self.data
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    pub fn is_changing_page(&self) -> bool {
        self.is_changing_page
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Streaming mode: whether another increment can be loaded.
    pub fn has_more_data(&self) -> bool {
        self.has_more_data
    }

    /// Plugin-owned state seeded from `Plugin::default_state`.
    pub fn extension(&self, key: &str) -> Option<&serde_json::Value> {
        self.extensions.get(key)
    }

    pub fn extensions(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extensions
    }

    /// Row index most recently requested by `scroll_to_row`.
    pub fn scroll_target(&self) -> Option<usize> {
        self.scroll_target
    }

    /// Returns `true` when there is no data and no fetch is running.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && !self.loading
    }
}

impl Default for TableState {
    fn default() -> Self {
        Self::new(super::DEFAULT_PAGE_SIZE)
    }
}
