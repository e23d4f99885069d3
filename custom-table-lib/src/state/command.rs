//! State transitions.
//!
//! Every change to a [`TableState`] is a [`Command`] applied by the pure
//! [`reduce`] function. Invariants (page clamping, page-size bounds, data
//! truncation) are enforced here and nowhere else.

use std::collections::BTreeMap;

use crate::error::RequestError;
use crate::model::Record;
use crate::model::Value;

use super::Sorter;
use super::TableState;
use super::pagination::{clamp_page, page_after_size_change};

/// What a [`Command::Reset`] keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetOptions {
    pub keep_query: bool,
    pub keep_filters: bool,
    pub keep_sorter: bool,
    pub keep_page_size: bool,
    /// Keep row selection (handled by the controller, ignored by `reduce`).
    pub keep_selection: bool,
}

impl ResetOptions {
    /// Reset everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn keep_query(mut self) -> Self {
        self.keep_query = true;
        self
    }

    pub fn keep_filters(mut self) -> Self {
        self.keep_filters = true;
        self
    }

    pub fn keep_sorter(mut self) -> Self {
        self.keep_sorter = true;
        self
    }

    pub fn keep_page_size(mut self) -> Self {
        self.keep_page_size = true;
        self
    }

    pub fn keep_selection(mut self) -> Self {
        self.keep_selection = true;
        self
    }
}

/// A state transition request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the whole query.
    SetQuery(BTreeMap<String, Value>),
    /// Merge into the query; `Value::Null` removes a key.
    MergeQuery(BTreeMap<String, Value>),
    /// Restore the initial query.
    ResetQuery,
    /// Merge filter selections; an empty selection removes the field.
    SetFilters(BTreeMap<String, Vec<Value>>),
    ClearFilters,
    SetSorter(Option<Sorter>),
    SetPage(usize),
    SetPageSize(usize),
    SetTotal(usize),
    SetChangingPage(bool),
    FetchStarted,
    /// A paginated response: replaces data.
    PageLoaded {
        data: Vec<Record>,
        total: Option<usize>,
    },
    /// A streaming increment: replaces or appends data.
    StreamLoaded {
        data: Vec<Record>,
        total: Option<usize>,
        has_more: bool,
        append: bool,
        page: usize,
    },
    FetchFailed(RequestError),
    /// A superseded or aborted fetch finished without applying data.
    FetchSettled,
    ReorderRows {
        from: usize,
        to: usize,
    },
    SetExtension {
        key: String,
        value: serde_json::Value,
    },
    ScrollTo(Option<usize>),
    Reset(ResetOptions),
}

impl Command {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetQuery(_) => "set-query",
            Self::MergeQuery(_) => "merge-query",
            Self::ResetQuery => "reset-query",
            Self::SetFilters(_) => "set-filters",
            Self::ClearFilters => "clear-filters",
            Self::SetSorter(_) => "set-sorter",
            Self::SetPage(_) => "set-page",
            Self::SetPageSize(_) => "set-page-size",
            Self::SetTotal(_) => "set-total",
            Self::SetChangingPage(_) => "set-changing-page",
            Self::FetchStarted => "fetch-started",
            Self::PageLoaded { .. } => "page-loaded",
            Self::StreamLoaded { .. } => "stream-loaded",
            Self::FetchFailed(_) => "fetch-failed",
            Self::FetchSettled => "fetch-settled",
            Self::ReorderRows { .. } => "reorder-rows",
            Self::SetExtension { .. } => "set-extension",
            Self::ScrollTo(_) => "scroll-to",
            Self::Reset(_) => "reset",
        }
    }

    /// Returns `true` if this command changes the query or filter context
    /// (as opposed to paging within the same result set).
    pub fn changes_query_context(&self) -> bool {
        matches!(
            self,
            Self::SetQuery(_)
                | Self::MergeQuery(_)
                | Self::ResetQuery
                | Self::SetFilters(_)
                | Self::ClearFilters
                | Self::Reset(_)
        )
    }
}

/// Applies a command to a state and returns the new state.
pub fn reduce(mut state: TableState, command: Command) -> TableState {
    match command {
        Command::SetQuery(query) => {
            state.query = without_nulls(query);
            state.current = 1;
        }
        Command::MergeQuery(partial) => {
            for (key, value) in partial {
                if value.is_null() {
                    state.query.remove(&key);
                } else {
                    state.query.insert(key, value);
                }
            }
            state.current = 1;
        }
        Command::ResetQuery => {
            state.query = state.defaults.query.clone();
            state.current = 1;
        }
        Command::SetFilters(filters) => {
            for (field, values) in filters {
                if values.is_empty() {
                    state.filters.remove(&field);
                } else {
                    state.filters.insert(field, values);
                }
            }
            state.current = 1;
        }
        Command::ClearFilters => {
            state.filters.clear();
            state.current = 1;
        }
        Command::SetSorter(sorter) => {
            state.sorter = sorter;
            state.current = 1;
        }
        Command::SetPage(page) => {
            state.current = clamp_page(page, state.total, state.page_size);
        }
        Command::SetPageSize(size) => {
            let size = size.max(1);
            state.current = page_after_size_change(state.current, state.page_size, size);
            state.page_size = size;
            state.current = clamp_page(state.current, state.total, size);
        }
        Command::SetTotal(total) => {
            state.total = total;
        }
        Command::SetChangingPage(changing) => {
            state.is_changing_page = changing;
        }
        Command::FetchStarted => {
            state.loading = true;
        }
        Command::PageLoaded { mut data, total } => {
            data.truncate(state.page_size);
            state.total = total.unwrap_or(data.len());
            state.data = data;
            state.error = None;
            state.loading = false;
            state.is_changing_page = false;
            state.has_more_data = false;
        }
        Command::StreamLoaded {
            data,
            total,
            has_more,
            append,
            page,
        } => {
            if append {
                state.data.extend(data);
            } else {
                state.data = data;
            }
            state.total = total.unwrap_or(state.data.len()).max(state.data.len());
            state.has_more_data = has_more;
            state.current = page.max(1);
            state.error = None;
            state.loading = false;
            state.is_changing_page = false;
        }
        Command::FetchFailed(error) => {
            state.error = Some(error);
            state.loading = false;
            state.is_changing_page = false;
        }
        Command::FetchSettled => {
            state.loading = false;
            state.is_changing_page = false;
        }
        Command::ReorderRows { from, to } => {
            let len = state.data.len();
            if from < len && to < len && from != to {
                let row = state.data.remove(from);
                state.data.insert(to, row);
            }
        }
        Command::SetExtension { key, value } => {
            state.extensions.insert(key, value);
        }
        Command::ScrollTo(index) => {
            state.scroll_target = index;
        }
        Command::Reset(options) => {
            let mut fresh = TableState::with_query(
                if options.keep_page_size {
                    state.page_size
                } else {
                    state.defaults.page_size
                },
                state.defaults.query.clone(),
            );
            fresh.defaults = state.defaults.clone();
            fresh.extensions = std::mem::take(&mut state.extensions);
            if options.keep_query {
                fresh.query = std::mem::take(&mut state.query);
            }
            if options.keep_filters {
                fresh.filters = std::mem::take(&mut state.filters);
            }
            if options.keep_sorter {
                fresh.sorter = state.sorter.take();
            }
            state = fresh;
        }
    }
    state
}

fn without_nulls(map: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    map.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<Record> {
        (0..n).map(|i| Record::new().set("id", i)).collect()
    }

    fn query(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_page_never_below_one() {
        let state = reduce(TableState::new(10), Command::SetPage(0));
        assert_eq!(state.current(), 1);
    }

    #[test]
    fn test_page_clamped_to_total() {
        let state = reduce(TableState::new(10), Command::SetTotal(25));
        let state = reduce(state, Command::SetPage(7));
        assert_eq!(state.current(), 3);
    }

    #[test]
    fn test_page_loaded_truncates_to_page_size() {
        let state = reduce(
            TableState::new(3),
            Command::PageLoaded {
                data: rows(5),
                total: Some(40),
            },
        );
        assert_eq!(state.data().len(), 3);
        assert_eq!(state.total(), 40);
        assert!(!state.loading());
    }

    #[test]
    fn test_stream_append() {
        let state = reduce(
            TableState::new(2),
            Command::StreamLoaded {
                data: rows(2),
                total: None,
                has_more: true,
                append: false,
                page: 1,
            },
        );
        let state = reduce(
            state,
            Command::StreamLoaded {
                data: rows(1),
                total: None,
                has_more: false,
                append: true,
                page: 2,
            },
        );
        assert_eq!(state.data().len(), 3);
        assert_eq!(state.total(), 3);
        assert!(!state.has_more_data());
        assert_eq!(state.current(), 2);
    }

    #[test]
    fn test_merge_query_null_removes() {
        let state = reduce(
            TableState::new(10),
            Command::SetQuery(query(&[("name", "a".into()), ("status", "up".into())])),
        );
        let state = reduce(
            state,
            Command::MergeQuery(query(&[("name", Value::Null), ("region", "eu".into())])),
        );
        assert_eq!(
            state.query(),
            &query(&[("region", "eu".into()), ("status", "up".into())])
        );
    }

    #[test]
    fn test_query_change_resets_page() {
        let state = reduce(TableState::new(10), Command::SetTotal(100));
        let state = reduce(state, Command::SetPage(4));
        let state = reduce(state, Command::MergeQuery(query(&[("q", "x".into())])));
        assert_eq!(state.current(), 1);
    }

    #[test]
    fn test_reset_query_restores_initial() {
        let initial = query(&[("status", "active".into())]);
        let state = TableState::with_query(10, initial.clone());
        let state = reduce(state, Command::SetQuery(query(&[("q", "x".into())])));
        let state = reduce(state, Command::ResetQuery);
        assert_eq!(state.query(), &initial);
    }

    #[test]
    fn test_filters_merge_and_remove() {
        let mut filters = BTreeMap::new();
        filters.insert("status".to_string(), vec![Value::from("up")]);
        let state = reduce(TableState::new(10), Command::SetFilters(filters));

        let mut removal = BTreeMap::new();
        removal.insert("status".to_string(), Vec::new());
        let state = reduce(state, Command::SetFilters(removal));
        assert!(state.filters().is_empty());
    }

    #[test]
    fn test_reorder_rows() {
        let state = reduce(
            TableState::new(10),
            Command::PageLoaded {
                data: rows(3),
                total: None,
            },
        );
        let state = reduce(state, Command::ReorderRows { from: 0, to: 2 });
        let ids: Vec<_> = state.data().iter().map(|r| r.get_i64("id").unwrap()).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(0)]);

        // Out of range is a no-op.
        let unchanged = reduce(state.clone(), Command::ReorderRows { from: 9, to: 0 });
        assert_eq!(unchanged, state);
    }

    #[test]
    fn test_reset_keeps_requested_parts() {
        let state = reduce(TableState::new(10), Command::SetPageSize(50));
        let state = reduce(state, Command::SetQuery(query(&[("q", "x".into())])));
        let state = reduce(
            state,
            Command::SetExtension {
                key: "drag-sort".into(),
                value: serde_json::json!({"enabled": true}),
            },
        );

        let reset = reduce(state.clone(), Command::Reset(ResetOptions::all().keep_page_size()));
        assert_eq!(reset.page_size(), 50);
        assert!(reset.query().is_empty());
        assert!(reset.extension("drag-sort").is_some());

        let reset = reduce(state, Command::Reset(ResetOptions::all()));
        assert_eq!(reset.page_size(), 10);
    }

    #[test]
    fn test_reset_keep_sorter() {
        let state = reduce(
            TableState::new(10),
            Command::SetSorter(Some(Sorter::desc("name"))),
        );
        let state = reduce(state, Command::SetFilters(BTreeMap::from([(
            "tag".to_string(),
            vec![Value::from("a")],
        )])));

        let options = ResetOptions::all().keep_sorter();
        assert!(options.keep_sorter);
        let reset = reduce(state.clone(), Command::Reset(options));
        assert_eq!(reset.sorter(), Some(&Sorter::desc("name")));
        assert!(reset.filters().is_empty());

        let reset = reduce(state, Command::Reset(ResetOptions::all()));
        assert!(reset.sorter().is_none());
    }

    #[test]
    fn test_fetch_failed_keeps_data() {
        let state = reduce(
            TableState::new(10),
            Command::PageLoaded {
                data: rows(2),
                total: None,
            },
        );
        let state = reduce(state, Command::FetchStarted);
        let state = reduce(state, Command::FetchFailed(RequestError::new("boom")));
        assert_eq!(state.data().len(), 2);
        assert!(state.error().is_some());
        assert!(!state.loading());
    }
}
