//! The request function contract.

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::error::RequestError;
use crate::model::Record;
use crate::model::Value;
use crate::state::TableState;

/// Parameter key for the 1-based page number.
pub const PARAM_CURRENT: &str = "current";
/// Parameter key for the page size.
pub const PARAM_PAGE_SIZE: &str = "pageSize";
/// Parameter key for the sort field.
pub const PARAM_SORT_FIELD: &str = "sortField";
/// Parameter key for the sort direction.
pub const PARAM_SORT_ORDER: &str = "sortOrder";

/// Flat parameter map handed to the request function.
///
/// Built from the table state: query entries, then filter selections
/// (as arrays under their field name), then sorting and paging keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RequestParams(BTreeMap<String, Value>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the parameters for the state's current page.
    pub fn from_state(state: &TableState) -> Self {
        Self::for_page(state, state.current())
    }

    /// Builds the parameters for a specific page of the state's query.
    pub fn for_page(state: &TableState, page: usize) -> Self {
        let mut params = BTreeMap::new();
        for (key, value) in state.query() {
            params.insert(key.clone(), value.clone());
        }
        for (field, values) in state.filters() {
            params.insert(field.clone(), Value::Array(values.clone()));
        }
        if let Some(sorter) = state.sorter() {
            params.insert(PARAM_SORT_FIELD.to_string(), Value::from(sorter.field.as_str()));
            params.insert(PARAM_SORT_ORDER.to_string(), Value::from(sorter.order.as_str()));
        }
        params.insert(PARAM_CURRENT.to_string(), Value::from(page.max(1)));
        params.insert(PARAM_PAGE_SIZE.to_string(), Value::from(state.page_size()));
        Self(params)
    }

    /// Sets a parameter (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The requested page, if present.
    pub fn current(&self) -> Option<usize> {
        self.get(PARAM_CURRENT)
            .and_then(Value::as_i64)
            .and_then(|v| usize::try_from(v).ok())
    }

    /// The requested page size, if present.
    pub fn page_size(&self) -> Option<usize> {
        self.get(PARAM_PAGE_SIZE)
            .and_then(Value::as_i64)
            .and_then(|v| usize::try_from(v).ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

/// What the request function resolves to.
///
/// Paginated sources set `total`; streaming sources set `has_more_data`
/// and optionally `need_continue`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchResponse {
    pub data: Vec<Record>,
    pub total: Option<usize>,
    pub has_more_data: Option<bool>,
    /// The source produced a partial increment and wants to be called again
    /// right away.
    pub need_continue: Option<bool>,
}

impl FetchResponse {
    /// A paginated response.
    pub fn page(data: Vec<Record>, total: usize) -> Self {
        Self {
            data,
            total: Some(total),
            ..Default::default()
        }
    }

    /// A streaming increment.
    pub fn increment(data: Vec<Record>, has_more_data: bool) -> Self {
        Self {
            data,
            has_more_data: Some(has_more_data),
            ..Default::default()
        }
    }

    /// Sets the `need_continue` flag.
    pub fn with_need_continue(mut self, need_continue: bool) -> Self {
        self.need_continue = Some(need_continue);
        self
    }

    pub fn has_more(&self) -> bool {
        self.has_more_data.unwrap_or(false)
    }

    pub fn needs_continue(&self) -> bool {
        self.need_continue.unwrap_or(false)
    }
}

/// Host-supplied data loader.
///
/// Implemented for any `Fn(RequestParams) -> impl Future<Output =
/// Result<FetchResponse, RequestError>>`, so a closure is enough:
///
/// ```
/// use custom_table_lib::data_source::{FetchResponse, RequestFn, RequestParams};
/// use custom_table_lib::error::RequestError;
///
/// fn assert_request_fn(_: impl RequestFn) {}
///
/// assert_request_fn(|_params: RequestParams| async move {
///     Ok::<_, RequestError>(FetchResponse::page(Vec::new(), 0))
/// });
/// ```
///
/// The future may be dropped mid-flight when a newer request supersedes it
/// or the table aborts; implementations must tolerate that.
#[async_trait]
pub trait RequestFn: Send + Sync {
    async fn request(&self, params: RequestParams) -> Result<FetchResponse, RequestError>;
}

#[async_trait]
impl<F, Fut> RequestFn for F
where
    F: Fn(RequestParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchResponse, RequestError>> + Send,
{
    async fn request(&self, params: RequestParams) -> Result<FetchResponse, RequestError> {
        (self)(params).await
    }
}
