//! Batch actions over the selected rows.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::model::Record;
use crate::model::RowKey;

/// What a batch handler receives.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchInvocation {
    pub action: String,
    pub keys: Vec<RowKey>,
    pub rows: Vec<Record>,
}

/// Business logic behind a batch action.
///
/// Implemented for `Fn(BatchInvocation) -> impl Future<Output = Result<(), String>>`.
#[async_trait]
pub trait BatchHandler: Send + Sync {
    async fn handle(&self, invocation: BatchInvocation) -> Result<(), String>;
}

#[async_trait]
impl<F, Fut> BatchHandler for F
where
    F: Fn(BatchInvocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), String>> + Send,
{
    async fn handle(&self, invocation: BatchInvocation) -> Result<(), String> {
        (self)(invocation).await
    }
}

/// Answers whether the current user holds a permission.
pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, permission: &str) -> bool;
}

impl<F> PermissionChecker for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn has_permission(&self, permission: &str) -> bool {
        (self)(permission)
    }
}

/// Asks the user to confirm a batch action.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, action: &BatchAction, selected: usize) -> bool;
}

/// Hook run right before a batch handler; returning `false` vetoes it.
#[async_trait]
pub trait BatchGuard: Send + Sync {
    async fn before_batch_action(&self, invocation: &BatchInvocation) -> bool;
}

/// A named operation over the selected rows.
#[derive(Clone)]
pub struct BatchAction {
    pub key: String,
    pub label: String,
    /// Permission required to run the action.
    pub permission: Option<String>,
    /// Minimum number of selected rows.
    pub min_selection: usize,
    /// Ask for confirmation before running.
    pub confirm: bool,
    /// Keep the selection after a successful run.
    pub keep_selection: bool,
    pub(crate) handler: Arc<dyn BatchHandler>,
}

impl BatchAction {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        handler: impl BatchHandler + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            permission: None,
            min_selection: 1,
            confirm: false,
            keep_selection: false,
            handler: Arc::new(handler),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn with_min_selection(mut self, min: usize) -> Self {
        self.min_selection = min;
        self
    }

    pub fn with_confirm(mut self) -> Self {
        self.confirm = true;
        self
    }

    pub fn with_keep_selection(mut self) -> Self {
        self.keep_selection = true;
        self
    }
}

impl std::fmt::Debug for BatchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchAction")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("permission", &self.permission)
            .field("min_selection", &self.min_selection)
            .field("confirm", &self.confirm)
            .finish_non_exhaustive()
    }
}
