//! Batch action error types

/// Errors returned by `RowSelectionEngine::execute_batch_action`.
///
/// Everything except `Handler` is a refusal that happens before the
/// business handler runs. `Handler` carries the failure of the handler
/// itself, which is always propagated to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchActionError {
    /// No batch action with this key is configured.
    #[error("Batch action '{action}' is not configured")]
    NotFound { action: String },

    /// The current role lacks the action's permission.
    #[error("Permission '{permission}' required for batch action '{action}'")]
    PermissionDenied { action: String, permission: String },

    /// Fewer rows are selected than the action requires.
    #[error("Batch action '{action}' needs at least {required} selected rows, got {selected}")]
    BelowMinimum {
        action: String,
        required: usize,
        selected: usize,
    },

    /// The user declined the confirmation prompt.
    #[error("Batch action '{action}' was not confirmed")]
    NotConfirmed { action: String },

    /// The `before_batch_action` guard vetoed the action.
    #[error("Batch action '{action}' was vetoed")]
    Vetoed { action: String },

    /// The action handler failed.
    #[error("Batch action '{action}' failed: {message}")]
    Handler { action: String, message: String },
}

impl BatchActionError {
    /// Returns the action key this error refers to.
    pub fn action(&self) -> &str {
        match self {
            Self::NotFound { action }
            | Self::PermissionDenied { action, .. }
            | Self::BelowMinimum { action, .. }
            | Self::NotConfirmed { action }
            | Self::Vetoed { action }
            | Self::Handler { action, .. } => action,
        }
    }

    /// Returns `true` if the handler ran and failed.
    pub fn is_handler_failure(&self) -> bool {
        matches!(self, Self::Handler { .. })
    }
}
