//! Plugin error types

use crate::plugin::LifecycleHook;
use crate::plugin::PluginId;

/// Errors raised by the plugin manager.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PluginError {
    /// A plugin with the same identity is already registered.
    #[error("Plugin '{0}' is already registered")]
    Duplicate(PluginId),

    /// No plugin with this identity is registered.
    #[error("Plugin '{0}' not found")]
    NotFound(PluginId),

    /// A lifecycle hook failed or panicked.
    #[error("Plugin '{plugin}' failed during {hook}: {message}")]
    Lifecycle {
        /// The failing plugin.
        plugin: PluginId,
        /// The hook that failed.
        hook: LifecycleHook,
        /// Failure message (or panic payload).
        message: String,
    },
}

impl PluginError {
    /// Creates a lifecycle failure.
    pub fn lifecycle(plugin: PluginId, hook: LifecycleHook, message: impl Into<String>) -> Self {
        Self::Lifecycle {
            plugin,
            hook,
            message: message.into(),
        }
    }
}
