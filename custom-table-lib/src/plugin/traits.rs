//! The plugin trait and its identifiers.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde::Serializer;

use crate::error::ValidationReport;

use super::Action;
use super::PluginContext;
use super::RenderArgs;
use super::RenderNode;

/// Identity of a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PluginId {
    RowSelection,
    Pagination,
    SmartCell,
    DragSort,
    LoadMore,
    FetchStatus,
    /// A host-defined plugin.
    Custom(String),
}

impl PluginId {
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::RowSelection => "row-selection",
            Self::Pagination => "pagination",
            Self::SmartCell => "smart-cell",
            Self::DragSort => "drag-sort",
            Self::LoadMore => "load-more",
            Self::FetchStatus => "fetch-status",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PluginId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Named places a plugin can render into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Slot {
    Header,
    Footer,
    Toolbar,
    Alert,
    Filter,
    EmptyState,
    ErrorState,
    LoadMoreButton,
    Cell,
}

impl Slot {
    pub const ALL: [Slot; 9] = [
        Slot::Header,
        Slot::Footer,
        Slot::Toolbar,
        Slot::Alert,
        Slot::Filter,
        Slot::EmptyState,
        Slot::ErrorState,
        Slot::LoadMoreButton,
        Slot::Cell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Footer => "footer",
            Self::Toolbar => "toolbar",
            Self::Alert => "alert",
            Self::Filter => "filter",
            Self::EmptyState => "empty-state",
            Self::ErrorState => "error-state",
            Self::LoadMoreButton => "load-more-button",
            Self::Cell => "cell",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plugin lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleHook {
    Install,
    Activate,
    Deactivate,
    Uninstall,
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Install => "install",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Uninstall => "uninstall",
        })
    }
}

/// A table extension.
///
/// Every method except [`id`](Self::id) has a default. Slot methods return
/// `None` when the plugin has nothing to show; [`render`](Self::render)
/// dispatches a [`Slot`] to them.
///
/// Lifecycle hooks run in the order install, activate, deactivate,
/// uninstall. Slot methods are only called between a successful activate
/// and the start of deactivate.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn id(&self) -> PluginId;

    /// Ordering within a slot; lower renders first.
    fn priority(&self) -> i32 {
        0
    }

    /// Effective configuration, for diagnostics.
    fn config(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Initial plugin-owned state, stored under the plugin id in
    /// `TableState::extensions` at mount.
    fn default_state(&self) -> Option<serde_json::Value> {
        None
    }

    /// Advisory configuration check; never blocks install.
    fn validate(&self) -> ValidationReport {
        ValidationReport::valid()
    }

    async fn install(&self, _cx: &PluginContext) -> Result<(), String> {
        Ok(())
    }

    async fn activate(&self, _cx: &PluginContext) -> Result<(), String> {
        Ok(())
    }

    async fn deactivate(&self, _cx: &PluginContext) -> Result<(), String> {
        Ok(())
    }

    async fn uninstall(&self, _cx: &PluginContext) -> Result<(), String> {
        Ok(())
    }

    /// Called after the controller applied an action.
    fn on_action(&self, _action: &Action, _cx: &PluginContext) {}

    fn header(&self, _cx: &PluginContext) -> Option<RenderNode> {
        None
    }

    fn footer(&self, _cx: &PluginContext) -> Option<RenderNode> {
        None
    }

    fn toolbar(&self, _cx: &PluginContext) -> Option<RenderNode> {
        None
    }

    fn alert(&self, _cx: &PluginContext) -> Option<RenderNode> {
        None
    }

    fn filter(&self, _cx: &PluginContext) -> Option<RenderNode> {
        None
    }

    fn empty_state(&self, _cx: &PluginContext) -> Option<RenderNode> {
        None
    }

    fn error_state(&self, _cx: &PluginContext) -> Option<RenderNode> {
        None
    }

    fn load_more_button(&self, _cx: &PluginContext) -> Option<RenderNode> {
        None
    }

    fn cell(&self, _cx: &PluginContext, _args: &RenderArgs) -> Option<RenderNode> {
        None
    }

    fn render(&self, slot: Slot, cx: &PluginContext, args: &RenderArgs) -> Option<RenderNode> {
        match slot {
            Slot::Header => self.header(cx),
            Slot::Footer => self.footer(cx),
            Slot::Toolbar => self.toolbar(cx),
            Slot::Alert => self.alert(cx),
            Slot::Filter => self.filter(cx),
            Slot::EmptyState => self.empty_state(cx),
            Slot::ErrorState => self.error_state(cx),
            Slot::LoadMoreButton => self.load_more_button(cx),
            Slot::Cell => self.cell(cx, args),
        }
    }
}
