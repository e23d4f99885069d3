//! Drag handles and row reordering.

use std::sync::Arc;

use crate::model::Record;
use crate::plugin::Action;
use crate::plugin::Plugin;
use crate::plugin::PluginContext;
use crate::plugin::PluginId;
use crate::plugin::RenderArgs;
use crate::plugin::RenderNode;
use crate::state::Command;

/// A completed drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragEnd {
    pub from: usize,
    pub to: usize,
    /// Rows in their new order.
    pub data: Vec<Record>,
}

type DragEndCallback = Arc<dyn Fn(&DragEnd) + Send + Sync>;

/// Renders a drag handle per row.
///
/// Dropping dispatches `Command::ReorderRows`; the plugin then reports the
/// new order through the optional drag-end callback. Dragging can be turned
/// off at runtime through the `drag-sort` extension state.
#[derive(Clone, Default)]
pub struct DragSortPlugin {
    on_drag_end: Option<DragEndCallback>,
}

impl DragSortPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_drag_end(mut self, f: impl Fn(&DragEnd) + Send + Sync + 'static) -> Self {
        self.on_drag_end = Some(Arc::new(f));
        self
    }

    fn enabled(cx: &PluginContext) -> bool {
        cx.state()
            .extension(PluginId::DragSort.as_str())
            .and_then(|state| state.get("enabled"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true)
    }
}

impl Plugin for DragSortPlugin {
    fn id(&self) -> PluginId {
        PluginId::DragSort
    }

    fn priority(&self) -> i32 {
        5
    }

    fn default_state(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "enabled": true }))
    }

    fn cell(&self, cx: &PluginContext, args: &RenderArgs) -> Option<RenderNode> {
        if args.field.is_some() || !Self::enabled(cx) {
            return None;
        }
        Some(RenderNode::DragHandle {
            row_index: args.row_index?,
        })
    }

    fn on_action(&self, action: &Action, cx: &PluginContext) {
        let Action::Command(Command::ReorderRows { from, to }) = action else {
            return;
        };
        if let Some(callback) = &self.on_drag_end {
            callback(&DragEnd {
                from: *from,
                to: *to,
                data: cx.state().data().to_vec(),
            });
        }
    }
}

impl std::fmt::Debug for DragSortPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragSortPlugin")
            .field("on_drag_end", &self.on_drag_end.is_some())
            .finish()
    }
}
