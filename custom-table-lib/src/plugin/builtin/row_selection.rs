//! Selection checkboxes, selection summary and batch-action buttons.

use crate::plugin::Action;
use crate::plugin::Plugin;
use crate::plugin::PluginContext;
use crate::plugin::PluginId;
use crate::plugin::RenderArgs;
use crate::plugin::RenderNode;
use crate::selection::SelectionMode;

/// Renders selection UI on top of the controller's selection engine.
#[derive(Debug, Clone, Default)]
pub struct RowSelectionPlugin;

impl RowSelectionPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for RowSelectionPlugin {
    fn id(&self) -> PluginId {
        PluginId::RowSelection
    }

    fn priority(&self) -> i32 {
        10
    }

    fn default_state(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "selectedCount": 0 }))
    }

    fn header(&self, cx: &PluginContext) -> Option<RenderNode> {
        let selection = cx.selection();
        if selection.config().mode == SelectionMode::Single {
            return None;
        }
        let page = selection.page_keys();
        let checked = selection.is_page_selected();
        let any = page.iter().any(|k| selection.is_selected(k));
        Some(RenderNode::Checkbox {
            checked,
            indeterminate: any && !checked,
            action: Action::SelectAll(!checked),
            enabled: !page.is_empty(),
        })
    }

    fn cell(&self, cx: &PluginContext, args: &RenderArgs) -> Option<RenderNode> {
        // Row-level only; data cells carry a field.
        if args.field.is_some() {
            return None;
        }
        let selection = cx.selection();
        let key = args.record.as_ref()?.key(&selection.config().row_key)?;
        let checked = selection.is_selected(&key);
        let at_cap = selection
            .config()
            .max_selection
            .is_some_and(|max| selection.stat().selected_count >= max);
        Some(RenderNode::Checkbox {
            checked,
            indeterminate: false,
            action: Action::SelectRow {
                key,
                selected: !checked,
            },
            enabled: checked || !at_cap || selection.config().mode == SelectionMode::Single,
        })
    }

    fn alert(&self, cx: &PluginContext) -> Option<RenderNode> {
        let stat = cx.selection().stat();
        if stat.selected_count == 0 {
            return None;
        }
        Some(RenderNode::group(vec![
            RenderNode::text(format!("{} selected", stat.selected_count)),
            RenderNode::stat("Selected", format!("{}%", stat.selected_percent)),
            RenderNode::button("Clear", Action::ClearSelection),
        ]))
    }

    fn toolbar(&self, cx: &PluginContext) -> Option<RenderNode> {
        let selection = cx.selection();
        let actions = &selection.config().batch_actions;
        if actions.is_empty() {
            return None;
        }
        let selected = selection.stat().selected_count;
        Some(RenderNode::group(
            actions
                .iter()
                .map(|action| {
                    RenderNode::button(action.label.clone(), Action::BatchAction(action.key.clone()))
                        .enabled(selected >= action.min_selection.max(1))
                })
                .collect(),
        ))
    }
}
