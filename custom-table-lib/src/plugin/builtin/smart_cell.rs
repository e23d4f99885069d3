//! Data cells resolved through the smart cell resolver.

use crate::plugin::Action;
use crate::plugin::Plugin;
use crate::plugin::PluginContext;
use crate::plugin::PluginId;
use crate::plugin::RenderArgs;
use crate::plugin::RenderNode;
use crate::smart_cell::CellContent;

#[derive(Debug, Clone, Default)]
pub struct SmartCellPlugin;

impl SmartCellPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for SmartCellPlugin {
    fn id(&self) -> PluginId {
        PluginId::SmartCell
    }

    fn priority(&self) -> i32 {
        50
    }

    fn cell(&self, cx: &PluginContext, args: &RenderArgs) -> Option<RenderNode> {
        let field = args.field.as_deref()?;
        let record = args.record.as_ref()?;
        let row_index = args.row_index.unwrap_or(0);

        let cell = cx.helpers().cells().render_smart_cell(record, field, row_index);
        let action = matches!(cell.content, CellContent::Interactive { .. }).then(|| {
            Action::EmptyCellClick {
                field: field.to_string(),
                row_index,
            }
        });
        Some(RenderNode::Cell { cell, action })
    }
}
