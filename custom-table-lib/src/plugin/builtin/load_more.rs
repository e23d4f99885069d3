//! Load-more button for streaming tables.

use crate::data_source::FetchMode;
use crate::plugin::Action;
use crate::plugin::Plugin;
use crate::plugin::PluginContext;
use crate::plugin::PluginId;
use crate::plugin::RenderNode;

/// Shows a load-more button while the source reports more data, and an
/// end-of-data note once it does not.
#[derive(Debug, Clone)]
pub struct LoadMorePlugin {
    label: String,
    end_text: String,
}

impl Default for LoadMorePlugin {
    fn default() -> Self {
        Self {
            label: "Load more".to_string(),
            end_text: "No more data".to_string(),
        }
    }
}

impl LoadMorePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_end_text(mut self, text: impl Into<String>) -> Self {
        self.end_text = text.into();
        self
    }
}

impl Plugin for LoadMorePlugin {
    fn id(&self) -> PluginId {
        PluginId::LoadMore
    }

    fn priority(&self) -> i32 {
        90
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({ "label": self.label, "endText": self.end_text })
    }

    fn load_more_button(&self, cx: &PluginContext) -> Option<RenderNode> {
        let state = cx.state();
        if cx.mode() != FetchMode::Streaming || !state.has_more_data() {
            return None;
        }
        Some(RenderNode::button(self.label.clone(), Action::LoadMore).enabled(!state.loading()))
    }

    fn footer(&self, cx: &PluginContext) -> Option<RenderNode> {
        let state = cx.state();
        if cx.mode() != FetchMode::Streaming || state.has_more_data() || state.data().is_empty() {
            return None;
        }
        Some(RenderNode::text(self.end_text.clone()))
    }
}
