//! Empty and error states, including the auto-retry countdown.

use crate::data_source::RetryState;
use crate::plugin::Action;
use crate::plugin::Plugin;
use crate::plugin::PluginContext;
use crate::plugin::PluginId;
use crate::plugin::RenderNode;

#[derive(Debug, Clone)]
pub struct FetchStatusPlugin {
    empty_text: String,
}

impl Default for FetchStatusPlugin {
    fn default() -> Self {
        Self {
            empty_text: "No data".to_string(),
        }
    }
}

impl FetchStatusPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_empty_text(mut self, text: impl Into<String>) -> Self {
        self.empty_text = text.into();
        self
    }
}

impl Plugin for FetchStatusPlugin {
    fn id(&self) -> PluginId {
        PluginId::FetchStatus
    }

    fn empty_state(&self, cx: &PluginContext) -> Option<RenderNode> {
        let state = cx.state();
        if !state.is_empty() || state.error().is_some() {
            return None;
        }
        Some(RenderNode::text(self.empty_text.clone()))
    }

    fn error_state(&self, cx: &PluginContext) -> Option<RenderNode> {
        match cx.retry() {
            RetryState::Countdown {
                remaining, error, ..
            } => Some(RenderNode::group(vec![
                RenderNode::text(error.user_message()),
                RenderNode::text(format!("Retrying in {remaining}s")),
                RenderNode::button("Cancel", Action::CancelAutoRetry),
            ])),
            RetryState::Manual { error } => Some(RenderNode::group(vec![
                RenderNode::text(error.user_message()),
                RenderNode::button("Retry", Action::Retry),
            ])),
            RetryState::Idle => cx.state().error().map(|error| {
                RenderNode::group(vec![
                    RenderNode::text(error.user_message()),
                    RenderNode::button("Retry", Action::Retry),
                ])
            }),
        }
    }
}
