//! Footer pager for paginated tables.

use crate::data_source::FetchMode;
use crate::error::ValidationIssue;
use crate::error::ValidationReport;
use crate::plugin::Action;
use crate::plugin::Plugin;
use crate::plugin::PluginContext;
use crate::plugin::PluginId;
use crate::plugin::RenderNode;
use crate::state::Command;
use crate::state::PaginationConfig;

/// Renders the pagination descriptor with previous/next controls.
#[derive(Debug, Clone, Default)]
pub struct PaginationPlugin {
    config: PaginationConfig,
}

impl PaginationPlugin {
    pub fn new(config: PaginationConfig) -> Self {
        Self { config }
    }
}

impl Plugin for PaginationPlugin {
    fn id(&self) -> PluginId {
        PluginId::Pagination
    }

    fn priority(&self) -> i32 {
        100
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }

    fn validate(&self) -> ValidationReport {
        let mut issues = Vec::new();
        if self.config.page_size_options.contains(&0) {
            issues.push(ValidationIssue::new("pagination", "page size options must be positive"));
        }
        if self.config.show_size_changer
            && !self.config.page_size_options.is_empty()
            && !self
                .config
                .page_size_options
                .contains(&self.config.default_page_size)
        {
            issues.push(ValidationIssue::with_code(
                "pagination",
                format!(
                    "default page size {} is not among the size options",
                    self.config.default_page_size
                ),
                "page-size-option",
            ));
        }
        ValidationReport::from_issues(issues)
    }

    fn footer(&self, cx: &PluginContext) -> Option<RenderNode> {
        let descriptor = cx.pagination();
        if cx.mode() != FetchMode::Paginated || descriptor.hidden {
            return None;
        }
        Some(RenderNode::group(vec![
            RenderNode::button("Previous", Action::Command(Command::SetPage(descriptor.current.saturating_sub(1))))
                .enabled(descriptor.has_prev),
            RenderNode::Pagination(descriptor.clone()),
            RenderNode::button("Next", Action::Command(Command::SetPage(descriptor.current + 1)))
                .enabled(descriptor.has_next),
        ]))
    }
}
