//! Renderer-agnostic output of plugin slots.

use serde::Serialize;

use crate::model::Record;
use crate::model::RowKey;
use crate::smart_cell::CellRender;
use crate::state::Command;
use crate::state::PaginationDescriptor;

/// A user intent attached to a render node.
///
/// The host routes these back through `TableController::dispatch`, which
/// applies them and refetches when needed.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Apply a state command.
    Command(Command),
    Refresh,
    LoadMore,
    Retry,
    CancelAutoRetry,
    SelectRow { key: RowKey, selected: bool },
    SelectAll(bool),
    ClearSelection,
    BatchAction(String),
    EmptyCellClick { field: String, row_index: usize },
}

/// A node produced by a plugin slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderNode {
    Text {
        text: String,
    },
    Button {
        label: String,
        #[serde(skip)]
        action: Action,
        enabled: bool,
    },
    Checkbox {
        checked: bool,
        indeterminate: bool,
        #[serde(skip)]
        action: Action,
        enabled: bool,
    },
    Stat {
        label: String,
        value: String,
    },
    Pagination(PaginationDescriptor),
    Cell {
        cell: CellRender,
        #[serde(skip)]
        action: Option<Action>,
    },
    DragHandle {
        row_index: usize,
    },
    Group {
        children: Vec<RenderNode>,
    },
    /// Host-defined payload.
    Custom {
        data: serde_json::Value,
    },
}

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn button(label: impl Into<String>, action: Action) -> Self {
        Self::Button {
            label: label.into(),
            action,
            enabled: true,
        }
    }

    pub fn stat(label: impl Into<String>, value: impl ToString) -> Self {
        Self::Stat {
            label: label.into(),
            value: value.to_string(),
        }
    }

    pub fn group(children: Vec<RenderNode>) -> Self {
        Self::Group { children }
    }

    /// Sets `enabled` on buttons and checkboxes; other nodes are unchanged.
    pub fn enabled(mut self, value: bool) -> Self {
        if let Self::Button { enabled, .. } | Self::Checkbox { enabled, .. } = &mut self {
            *enabled = value;
        }
        self
    }

    /// The node's action, if it carries one.
    pub fn action(&self) -> Option<&Action> {
        match self {
            Self::Button { action, .. } | Self::Checkbox { action, .. } => Some(action),
            Self::Cell { action, .. } => action.as_ref(),
            _ => None,
        }
    }

    /// Depth-first search for the first button with this label.
    pub fn find_button(&self, label: &str) -> Option<&RenderNode> {
        match self {
            Self::Button { label: l, .. } if l == label => Some(self),
            Self::Group { children } => children.iter().find_map(|c| c.find_button(label)),
            _ => None,
        }
    }

    /// All text content, depth-first, joined by spaces.
    pub fn plain_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ")
    }

    fn collect_text(&self, parts: &mut Vec<String>) {
        match self {
            Self::Text { text } => parts.push(text.clone()),
            Self::Button { label, .. } => parts.push(label.clone()),
            Self::Stat { label, value } => parts.push(format!("{label}: {value}")),
            Self::Pagination(descriptor) => parts.push(descriptor.total_text()),
            Self::Cell { cell, .. } => {
                if let Some(text) = cell.content.text() {
                    parts.push(text.to_string());
                }
            }
            Self::Group { children } => children.iter().for_each(|c| c.collect_text(parts)),
            Self::Checkbox { .. } | Self::DragHandle { .. } | Self::Custom { .. } => {}
        }
    }
}

/// Per-call arguments for slots that render one row or cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderArgs {
    pub record: Option<Record>,
    pub row_index: Option<usize>,
    pub field: Option<String>,
}

impl RenderArgs {
    pub fn none() -> Self {
        Self::default()
    }

    /// Arguments for a row-level cell (checkbox, drag handle).
    pub fn row(record: Record, row_index: usize) -> Self {
        Self {
            record: Some(record),
            row_index: Some(row_index),
            field: None,
        }
    }

    /// Arguments for a data cell.
    pub fn cell(record: Record, row_index: usize, field: impl Into<String>) -> Self {
        Self {
            record: Some(record),
            row_index: Some(row_index),
            field: Some(field.into()),
        }
    }
}
