//! Smart cell configuration.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::model::Record;

use super::CellContent;
use super::DEFAULT_EMPTY_TEXT;
use super::EmptyValueContext;

/// How an empty cell is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyStrategy {
    /// Static placeholder text.
    #[default]
    Text,
    /// Clickable placeholder (e.g. "add value").
    Interactive,
    /// Render nothing.
    Hidden,
}

/// Payload passed to empty-cell click callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct EmptyValueClick {
    pub field: String,
    pub row_index: usize,
    pub record: Record,
}

/// Callback invoked when an interactive empty cell is clicked.
#[derive(Clone)]
pub struct EmptyClickHandler(Arc<dyn Fn(&EmptyValueClick) + Send + Sync>);

impl EmptyClickHandler {
    pub fn new(f: impl Fn(&EmptyValueClick) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, click: &EmptyValueClick) {
        (self.0)(click)
    }
}

impl std::fmt::Debug for EmptyClickHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EmptyClickHandler")
    }
}

/// Per-field empty-value configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldEmptyConfig {
    pub strategy: EmptyStrategy,
    pub text: String,
    pub editable: bool,
    /// Roles allowed the interactive strategy; empty means everyone.
    pub allowed_roles: Vec<String>,
    /// Roles allowed to edit; empty means everyone (when `editable`).
    pub editable_roles: Vec<String>,
    #[serde(skip)]
    pub on_click: Option<EmptyClickHandler>,
}

impl Default for FieldEmptyConfig {
    fn default() -> Self {
        Self {
            strategy: EmptyStrategy::Text,
            text: DEFAULT_EMPTY_TEXT.to_string(),
            editable: false,
            allowed_roles: Vec::new(),
            editable_roles: Vec::new(),
            on_click: None,
        }
    }
}

impl PartialEq for EmptyClickHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl FieldEmptyConfig {
    pub fn new(strategy: EmptyStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn with_allowed_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_editable_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.editable_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_on_click(mut self, f: impl Fn(&EmptyValueClick) + Send + Sync + 'static) -> Self {
        self.on_click = Some(EmptyClickHandler::new(f));
        self
    }
}

/// Inputs of a cell render override.
#[derive(Debug, Clone, Copy)]
pub struct CellRenderParams<'a> {
    pub field: &'a str,
    pub record: &'a Record,
    pub row_index: usize,
    pub context: &'a EmptyValueContext,
}

/// Host override consulted before any strategy; `None` falls through.
pub type CellRenderOverride =
    Arc<dyn Fn(&CellRenderParams<'_>) -> Option<CellContent> + Send + Sync>;

/// Resolver-wide configuration.
#[derive(Clone, Default)]
pub struct SmartCellConfig {
    /// Role of the current user.
    pub role: Option<String>,
    pub fields: HashMap<String, FieldEmptyConfig>,
    /// Strategy per role for fields without their own configuration.
    pub role_strategies: HashMap<String, EmptyStrategy>,
    pub on_click: Option<EmptyClickHandler>,
    pub on_cell_render: Option<CellRenderOverride>,
}

impl SmartCellConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, config: FieldEmptyConfig) -> Self {
        self.fields.insert(field.into(), config);
        self
    }

    pub fn with_role_strategy(mut self, role: impl Into<String>, strategy: EmptyStrategy) -> Self {
        self.role_strategies.insert(role.into(), strategy);
        self
    }

    pub fn with_on_click(mut self, f: impl Fn(&EmptyValueClick) + Send + Sync + 'static) -> Self {
        self.on_click = Some(EmptyClickHandler::new(f));
        self
    }

    pub fn with_on_cell_render(
        mut self,
        f: impl Fn(&CellRenderParams<'_>) -> Option<CellContent> + Send + Sync + 'static,
    ) -> Self {
        self.on_cell_render = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for SmartCellConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartCellConfig")
            .field("role", &self.role)
            .field("fields", &self.fields)
            .field("role_strategies", &self.role_strategies)
            .field("on_click", &self.on_click)
            .field("on_cell_render", &self.on_cell_render.is_some())
            .finish()
    }
}
