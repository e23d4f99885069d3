//! Cell presentation for empty and non-empty values.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

use crate::model::Record;
use crate::trace::Phase;
use crate::trace::TraceLogCollector;

use super::CellRenderParams;
use super::DataSize;
use super::EmptyStrategy;
use super::EmptyValueClick;
use super::EmptyValueContext;
use super::EmptyValueStats;
use super::FieldEmptyConfig;
use super::SmartCellConfig;
use super::is_empty;
use super::is_empty_opt;
use super::placeholder_text;

const COMPONENT: &str = "smart-cell";

/// What a cell shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CellContent {
    /// The formatted value.
    Value { text: String },
    /// Static placeholder for an empty value.
    Placeholder { text: String },
    /// Clickable placeholder for an empty value.
    Interactive { text: String, editable: bool },
    Hidden,
}

impl CellContent {
    /// Visible text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Value { text } | Self::Placeholder { text } | Self::Interactive { text, .. } => {
                Some(text)
            }
            Self::Hidden => None,
        }
    }
}

/// Resolved presentation of one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRender {
    pub field: String,
    pub row_index: usize,
    pub content: CellContent,
    pub context: EmptyValueContext,
}

#[derive(Debug, Default)]
struct Aggregates {
    rows: usize,
    fields: HashMap<String, EmptyValueStats>,
}

/// Decides how each cell is presented.
///
/// Call [`refresh`](Self::refresh) with the loaded rows once per render
/// pass so empty rates and data-size buckets match what is on screen.
pub struct SmartCellResolver {
    config: SmartCellConfig,
    aggregates: RwLock<Aggregates>,
    collector: TraceLogCollector,
}

impl SmartCellResolver {
    pub fn new(config: SmartCellConfig, collector: TraceLogCollector) -> Self {
        Self {
            config,
            aggregates: RwLock::new(Aggregates::default()),
            collector,
        }
    }

    pub fn config(&self) -> &SmartCellConfig {
        &self.config
    }

    /// Recomputes empty statistics from the loaded rows.
    pub fn refresh(&self, data: &[Record]) {
        if let Ok(mut aggregates) = self.aggregates.write() {
            aggregates.rows = data.len();
            aggregates.fields = EmptyValueStats::collect(data);
        }
    }

    pub fn stats(&self, field: &str) -> Option<EmptyValueStats> {
        self.aggregates
            .read()
            .ok()
            .and_then(|a| a.fields.get(field).copied())
    }

    /// The field's configuration, or the default when none is set.
    pub fn get_field_config(&self, field: &str) -> FieldEmptyConfig {
        match self.config.fields.get(field) {
            Some(config) => config.clone(),
            None => FieldEmptyConfig::new(self.role_strategy().unwrap_or_default()),
        }
    }

    fn role_strategy(&self) -> Option<EmptyStrategy> {
        let role = self.config.role.as_ref()?;
        self.config.role_strategies.get(role).copied()
    }

    /// Whether the current role may use the field's interactive strategy.
    pub fn check_field_permission(&self, field: &str) -> bool {
        let config = self.get_field_config(field);
        has_role(&config.allowed_roles, self.config.role.as_deref())
    }

    /// Whether the current role may edit the field inline.
    pub fn check_edit_permission(&self, field: &str) -> bool {
        let config = self.get_field_config(field);
        config.editable && has_role(&config.editable_roles, self.config.role.as_deref())
    }

    pub fn get_context_info(&self, record: &Record, field: &str, row_index: usize) -> EmptyValueContext {
        let (rows, empty_rate) = self
            .aggregates
            .read()
            .map(|a| {
                let rate = a.fields.get(field).map(EmptyValueStats::rate).unwrap_or(0.0);
                (a.rows, rate)
            })
            .unwrap_or((0, 0.0));

        let has_related_data = record
            .fields()
            .iter()
            .any(|(name, value)| name != field && !is_empty(value));

        EmptyValueContext {
            field: field.to_string(),
            row_index,
            data_size: DataSize::from_count(rows),
            empty_rate,
            has_related_data,
        }
    }

    /// Resolves what a cell shows.
    ///
    /// A host override wins; otherwise non-empty values are formatted and
    /// empty values follow the field strategy. The interactive strategy
    /// needs the field permission and degrades to a placeholder without it.
    pub fn render_smart_cell(&self, record: &Record, field: &str, row_index: usize) -> CellRender {
        let context = self.get_context_info(record, field, row_index);

        if let Some(on_cell_render) = &self.config.on_cell_render {
            let params = CellRenderParams {
                field,
                record,
                row_index,
                context: &context,
            };
            if let Some(content) = on_cell_render(&params) {
                return CellRender {
                    field: field.to_string(),
                    row_index,
                    content,
                    context,
                };
            }
        }

        let value = record.get(field);
        let content = if !is_empty_opt(value) {
            CellContent::Value {
                text: value.map(ToString::to_string).unwrap_or_default(),
            }
        } else {
            let config = self.get_field_config(field);
            let text = placeholder_text(&config.text).to_string();
            match config.strategy {
                EmptyStrategy::Hidden => CellContent::Hidden,
                EmptyStrategy::Text => CellContent::Placeholder { text },
                EmptyStrategy::Interactive if self.check_field_permission(field) => {
                    CellContent::Interactive {
                        text,
                        editable: self.check_edit_permission(field),
                    }
                }
                EmptyStrategy::Interactive => {
                    self.collector.debug(
                        Phase::Render,
                        COMPONENT,
                        format!("role lacks permission for interactive '{field}'"),
                    );
                    CellContent::Placeholder { text }
                }
            }
        };

        CellRender {
            field: field.to_string(),
            row_index,
            content,
            context,
        }
    }

    /// Notifies the global and the field callback (both, when both are set).
    ///
    /// Returns the number of callbacks invoked.
    pub fn handle_empty_value_click(&self, record: &Record, field: &str, row_index: usize) -> usize {
        let click = EmptyValueClick {
            field: field.to_string(),
            row_index,
            record: record.clone(),
        };
        let mut invoked = 0;
        if let Some(handler) = &self.config.on_click {
            handler.call(&click);
            invoked += 1;
        }
        if let Some(handler) = self.config.fields.get(field).and_then(|c| c.on_click.as_ref()) {
            handler.call(&click);
            invoked += 1;
        }
        self.collector.debug(
            Phase::Render,
            COMPONENT,
            format!("empty cell '{field}' clicked at row {row_index}"),
        );
        invoked
    }
}

fn has_role(roles: &[String], role: Option<&str>) -> bool {
    roles.is_empty() || role.is_some_and(|role| roles.iter().any(|r| r == role))
}

impl std::fmt::Debug for SmartCellResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartCellResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
