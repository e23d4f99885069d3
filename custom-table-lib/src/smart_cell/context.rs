//! Per-cell context and per-field empty statistics.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::Record;

use super::is_empty_opt;

/// Bucket for the size of the loaded data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSize {
    /// Fewer than 100 rows.
    Small,
    /// 100 to 1000 rows.
    Medium,
    /// More than 1000 rows.
    Large,
}

impl DataSize {
    pub fn from_count(count: usize) -> Self {
        match count {
            0..100 => Self::Small,
            100..=1000 => Self::Medium,
            _ => Self::Large,
        }
    }
}

/// Empty-value counts for one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyValueStats {
    pub rows: usize,
    pub empty: usize,
}

impl EmptyValueStats {
    /// Fraction of empty values in `[0, 1]`; 0 with no rows.
    pub fn rate(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.empty as f64 / self.rows as f64
        }
    }

    /// Counts empty values of every field that appears in `data`.
    pub fn collect(data: &[Record]) -> HashMap<String, EmptyValueStats> {
        let mut fields: Vec<&str> = data.iter().flat_map(|r| r.field_names()).collect();
        fields.sort_unstable();
        fields.dedup();

        fields
            .into_iter()
            .map(|field| {
                let empty = data
                    .iter()
                    .filter(|record| is_empty_opt(record.get(field)))
                    .count();
                (
                    field.to_string(),
                    EmptyValueStats {
                        rows: data.len(),
                        empty,
                    },
                )
            })
            .collect()
    }
}

/// Computed context for one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyValueContext {
    pub field: String,
    pub row_index: usize,
    pub data_size: DataSize,
    /// Empty rate of this field over the loaded data.
    pub empty_rate: f64,
    /// Some other field of the row holds a value.
    pub has_related_data: bool,
}
