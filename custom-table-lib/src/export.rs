//! Exporting loaded rows as Excel, CSV or JSON.

use rust_xlsxwriter::Format;
use rust_xlsxwriter::Workbook;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ExportError;
use crate::model::Record;
use crate::model::Value;

/// Output format for [`export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }
}

/// An exported file held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub format: ExportFormat,
    pub file_name: String,
    pub columns: Vec<String>,
    pub rows: usize,
    pub bytes: Vec<u8>,
}

/// Sorted union of the field names of all records.
pub fn derive_columns(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = records
        .iter()
        .flat_map(|r| r.field_names())
        .map(str::to_string)
        .collect();
    columns.sort();
    columns.dedup();
    columns
}

/// Serializes `records` in `format`.
///
/// With no `columns` the sorted union of field names is used. Missing
/// fields export as empty cells (CSV, Excel) or `null` (JSON).
pub fn export(
    records: &[Record],
    format: ExportFormat,
    columns: Option<&[String]>,
    base_name: &str,
) -> Result<ExportedFile, ExportError> {
    let columns = match columns {
        Some(columns) => columns.to_vec(),
        None => derive_columns(records),
    };
    if columns.is_empty() {
        return Err(ExportError::NoColumns);
    }

    let bytes = match format {
        ExportFormat::Excel => to_xlsx(records, &columns)?,
        ExportFormat::Csv => to_csv(records, &columns)?,
        ExportFormat::Json => to_json(records, &columns)?,
    };

    Ok(ExportedFile {
        format,
        file_name: format!("{base_name}.{}", format.extension()),
        columns,
        rows: records.len(),
        bytes,
    })
}

fn to_csv(records: &[Record], columns: &[String]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|c| cell_text(record.get(c))))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))
}

fn to_xlsx(records: &[Record], columns: &[String]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet().set_name("Data")?;

    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &header)?;
    }
    for (row, record) in records.iter().enumerate() {
        let row = row as u32 + 1;
        for (col, name) in columns.iter().enumerate() {
            let col = col as u16;
            match record.get(name) {
                None | Some(Value::Null) => {}
                Some(Value::Int(n)) => {
                    sheet.write_number(row, col, *n as f64)?;
                }
                Some(Value::Float(n)) => {
                    sheet.write_number(row, col, *n)?;
                }
                Some(Value::Bool(b)) => {
                    sheet.write_boolean(row, col, *b)?;
                }
                Some(other) => {
                    sheet.write_string(row, col, other.to_string())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn to_json(records: &[Record], columns: &[String]) -> Result<Vec<u8>, ExportError> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|c| {
                    let value = record.get(c).map(Value::to_json).unwrap_or_default();
                    (c.clone(), value)
                })
                .collect()
        })
        .collect();
    Ok(serde_json::to_vec_pretty(&rows)?)
}

fn cell_text(value: Option<&Value>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::new().set("id", 1).set("name", "cpu").set("ok", true),
            Record::new().set("id", 2).set("name", "disk, ssd"),
        ]
    }

    #[test]
    fn test_derive_columns() {
        assert_eq!(derive_columns(&records()), vec!["id", "name", "ok"]);
    }

    #[test]
    fn test_csv() {
        let file = export(&records(), ExportFormat::Csv, None, "hosts").unwrap();
        let text = String::from_utf8(file.bytes).unwrap();
        assert_eq!(text, "id,name,ok\n1,cpu,true\n2,\"disk, ssd\",\n");
        assert_eq!(file.file_name, "hosts.csv");
        assert_eq!(file.rows, 2);
    }

    #[test]
    fn test_json_selected_columns() {
        let columns = vec!["name".to_string(), "missing".to_string()];
        let file = export(&records(), ExportFormat::Json, Some(&columns), "hosts").unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&file.bytes).unwrap();
        assert_eq!(parsed[0]["name"], "cpu");
        assert!(parsed[1]["missing"].is_null());
    }

    #[test]
    fn test_excel_is_zip() {
        let file = export(&records(), ExportFormat::Excel, None, "hosts").unwrap();
        assert!(file.bytes.starts_with(b"PK"));
        assert_eq!(file.file_name, "hosts.xlsx");
    }

    #[test]
    fn test_no_columns() {
        let result = export(&[], ExportFormat::Csv, None, "empty");
        assert!(matches!(result, Err(ExportError::NoColumns)));
    }
}
