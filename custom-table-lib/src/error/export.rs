//! Export error types

/// Errors that can occur while exporting table data.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// CSV serialization failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Excel workbook generation failed.
    #[error("Excel export failed: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),

    /// JSON serialization failed.
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The output buffer could not be finalized.
    #[error("Export buffer error: {0}")]
    Buffer(String),

    /// There were no columns to export.
    #[error("Nothing to export: no columns")]
    NoColumns,
}
