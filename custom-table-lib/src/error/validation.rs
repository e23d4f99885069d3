//! Validation result types

use serde::Serialize;

/// A single advisory validation problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// What was validated (plugin name or field name).
    pub source: String,
    /// Human-readable validation message.
    pub message: String,
    /// Optional machine-readable code.
    pub code: Option<String>,
}

impl ValidationIssue {
    /// Creates a new validation issue.
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Creates a new validation issue with a code.
    pub fn with_code(
        source: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "{}: {} ({})", self.source, self.message, code)
        } else {
            write!(f, "{}: {}", self.source, self.message)
        }
    }
}

/// Result of validating a plugin configuration or the whole table.
///
/// Validation is advisory: an invalid report is logged but never blocks
/// plugin installation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// A report with no issues.
    pub fn valid() -> Self {
        Self::default()
    }

    /// A report carrying the given issues.
    pub fn invalid(errors: Vec<ValidationIssue>) -> Self {
        Self { errors }
    }

    /// Builds a report from a list that may be empty.
    pub fn from_issues(errors: Vec<ValidationIssue>) -> Self {
        Self { errors }
    }

    /// Check if there are no issues.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all issues.
    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    /// Appends another report's issues to this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
    }
}
