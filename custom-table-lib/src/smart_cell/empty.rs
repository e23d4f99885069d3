//! Empty-value classification.

use crate::model::Value;

/// Placeholder shown for empty cells when nothing else is configured.
pub const DEFAULT_EMPTY_TEXT: &str = "--";

/// Returns `true` for null, blank strings, empty arrays and empty objects.
///
/// This is the one definition of "empty" used by cells, statistics and
/// exports.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::DateTime(_) => false,
    }
}

/// Like [`is_empty`] for an optional value; a missing value is empty.
pub fn is_empty_opt(value: Option<&Value>) -> bool {
    value.is_none_or(is_empty)
}

/// Placeholder text that is never itself empty.
pub fn placeholder_text(configured: &str) -> &str {
    if configured.trim().is_empty() {
        DEFAULT_EMPTY_TEXT
    } else {
        configured
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_is_empty() {
        assert!(is_empty(&Value::Null));
        assert!(is_empty(&Value::from("")));
        assert!(is_empty(&Value::from("  \t")));
        assert!(is_empty(&Value::Array(Vec::new())));
        assert!(is_empty(&Value::Object(BTreeMap::new())));

        assert!(!is_empty(&Value::from(0)));
        assert!(!is_empty(&Value::from(false)));
        assert!(!is_empty(&Value::from("x")));
        assert!(!is_empty(&Value::from(vec![Value::Null])));
    }

    #[test]
    fn test_placeholder_never_empty() {
        for configured in ["", "   ", "--", "N/A"] {
            let text = placeholder_text(configured);
            assert!(!is_empty(&Value::from(text)));
        }
    }

    #[test]
    fn test_classification_is_idempotent() {
        let samples = [
            Value::Null,
            Value::from(""),
            Value::from(" "),
            Value::Array(Vec::new()),
            Value::from("ok"),
            Value::from(3),
        ];
        for value in samples {
            let resolved = if is_empty(&value) {
                Value::from(placeholder_text(""))
            } else {
                value
            };
            assert!(!is_empty(&resolved));
        }
    }
}
