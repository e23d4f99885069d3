//! Dynamic table record

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::Value;
use crate::error::FieldError;

/// Identity of a row, derived from the configured row-key field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(String);

impl RowKey {
    /// Creates a row key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for RowKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<i64> for RowKey {
    fn from(key: i64) -> Self {
        Self(key.to_string())
    }
}

/// A single row returned by the request function.
///
/// Records hold field values as a `HashMap<String, Value>`, allowing dynamic
/// access to any column. Typed getter methods provide checked access.
///
/// # Example
///
/// ```
/// use custom_table_lib::model::Record;
///
/// let record = Record::new()
///     .set("id", "bot-1")
///     .set("status", "running");
///
/// assert_eq!(record.get_str("status").unwrap(), Some("running"));
/// assert_eq!(record.key("id").unwrap().as_str(), "bot-1");
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: HashMap<String, Value>,
}

impl Record {
    /// Creates a new empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record from an existing field map.
    pub fn from_fields(fields: HashMap<String, Value>) -> Self {
        Self { fields }
    }

    /// Derives the row key from the given key field.
    ///
    /// Strings are used verbatim, numbers are formatted. Any other value
    /// (including a missing or null field) yields `None`.
    pub fn key(&self, key_field: &str) -> Option<RowKey> {
        match self.fields.get(key_field)? {
            Value::String(s) => Some(RowKey::new(s.clone())),
            Value::Int(i) => Some(RowKey::from(*i)),
            Value::Float(f) => Some(RowKey::new(f.to_string())),
            _ => None,
        }
    }

    // =========================================================================
    // Raw field access
    // =========================================================================

    /// Returns a reference to the field value, if it exists.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns `true` if the record contains the given field.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns a reference to all fields.
    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    /// Returns the field names in sorted order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Sets a field value (builder pattern).
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Inserts a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Removes a field and returns its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    // =========================================================================
    // Typed getters
    // =========================================================================

    /// Returns the string value of a field.
    ///
    /// `Ok(None)` for a null field, `Err` for a missing field or another type.
    pub fn get_str(&self, field: &str) -> Result<Option<&str>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(FieldError::type_mismatch(field, "string", other.type_name())),
        }
    }

    /// Returns the integer value of a field.
    pub fn get_i64(&self, field: &str) -> Result<Option<i64>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(FieldError::type_mismatch(field, "int", other.type_name())),
        }
    }

    /// Returns the numeric value of a field, accepting ints and floats.
    pub fn get_f64(&self, field: &str) -> Result<Option<f64>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(v @ (Value::Int(_) | Value::Float(_))) => Ok(v.as_f64()),
            Some(other) => Err(FieldError::type_mismatch(field, "float", other.type_name())),
        }
    }

    /// Returns the boolean value of a field.
    pub fn get_bool(&self, field: &str) -> Result<Option<bool>, FieldError> {
        match self.fields.get(field) {
            None => Err(FieldError::missing(field)),
            Some(Value::Null) => Ok(None),
            Some(Value::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(FieldError::type_mismatch(field, "bool", other.type_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_number() {
        let record = Record::new().set("id", 7i64);
        assert_eq!(record.key("id"), Some(RowKey::from("7")));
        assert_eq!(record.key("missing"), None);
    }

    #[test]
    fn test_typed_getters() {
        let record = Record::new()
            .set("name", "alpha")
            .set("count", 3i64)
            .set("note", Value::Null);

        assert_eq!(record.get_str("name").unwrap(), Some("alpha"));
        assert_eq!(record.get_f64("count").unwrap(), Some(3.0));
        assert_eq!(record.get_str("note").unwrap(), None);
        assert!(matches!(record.get_str("nope"), Err(FieldError::Missing { .. })));
        assert!(matches!(
            record.get_bool("name"),
            Err(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_serde_transparent() {
        let record: Record = serde_json::from_str(r#"{"id":"a","cpu":12}"#).unwrap();
        assert_eq!(record.get_i64("cpu").unwrap(), Some(12));
    }
}
