//! Query object ↔ query string mapping.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use url::form_urlencoded;

use crate::model::Value;
use crate::smart_cell::is_empty;

/// How one query field is written to and read from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueryFormatter {
    /// Plain text.
    #[default]
    String,
    /// Items joined by a separator.
    Array { separator: String },
    Boolean,
    Number,
}

impl QueryFormatter {
    /// Array formatter with `,` as separator.
    pub fn array() -> Self {
        Self::Array {
            separator: ",".to_string(),
        }
    }

    fn format(&self, value: &Value) -> String {
        match (self, value) {
            (Self::Array { separator }, Value::Array(items)) => items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(separator),
            _ => value.to_string(),
        }
    }

    fn parse(&self, raw: &str) -> Value {
        match self {
            Self::String => Value::from(raw),
            Self::Array { separator } => Value::Array(
                raw.split(separator.as_str())
                    .filter(|item| !item.is_empty())
                    .map(Value::from)
                    .collect(),
            ),
            Self::Boolean => match raw {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                other => Value::from(other),
            },
            Self::Number => raw
                .parse::<i64>()
                .map(Value::Int)
                .or_else(|_| raw.parse::<f64>().map(Value::Float))
                .unwrap_or_else(|_| Value::from(raw)),
        }
    }
}

/// Encodes a query into `application/x-www-form-urlencoded` and back.
///
/// Fields without a formatter round-trip as strings. Empty values are
/// omitted on encode and ignored on decode.
///
/// ```
/// use std::collections::BTreeMap;
/// use custom_table_lib::model::Value;
/// use custom_table_lib::url_state::{QueryFormatter, UrlStateCodec};
///
/// let codec = UrlStateCodec::new()
///     .with_formatter("tags", QueryFormatter::array())
///     .with_formatter("active", QueryFormatter::Boolean);
///
/// let mut query = BTreeMap::new();
/// query.insert("tags".to_string(), Value::from(vec!["a", "b"]));
/// query.insert("active".to_string(), Value::Bool(true));
///
/// let encoded = codec.encode(&query);
/// assert_eq!(encoded, "active=true&tags=a%2Cb");
/// assert_eq!(codec.decode(&encoded), query);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlStateCodec {
    formatters: BTreeMap<String, QueryFormatter>,
}

impl UrlStateCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formatter(mut self, field: impl Into<String>, formatter: QueryFormatter) -> Self {
        self.formatters.insert(field.into(), formatter);
        self
    }

    fn formatter(&self, field: &str) -> &QueryFormatter {
        static PLAIN: QueryFormatter = QueryFormatter::String;
        self.formatters.get(field).unwrap_or(&PLAIN)
    }

    pub fn encode(&self, query: &BTreeMap<String, Value>) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (field, value) in query {
            if is_empty(value) {
                continue;
            }
            serializer.append_pair(field, &self.formatter(field).format(value));
        }
        serializer.finish()
    }

    pub fn decode(&self, input: &str) -> BTreeMap<String, Value> {
        let input = input.strip_prefix('?').unwrap_or(input);
        form_urlencoded::parse(input.as_bytes())
            .filter(|(_, raw)| !raw.is_empty())
            .map(|(field, raw)| {
                let value = self.formatter(&field).parse(&raw);
                (field.into_owned(), value)
            })
            .filter(|(_, value)| !is_empty(value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_round_trip_with_formatters() {
        let codec = UrlStateCodec::new()
            .with_formatter("ids", QueryFormatter::Array { separator: "|".into() })
            .with_formatter("limit", QueryFormatter::Number)
            .with_formatter("ratio", QueryFormatter::Number)
            .with_formatter("muted", QueryFormatter::Boolean);
        let original = query(&[
            ("ids", Value::from(vec!["a", "b c"])),
            ("limit", Value::Int(20)),
            ("ratio", Value::Float(0.5)),
            ("muted", Value::Bool(false)),
            ("name", Value::from("host & co")),
        ]);

        let encoded = codec.encode(&original);
        assert_eq!(codec.decode(&encoded), original);
    }

    #[test]
    fn test_empty_values_omitted() {
        let codec = UrlStateCodec::new();
        let encoded = codec.encode(&query(&[
            ("a", Value::Null),
            ("b", Value::from("  ")),
            ("c", Value::from("x")),
        ]));
        assert_eq!(encoded, "c=x");
        assert_eq!(codec.decode("?a=&c=x"), query(&[("c", Value::from("x"))]));
    }

    #[test]
    fn test_unparseable_values_stay_strings() {
        let codec = UrlStateCodec::new()
            .with_formatter("n", QueryFormatter::Number)
            .with_formatter("b", QueryFormatter::Boolean);
        let decoded = codec.decode("n=abc&b=maybe");
        assert_eq!(decoded.get("n"), Some(&Value::from("abc")));
        assert_eq!(decoded.get("b"), Some(&Value::from("maybe")));
    }
}
