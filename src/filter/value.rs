use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;

use crate::utils::format_scim_datetime;

/// Comparison operand of a filter.
///
/// Dates have no variant of their own: they are carried as their SCIM
/// dateTime text, the same way they appear in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    Binary(Vec<u8>),
}

impl ScalarValue {
    pub fn date(dt: DateTime<Utc>) -> Self {
        ScalarValue::Text(format_scim_datetime(dt))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form of the value. Binary values become base64 text, which is
    /// how SCIM transports them.
    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Null => Value::Null,
            ScalarValue::Boolean(b) => Value::Bool(*b),
            ScalarValue::Integer(i) => Value::from(*i),
            ScalarValue::Decimal(d) => serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ScalarValue::Text(s) => Value::String(s.clone()),
            ScalarValue::Binary(b) => Value::String(STANDARD.encode(b)),
        }
    }

    /// Convert a JSON scalar into a filter operand. Arrays and objects are
    /// not scalars and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(ScalarValue::Null),
            Value::Bool(b) => Some(ScalarValue::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(ScalarValue::Integer(i)),
                None => n.as_f64().map(ScalarValue::Decimal),
            },
            Value::String(s) => Some(ScalarValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Textual representation used when no typed comparison applies.
    pub fn as_plain_text(&self) -> String {
        match self {
            ScalarValue::Null => "null".to_string(),
            ScalarValue::Boolean(b) => b.to_string(),
            ScalarValue::Integer(i) => i.to_string(),
            ScalarValue::Decimal(d) => d.to_string(),
            ScalarValue::Text(s) => s.clone(),
            ScalarValue::Binary(b) => STANDARD.encode(b),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // JSON literal syntax, as accepted by the filter parser
        write!(f, "{}", self.to_json())
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Integer(value as i64)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Integer(value)
    }
}

impl From<f32> for ScalarValue {
    fn from(value: f32) -> Self {
        ScalarValue::Decimal(value as f64)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Decimal(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl From<Vec<u8>> for ScalarValue {
    fn from(value: Vec<u8>) -> Self {
        ScalarValue::Binary(value)
    }
}

impl From<DateTime<Utc>> for ScalarValue {
    fn from(value: DateTime<Utc>) -> Self {
        ScalarValue::date(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_date_is_carried_as_text() {
        let dt = Utc.with_ymd_and_hms(2018, 6, 28, 10, 3, 54).unwrap();
        assert_eq!(
            ScalarValue::from(dt),
            ScalarValue::Text("2018-06-28T10:03:54.000Z".to_string())
        );
    }

    #[test]
    fn test_display_uses_json_literals() {
        assert_eq!(ScalarValue::from("say \"hi\"").to_string(), r#""say \"hi\"""#);
        assert_eq!(ScalarValue::from(42).to_string(), "42");
        assert_eq!(ScalarValue::Null.to_string(), "null");
        assert_eq!(ScalarValue::from(vec![1u8, 2, 3]).to_string(), "\"AQID\"");
    }

    #[test]
    fn test_from_json() {
        assert_eq!(ScalarValue::from_json(&json!(7)), Some(ScalarValue::Integer(7)));
        assert_eq!(ScalarValue::from_json(&json!(1.5)), Some(ScalarValue::Decimal(1.5)));
        assert_eq!(ScalarValue::from_json(&json!([1])), None);
    }
}
