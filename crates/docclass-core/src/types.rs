//! Core types for docclass

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive data type declared for a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Free text, passed through unchanged
    String,
    /// Signed 64-bit integer
    Integer,
    /// 64-bit floating point
    Double,
    /// `true`/`false` (also `1`/`0`)
    Boolean,
}

impl DataType {
    /// Parse raw text into a value of this type.
    ///
    /// Strings are taken verbatim; all other types are parsed from the
    /// trimmed text. Returns `None` when the text is not a valid literal.
    pub fn parse(&self, raw: &str) -> Option<FieldValue> {
        match self {
            Self::String => Some(FieldValue::Text(raw.to_string())),
            Self::Integer => raw.trim().parse().ok().map(FieldValue::Integer),
            Self::Double => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(FieldValue::Double),
            Self::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(FieldValue::Boolean(true)),
                "false" | "0" => Some(FieldValue::Boolean(false)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// A prepared, typed value for one input field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
}

impl FieldValue {
    /// The data type this value carries
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Text(_) => DataType::String,
            Self::Integer(_) => DataType::Integer,
            Self::Double(_) => DataType::Double,
            Self::Boolean(_) => DataType::Boolean,
        }
    }

    /// Numeric view of the value; booleans map to 1.0/0.0, text has none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Text(_) => None,
            Self::Integer(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
        }
    }

    /// Text view of the value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Final prediction for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class label
    pub label: String,

    /// Score the output distribution assigns to `label`
    pub confidence: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_parse_is_verbatim() {
        assert_eq!(
            DataType::String.parse("  padded "),
            Some(FieldValue::Text("  padded ".to_string()))
        );
        assert_eq!(DataType::String.parse(""), Some(FieldValue::Text(String::new())));
    }

    #[test]
    fn test_numeric_parse_trims() {
        assert_eq!(DataType::Integer.parse(" 42 "), Some(FieldValue::Integer(42)));
        assert_eq!(DataType::Double.parse("2.5"), Some(FieldValue::Double(2.5)));
        assert_eq!(DataType::Integer.parse("4.2"), None);
        assert_eq!(DataType::Double.parse("NaN"), None);
        assert_eq!(DataType::Double.parse("abc"), None);
    }

    #[test]
    fn test_boolean_parse() {
        assert_eq!(DataType::Boolean.parse("TRUE"), Some(FieldValue::Boolean(true)));
        assert_eq!(DataType::Boolean.parse("0"), Some(FieldValue::Boolean(false)));
        assert_eq!(DataType::Boolean.parse("yes"), None);
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(FieldValue::Boolean(true).as_f64(), Some(1.0));
        assert_eq!(FieldValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(FieldValue::Text("x".into()).as_f64(), None);
        assert_eq!(FieldValue::Text("x".into()).as_text(), Some("x"));
    }

    #[test]
    fn test_data_type_deserializes_lowercase() {
        let dt: DataType = serde_json::from_str("\"double\"").unwrap();
        assert_eq!(dt, DataType::Double);
        assert_eq!(dt.to_string(), "double");
    }
}
