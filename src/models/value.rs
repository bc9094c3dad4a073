//! Bound parameter values.
//!
//! `SqlValue` is the unified value type bound into statements; `Param` and
//! `Params` describe how values are attached to a statement before the
//! placeholder expander normalizes them for driver binding.

use serde::{Deserialize, Serialize};

/// A single value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Whether the value is purely numeric.
    ///
    /// Integers and floats qualify directly; text qualifies when it parses
    /// as a number in full. Used by `quote_smart` to skip quoting.
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Int(_) | Self::Float(_) => true,
            Self::Text(s) => !s.is_empty() && s.parse::<f64>().is_ok(),
            _ => false,
        }
    }

    /// Render the value as a SQL literal for debugging output.
    ///
    /// This is an approximation of what the driver would bind; quoting
    /// nuances are driver-specific and the rendered text must never be sent
    /// to the server in place of real binding.
    pub fn literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(true) => "1".to_string(),
            Self::Bool(false) => "0".to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
                format!("X'{}'", hex)
            }
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// One parameter attached to a statement: a plain value, or a sequence that
/// requests placeholder expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Value(SqlValue),
    List(Vec<SqlValue>),
}

impl<T: Into<SqlValue>> From<T> for Param {
    fn from(v: T) -> Self {
        Self::Value(v.into())
    }
}

impl Param {
    /// Build an expansion request from any value sequence.
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SqlValue>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// The full parameter set for one statement.
///
/// A statement uses exactly one placeholder style; the variants mirror that.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<Param>),
    Named(Vec<(String, Param)>),
}

impl Params {
    /// Positional parameters from any mixed value/list iterator.
    pub fn positional<I>(params: I) -> Self
    where
        I: IntoIterator<Item = Param>,
    {
        Self::Positional(params.into_iter().collect())
    }

    /// Positional scalar values.
    pub fn values<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SqlValue>,
    {
        Self::Positional(values.into_iter().map(|v| Param::Value(v.into())).collect())
    }

    /// Named parameters for `:label` statements.
    pub fn named<I, K>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, Param)>,
        K: Into<String>,
    {
        Self::Named(params.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Number of attached parameters.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Positional(p) => p.len(),
            Self::Named(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scalar convenience: a bare value binds as a one-element positional list.
impl<T: Into<SqlValue>> From<T> for Params {
    fn from(v: T) -> Self {
        Self::Positional(vec![Param::Value(v.into())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::Bool(true).is_null());
        assert_eq!(SqlValue::Int(42).type_name(), "int");
        assert_eq!(SqlValue::from("hello").type_name(), "text");
    }

    #[test]
    fn test_numeric_detection() {
        assert!(SqlValue::Int(7).is_numeric());
        assert!(SqlValue::Float(1.5).is_numeric());
        assert!(SqlValue::from("42").is_numeric());
        assert!(SqlValue::from("-3.25").is_numeric());
        assert!(!SqlValue::from("42abc").is_numeric());
        assert!(!SqlValue::from("").is_numeric());
        assert!(!SqlValue::Null.is_numeric());
        assert!(!SqlValue::Bool(true).is_numeric());
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(SqlValue::Null.literal(), "NULL");
        assert_eq!(SqlValue::Int(42).literal(), "42");
        assert_eq!(SqlValue::from("O'Brien").literal(), "'O''Brien'");
        assert_eq!(SqlValue::Bytes(vec![0xDE, 0xAD]).literal(), "X'DEAD'");
        assert_eq!(SqlValue::Bool(true).literal(), "1");
    }

    #[test]
    fn test_bytes_serialize_as_base64() {
        let json = serde_json::to_string(&SqlValue::Bytes(vec![1, 2, 3])).unwrap();
        assert_eq!(json, "\"AQID\"");
    }

    #[test]
    fn test_scalar_convenience() {
        let params: Params = 42.into();
        assert_eq!(params, Params::Positional(vec![Param::Value(SqlValue::Int(42))]));
    }

    #[test]
    fn test_params_len() {
        assert_eq!(Params::None.len(), 0);
        assert!(Params::None.is_empty());
        assert_eq!(Params::values([1, 2, 3]).len(), 3);
        assert_eq!(
            Params::named([("id", Param::from(1))]).len(),
            1
        );
    }
}
