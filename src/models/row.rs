//! Result row model.

use crate::models::SqlValue;
use serde_json::Value as JsonValue;

/// One result row: ordered column names and their values.
///
/// Column order is the order reported by the driver. Lookup by name is a
/// linear scan; result sets in this layer are narrow enough that an index
/// structure would not pay for itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Create a row from parallel column/value vectors.
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in result order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value by column name, if the column exists.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Value by column index, if in range.
    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Convert to a JSON map for debugging output.
    pub fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| {
                let json = serde_json::to_value(value).unwrap_or(JsonValue::Null);
                (name.clone(), json)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::new(
            vec!["id".into(), "name".into()],
            vec![SqlValue::Int(1), SqlValue::from("Ada")],
        )
    }

    #[test]
    fn test_get_by_name() {
        let row = sample();
        assert_eq!(row.get("name"), Some(&SqlValue::from("Ada")));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_get_by_index() {
        let row = sample();
        assert_eq!(row.get_index(0), Some(&SqlValue::Int(1)));
        assert_eq!(row.get_index(5), None);
    }

    #[test]
    fn test_to_json_map() {
        let map = sample().to_json_map();
        assert_eq!(map["id"], serde_json::json!(1));
        assert_eq!(map["name"], serde_json::json!("Ada"));
    }
}
