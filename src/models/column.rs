//! Column metadata model.

use serde::{Deserialize, Serialize};

/// Metadata for one table column, as reported by driver introspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Database-specific type (e.g. "INTEGER", "varchar(32)", "enum('a','b')")
    pub type_name: String,
    pub nullable: bool,
    /// True when the column's value is generated by the database on insert
    /// (auto-increment / rowid-aliased primary keys).
    pub auto_generated: bool,
    /// Zero-based ordinal position in the table definition.
    pub ordinal: u32,
}

impl ColumnInfo {
    /// Create column metadata.
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        nullable: bool,
        ordinal: u32,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
            auto_generated: false,
            ordinal,
        }
    }

    /// Mark the column as database-generated.
    pub fn with_auto_generated(mut self, auto: bool) -> Self {
        self.auto_generated = auto;
        self
    }
}
