//! Known-identifier catalog.
//!
//! Positional and named binding cannot target identifier positions, so
//! untrusted table/column names are validated against this catalog instead
//! of being interpolated. The catalog is loaded once per connection
//! generation - the full table list, then each table's columns - and the
//! engine discards it when the connection is replaced.

use crate::driver::DriverConnection;
use crate::error::DbResult;
use crate::models::ColumnInfo;
use tracing::debug;

/// Cached table and column names for one connection generation.
#[derive(Debug, Clone)]
pub struct IdentifierCatalog {
    /// Tables in introspection order; that order also fixes column lookup
    /// order for the lifetime of this catalog instance.
    tables: Vec<(String, Vec<ColumnInfo>)>,
}

impl IdentifierCatalog {
    /// Load the full catalog through a driver connection.
    pub async fn load<C: DriverConnection>(conn: &mut C) -> DbResult<Self> {
        let names = conn.list_tables().await?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = conn.list_columns(&name).await?;
            tables.push((name, columns));
        }
        debug!(tables = tables.len(), "Loaded identifier catalog");
        Ok(Self { tables })
    }

    /// Table names in introspection order.
    pub fn tables(&self) -> Vec<String> {
        self.tables.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Validate a name against the catalog.
    ///
    /// Tables are checked first; otherwise the columns of every table are
    /// scanned in catalog order and the first match wins. `None` means the
    /// name is not a known identifier.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        if let Some((table, _)) = self.tables.iter().find(|(table, _)| table == name) {
            return Some(table);
        }
        for (_, columns) in &self.tables {
            if let Some(column) = columns.iter().find(|c| c.name == name) {
                return Some(&column.name);
            }
        }
        None
    }

    /// Every distinct column name, in first-seen catalog order.
    pub fn all_columns(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for (_, columns) in &self.tables {
            for column in columns {
                if !seen.iter().any(|s| s == &column.name) {
                    seen.push(column.name.clone());
                }
            }
        }
        seen
    }

    /// Columns of one table in ordinal order, or of every table in catalog
    /// order when `table` is `None`.
    pub fn table_columns(&self, table: Option<&str>) -> Vec<ColumnInfo> {
        match table {
            Some(name) => self
                .tables
                .iter()
                .find(|(t, _)| t == name)
                .map(|(_, columns)| columns.clone())
                .unwrap_or_default(),
            None => self
                .tables
                .iter()
                .flat_map(|(_, columns)| columns.iter().cloned())
                .collect(),
        }
    }

    /// Metadata for one column, if known.
    pub fn column(&self, table: &str, column: &str) -> Option<&ColumnInfo> {
        self.tables
            .iter()
            .find(|(t, _)| t == table)
            .and_then(|(_, columns)| columns.iter().find(|c| c.name == column))
    }
}

/// Parse the member list out of an `enum(...)` or `set(...)` column type.
///
/// Returns an empty vector for any other type.
pub fn enum_members(type_name: &str) -> Vec<String> {
    let trimmed = type_name.trim();
    let lower = trimmed.to_ascii_lowercase();
    let inner = if let Some(rest) = lower.strip_prefix("enum(") {
        rest
    } else if let Some(rest) = lower.strip_prefix("set(") {
        rest
    } else {
        return Vec::new();
    };
    let Some(inner) = inner.strip_suffix(')') else {
        return Vec::new();
    };

    // Members are single-quoted with '' escaping; split on commas outside
    // quotes. Member text is taken from the original casing.
    let offset = trimmed.len() - inner.len() - 1;
    let raw = &trimmed[offset..offset + inner.len()];

    let mut members = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if in_quotes && chars.peek() == Some(&'\'') => {
                chars.next();
                current.push('\'');
            }
            '\'' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                members.push(std::mem::take(&mut current).trim().to_string());
            }
            _ if in_quotes => current.push(c),
            _ => {}
        }
    }
    if !current.is_empty() || !members.is_empty() {
        members.push(current.trim().to_string());
    }
    members.retain(|m| !m.is_empty());
    members
}
