//! Configuration handling for the access layer.
//!
//! A small scoped key/value reader consumed at startup: dotted-path lookup
//! over nested scopes, plus helpers for string arrays and server lists.
//! Parsing problems are plain `String` errors at this boundary; nothing
//! here touches the database error taxonomy.

use crate::models::ServerDescriptor;
use serde_json::Value;

/// A nested scope of configuration values.
pub type Scope = serde_json::Map<String, Value>;

/// Immutable configuration snapshot with dotted-path lookup.
///
/// `get("database.failover.hosts")` walks scope by scope; intermediate
/// segments must be scopes, the leaf may be any value.
#[derive(Debug, Clone)]
pub struct Settings {
    root: Value,
}

impl Settings {
    /// Parse settings from JSON text.
    pub fn from_json(text: &str) -> Result<Self, String> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| format!("Invalid configuration: {e}"))?;
        if !root.is_object() {
            return Err("Configuration root must be a scope".to_string());
        }
        Ok(Self { root })
    }

    /// Wrap an already-built value tree.
    pub fn from_value(root: Value) -> Result<Self, String> {
        if !root.is_object() {
            return Err("Configuration root must be a scope".to_string());
        }
        Ok(Self { root })
    }

    /// Resolve a dotted path to its raw value.
    pub fn get(&self, dotted_key: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in dotted_key.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// String value at a dotted path, or the default when absent.
    pub fn get_str<'a>(&'a self, dotted_key: &str, default: &'a str) -> &'a str {
        self.get(dotted_key)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }

    /// Boolean value at a dotted path, or the default when absent.
    pub fn get_bool(&self, dotted_key: &str, default: bool) -> bool {
        self.get(dotted_key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// Nested scope at a dotted path.
    pub fn get_scope(&self, dotted_key: &str) -> Option<&Scope> {
        self.get(dotted_key).and_then(Value::as_object)
    }

    /// Ordered string sequence at a dotted path; empty when absent or not
    /// an array.
    pub fn get_array(&self, dotted_key: &str) -> Vec<String> {
        self.get(dotted_key)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ordered server descriptors at a dotted path, for seeding a pool.
    pub fn servers(&self, dotted_key: &str) -> Result<Vec<ServerDescriptor>, String> {
        match self.get(dotted_key) {
            None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| format!("Invalid server list at '{dotted_key}': {e}")),
        }
    }
}
