//! Server descriptor model.

use serde::{Deserialize, Serialize};

/// One candidate database server.
///
/// Immutable once supplied; the pool holds an ordered sequence of these and
/// only the ordering may change. For file-backed drivers (SQLite) the
/// `database` field is the file path and `host` is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub host: String,
    #[serde(default)]
    pub username: String,
    /// Sensitive - never logged.
    #[serde(default)]
    pub password: String,
    pub database: String,
}

impl ServerDescriptor {
    /// Create a descriptor with credentials.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    /// Create a credential-less descriptor (file-backed drivers).
    pub fn local(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self::new(host, "", "", database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_json() {
        let desc: ServerDescriptor = serde_json::from_str(
            r#"{"host": "db1.example.com", "username": "app", "password": "s3cret", "database": "main"}"#,
        )
        .unwrap();
        assert_eq!(desc.host, "db1.example.com");
        assert_eq!(desc.database, "main");
    }

    #[test]
    fn test_descriptor_credentials_optional() {
        let desc: ServerDescriptor =
            serde_json::from_str(r#"{"host": "local", "database": "/tmp/app.sqlite"}"#).unwrap();
        assert!(desc.username.is_empty());
        assert!(desc.password.is_empty());
    }
}
