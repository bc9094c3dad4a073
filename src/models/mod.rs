//! Data models shared across the access layer.

pub mod column;
pub mod outcome;
pub mod row;
pub mod server;
pub mod value;

pub use column::ColumnInfo;
pub use outcome::{QueryOutcome, StatementKind};
pub use row::Row;
pub use server::ServerDescriptor;
pub use value::{Param, Params, SqlValue};

/// Isolation-level intent recorded when a transaction starts.
///
/// Drivers that cannot honor a level may approximate or ignore it; the
/// intent is still tracked for the transaction's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadCommitted => write!(f, "read-committed"),
            Self::RepeatableRead => write!(f, "repeatable-read"),
        }
    }
}
