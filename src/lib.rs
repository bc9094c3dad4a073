//! sqlgate - a failover-aware database access layer.
//!
//! Sits between application code and a database driver, providing
//! multi-server failover, safe parameter binding with placeholder
//! expansion, identifier whitelisting, transaction lifecycle tracking and
//! both buffered and streaming result retrieval. The driver itself is an
//! explicit capability interface ([`driver::Driver`]); a SQLite
//! implementation over sqlx ships with the crate.

pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod models;

pub use config::Settings;
pub use db::{PreparedStatement, QueryEngine};
pub use driver::SqliteDriver;
pub use error::{DbError, DbResult};
pub use models::{
    ColumnInfo, IsolationLevel, Param, Params, QueryOutcome, Row, ServerDescriptor, SqlValue,
    StatementKind,
};
