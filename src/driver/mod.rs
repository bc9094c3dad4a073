//! Driver capability interface.
//!
//! The access layer depends on these traits, never on a concrete client
//! type. A driver supplies connection establishment; a driver connection
//! supplies statement execution, row fetching, cursor streaming,
//! transaction control, introspection and value quoting.
//!
//! Parameter binding happens below this boundary: the layer hands the
//! driver a rewritten statement plus a flat, order-matched value list, and
//! the driver binds them. Statement text is never built by interpolating
//! values.

pub mod sqlite;

use crate::error::DbResult;
use crate::models::{ColumnInfo, IsolationLevel, Row, ServerDescriptor, SqlValue};
use tokio::sync::mpsc::Receiver;

pub use sqlite::SqliteDriver;

/// Channel end a streaming cursor reads rows from.
///
/// The driver feeds the sending side; dropping the receiver tells the
/// driver to abandon the in-flight statement.
pub type RowReceiver = Receiver<DbResult<Row>>;

/// Result of a non-returning statement execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Generated key, when the driver reports one for this statement.
    pub last_insert_id: Option<i64>,
}

/// Connection factory for one database backend.
#[allow(async_fn_in_trait)]
pub trait Driver {
    type Conn: DriverConnection;

    /// Establish a connection to one server.
    ///
    /// `persistent` asks the driver to keep the connection alive while
    /// idle; how that maps to the backend is driver-specific.
    async fn connect(&self, server: &ServerDescriptor, persistent: bool) -> DbResult<Self::Conn>;

    /// Delimiter-quote an identifier for this backend.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// One established connection.
///
/// All methods take `&mut self`: a connection is single-flight by contract
/// and the borrow checker enforces it.
#[allow(async_fn_in_trait)]
pub trait DriverConnection {
    /// Execute a non-returning statement with bound values.
    async fn execute(&mut self, sql: &str, values: &[SqlValue]) -> DbResult<ExecOutcome>;

    /// Execute a row-returning statement and buffer every row.
    async fn fetch_all(&mut self, sql: &str, values: &[SqlValue]) -> DbResult<Vec<Row>>;

    /// Execute a row-returning statement without materializing rows; the
    /// receiver yields them one at a time.
    async fn open_cursor(&mut self, sql: String, values: Vec<SqlValue>) -> DbResult<RowReceiver>;

    /// Begin a transaction. Drivers may approximate or ignore the isolation
    /// intent.
    async fn begin(&mut self, isolation: Option<IsolationLevel>) -> DbResult<()>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> DbResult<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> DbResult<()>;

    /// All table names, in the backend's introspection order.
    async fn list_tables(&mut self) -> DbResult<Vec<String>>;

    /// Column metadata for one table, in ordinal order.
    async fn list_columns(&mut self, table: &str) -> DbResult<Vec<ColumnInfo>>;

    /// Quote a value as a SQL literal the way this backend escapes it.
    fn quote(&self, value: &SqlValue) -> String;

    /// Release driver-level resources. The connection must not be used
    /// afterwards.
    async fn close(&mut self);
}
