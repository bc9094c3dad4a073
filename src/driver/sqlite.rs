//! SQLite driver built on sqlx.
//!
//! The backend holds a single-connection pool (`max_connections = 1`), so
//! the one pooled handle is the spec's single connection: statements,
//! transactions and cursors all flow through it. Persistent mode pins the
//! idle connection open; non-persistent mode lets it lapse after an idle
//! timeout.
//!
//! While a transaction is open the driver holds the `sqlx::Transaction`
//! and routes statements through it; dropping it unrolled rolls back.

use crate::driver::{Driver, DriverConnection, ExecOutcome, RowReceiver};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnInfo, IsolationLevel, Row, ServerDescriptor, SqlValue};
use futures_util::StreamExt;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Default pool acquire timeout in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Idle timeout applied to non-persistent connections, in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

mod queries {
    pub const LIST_TABLES: &str = r#"
        SELECT name FROM sqlite_master
        WHERE type = 'table'
        AND name NOT LIKE 'sqlite_%'
        ORDER BY name
        "#;
}

/// SQLite connection factory.
///
/// The descriptor's `database` field is the database file path; `host` is
/// carried for reporting only and credentials are ignored (file access
/// control is the filesystem's job).
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    create_if_missing: bool,
    acquire_timeout: Duration,
    idle_timeout: Duration,
}

impl SqliteDriver {
    /// Create a driver that requires the database file to exist.
    pub fn new() -> Self {
        Self {
            create_if_missing: false,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }

    /// Allow creating the database file on first connect.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Override the pool acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for SqliteDriver {
    type Conn = SqliteConnection;

    async fn connect(
        &self,
        server: &ServerDescriptor,
        persistent: bool,
    ) -> DbResult<SqliteConnection> {
        let options = SqliteConnectOptions::new()
            .filename(&server.database)
            .create_if_missing(self.create_if_missing)
            .foreign_keys(true);

        // Persistent connections are pinned open; non-persistent ones may
        // lapse while idle and are reopened transparently by the pool.
        let (min_connections, idle_timeout) = if persistent {
            (1, None)
        } else {
            (0, Some(self.idle_timeout))
        };

        let pool = SqlitePoolOptions::new()
            .min_connections(min_connections)
            .max_connections(1)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(idle_timeout)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(DbError::from)?;

        info!(
            host = %server.host,
            database = %server.database,
            persistent = persistent,
            "Opened SQLite database"
        );

        Ok(SqliteConnection { pool, tx: None })
    }
}

/// One open SQLite database.
pub struct SqliteConnection {
    pool: SqlitePool,
    tx: Option<sqlx::Transaction<'static, Sqlite>>,
}

impl SqliteConnection {
    async fn run_fetch_all(&mut self, sql: &str, values: &[SqlValue]) -> DbResult<Vec<SqliteRow>> {
        let mut query = sqlx::query(sql);
        for value in values {
            query = bind_value(query, value);
        }
        let result = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        };
        result.map_err(DbError::from)
    }
}

impl DriverConnection for SqliteConnection {
    async fn execute(&mut self, sql: &str, values: &[SqlValue]) -> DbResult<ExecOutcome> {
        debug!(sql = %sql, params = values.len(), "Executing statement");

        let mut query = sqlx::query(sql);
        for value in values {
            query = bind_value(query, value);
        }
        let result = match self.tx.as_mut() {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        }
        .map_err(DbError::from)?;

        let last_id = result.last_insert_rowid();
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: (last_id > 0).then_some(last_id),
        })
    }

    async fn fetch_all(&mut self, sql: &str, values: &[SqlValue]) -> DbResult<Vec<Row>> {
        debug!(sql = %sql, params = values.len(), "Fetching rows");
        let rows = self.run_fetch_all(sql, values).await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn open_cursor(&mut self, sql: String, values: Vec<SqlValue>) -> DbResult<RowReceiver> {
        debug!(sql = %sql, params = values.len(), "Opening cursor");

        // The transaction handle cannot cross a task boundary, so a cursor
        // opened inside a transaction degrades to a buffered snapshot.
        if self.tx.is_some() {
            let rows = self.fetch_all(&sql, &values).await?;
            let (sender, receiver) = mpsc::channel(rows.len().max(1));
            for row in rows {
                let _ = sender.try_send(Ok(row));
            }
            return Ok(receiver);
        }

        let (sender, receiver) = mpsc::channel::<DbResult<Row>>(1);
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let mut query = sqlx::query(&sql);
            for value in &values {
                query = bind_value(query, value);
            }
            let mut stream = query.fetch(&pool);
            while let Some(item) = stream.next().await {
                let message = item.map(|row| decode_row(&row)).map_err(DbError::from);
                if sender.send(message).await.is_err() {
                    debug!("Cursor receiver dropped; abandoning statement");
                    break;
                }
            }
        });
        Ok(receiver)
    }

    async fn begin(&mut self, isolation: Option<IsolationLevel>) -> DbResult<()> {
        if self.tx.is_some() {
            return Err(DbError::transaction("transaction already open"));
        }
        if let Some(level) = isolation {
            // SQLite transactions are always serializable; the intent is
            // recorded upstream and noted here.
            debug!(isolation = %level, "Isolation intent noted (SQLite is serializable)");
        }
        let tx = self.pool.begin().await.map_err(DbError::from)?;
        self.tx = Some(tx);
        Ok(())
    }

    async fn commit(&mut self) -> DbResult<()> {
        match self.tx.take() {
            Some(tx) => tx.commit().await.map_err(DbError::from),
            None => Err(DbError::transaction("no open transaction to commit")),
        }
    }

    async fn rollback(&mut self) -> DbResult<()> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(DbError::from),
            None => Err(DbError::transaction("no open transaction to roll back")),
        }
    }

    async fn list_tables(&mut self) -> DbResult<Vec<String>> {
        let rows = self.fetch_all(queries::LIST_TABLES, &[]).await?;
        Ok(rows
            .iter()
            .filter_map(|row| match row.get("name") {
                Some(SqlValue::Text(name)) => Some(name.clone()),
                _ => None,
            })
            .collect())
    }

    async fn list_columns(&mut self, table: &str) -> DbResult<Vec<ColumnInfo>> {
        let pragma = format!("PRAGMA table_info('{}')", table.replace('\'', "''"));
        let rows = self.fetch_all(&pragma, &[]).await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = match row.get("name") {
                    Some(SqlValue::Text(name)) => name.clone(),
                    _ => return None,
                };
                let type_name = match row.get("type") {
                    Some(SqlValue::Text(t)) => t.clone(),
                    _ => String::new(),
                };
                let notnull = matches!(row.get("notnull"), Some(SqlValue::Int(v)) if *v != 0);
                let pk = match row.get("pk") {
                    Some(SqlValue::Int(v)) => *v,
                    _ => 0,
                };
                let ordinal = match row.get("cid") {
                    Some(SqlValue::Int(v)) => *v as u32,
                    _ => 0,
                };
                // An INTEGER PRIMARY KEY aliases the rowid and is generated
                // by the database when omitted from an insert.
                let auto = pk == 1 && type_name.eq_ignore_ascii_case("integer");

                Some(
                    ColumnInfo::new(name, type_name, !notnull && pk == 0, ordinal)
                        .with_auto_generated(auto),
                )
            })
            .collect())
    }

    fn quote(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(true) => "1".to_string(),
            SqlValue::Bool(false) => "0".to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            SqlValue::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
                format!("X'{}'", hex)
            }
        }
    }

    async fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            // Uncommitted work does not survive a close.
            let _ = tx.rollback().await;
        }
        self.pool.close().await;
        info!("Closed SQLite database");
    }
}

/// Bind one value to a query.
fn bind_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q SqlValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
    }
}

/// Convert a driver row to the unified row model.
fn decode_row(row: &SqliteRow) -> Row {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for column in row.columns() {
        columns.push(column.name().to_string());
        values.push(decode_value(row, column.ordinal()));
    }
    Row::new(columns, values)
}

/// Decode one column by its declared/storage type.
fn decode_value(row: &SqliteRow, index: usize) -> SqlValue {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) => {
            if raw.is_null() {
                return SqlValue::Null;
            }
            raw.type_info().name().to_ascii_uppercase()
        }
        Err(_) => return SqlValue::Null,
    };

    match type_name.as_str() {
        "INTEGER" => row
            .try_get::<i64, _>(index)
            .map(SqlValue::Int)
            .unwrap_or(SqlValue::Null),
        "REAL" => row
            .try_get::<f64, _>(index)
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Null),
        "BOOLEAN" => row
            .try_get::<bool, _>(index)
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(SqlValue::Bytes)
            .unwrap_or(SqlValue::Null),
        // TEXT, NUMERIC, DATE/TIME affinities: take the textual form, then
        // fall back through the numeric decodings.
        _ => row
            .try_get::<String, _>(index)
            .map(SqlValue::Text)
            .or_else(|_| row.try_get::<f64, _>(index).map(SqlValue::Float))
            .or_else(|_| row.try_get::<i64, _>(index).map(SqlValue::Int))
            .unwrap_or(SqlValue::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_defaults() {
        let driver = SqliteDriver::new();
        assert!(!driver.create_if_missing);
        assert_eq!(
            driver.acquire_timeout,
            Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_quote_identifier_default() {
        let driver = SqliteDriver::new();
        assert_eq!(driver.quote_identifier("users"), "\"users\"");
        assert_eq!(driver.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
