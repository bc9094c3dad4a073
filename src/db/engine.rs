//! Query execution engine - the public surface of the access layer.
//!
//! The engine owns the connection manager, transaction bookkeeping, the
//! execution tracker, the identifier-catalog cache and the (at most one)
//! streaming cursor. Every statement flows the same way: obtain a
//! connection, normalize placeholders, bind and execute through the
//! driver, classify the result by statement kind, record the execution.
//!
//! All methods take `&mut self`; the layer holds single mutable state (one
//! connection, one transaction, one cursor) and concurrent use requires
//! external serialization by construction.

use crate::db::catalog::{self, IdentifierCatalog};
use crate::db::connection::ConnectionManager;
use crate::db::cursor::StreamingCursor;
use crate::db::placeholder;
use crate::db::tracker::{QueryTracker, RENDER_WARNING};
use crate::db::transaction::TransactionManager;
use crate::driver::{Driver, DriverConnection};
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnInfo, IsolationLevel, Params, QueryOutcome, Row, ServerDescriptor, SqlValue,
    StatementKind,
};
use tracing::{info, warn};

/// A statement normalized once and reusable across executions.
///
/// Expansion of sequence parameters happens at prepare time only;
/// [`PreparedStatement::rebind`] accepts plain values and checks the count,
/// it never re-normalizes.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    text: String,
    placeholder_count: usize,
    values: Vec<SqlValue>,
}

impl PreparedStatement {
    /// The rewritten (anonymous-placeholder) statement text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The currently bound values.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Replace the bound values for the next execution.
    pub fn rebind<I, T>(&mut self, values: I) -> DbResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<SqlValue>,
    {
        let values: Vec<SqlValue> = values.into_iter().map(Into::into).collect();
        if values.len() != self.placeholder_count {
            return Err(DbError::binding(format!(
                "{} placeholders but {} values rebound",
                self.placeholder_count,
                values.len()
            )));
        }
        self.values = values;
        Ok(())
    }
}

/// The access layer's facade: failover-managed connection, safe binding,
/// execution dispatch, transaction and cursor tracking.
pub struct QueryEngine<D: Driver> {
    manager: ConnectionManager<D>,
    tracker: QueryTracker,
    txn: TransactionManager,
    /// Catalog and flattened column list, each keyed by the connection
    /// generation they were loaded under.
    catalog: Option<(u64, IdentifierCatalog)>,
    all_columns: Option<(u64, Vec<String>)>,
    cursor: Option<StreamingCursor>,
}

impl<D: Driver> QueryEngine<D> {
    /// Create an engine over a driver and an ordered server list. No
    /// connection is established until first use.
    pub fn new(driver: D, servers: Vec<ServerDescriptor>) -> Self {
        Self {
            manager: ConnectionManager::new(driver, servers),
            tracker: QueryTracker::new(),
            txn: TransactionManager::new(),
            catalog: None,
            all_columns: None,
            cursor: None,
        }
    }

    /// Create an engine with its server pool read from configuration.
    pub fn from_settings(
        driver: D,
        settings: &crate::config::Settings,
        servers_key: &str,
    ) -> Result<Self, String> {
        Ok(Self::new(driver, settings.servers(servers_key)?))
    }

    // -------------------------------------------------------------------
    // Connection surface
    // -------------------------------------------------------------------

    /// Whether a live connection exists.
    pub fn connection_exists(&self) -> bool {
        self.manager.connection_exists()
    }

    /// Host of the live connection, or `"No Connection"`.
    pub fn get_host(&self) -> String {
        self.manager.host()
    }

    /// Database name of the live connection, or empty.
    pub fn get_database_name(&self) -> String {
        self.manager.database_name()
    }

    /// Set the error-reporting mode of the live connection: suppress
    /// statement failures into falsy outcomes, or propagate them.
    ///
    /// A no-op when no connection exists; the mode is connection-scoped
    /// and not remembered across reconnects.
    pub fn silent_errors(&mut self, silent: bool) {
        self.manager.silent_errors(silent);
    }

    /// Randomize the server attempt order used by the next connect.
    pub fn load_balance(&mut self) {
        self.manager.load_balance();
    }

    /// Explicitly (re)connect, walking the server pool in current order.
    pub async fn connect(&mut self) -> DbResult<()> {
        // The old connection cannot close while a cursor task still holds
        // it; drop the cursor first.
        self.cursor = None;
        self.manager.connect().await
    }

    /// Switch persistence mode, reconnecting under the new flag when it
    /// actually changes.
    pub async fn set_persistent_connection(&mut self, persistent: bool) -> DbResult<()> {
        if persistent != self.manager.persistent() {
            self.cursor = None;
        }
        self.manager.set_persistent(persistent).await
    }

    /// Release the connection. Metadata reverts to the no-connection
    /// sentinels; caches and cursors tied to the connection die with it.
    pub async fn close(&mut self) {
        if self.txn.is_active() {
            warn!("Closing connection with an open transaction; work is discarded");
            self.txn.rollback();
        }
        self.cursor = None;
        self.manager.close().await;
    }

    // -------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------

    /// Execute a statement with bound parameters.
    ///
    /// Return semantics follow the statement kind, detected from the
    /// leading keyword: row-returning forms yield [`QueryOutcome::Rows`]
    /// (empty for zero rows), INSERT yields the generated key, everything
    /// else the affected-row count. Under silent-errors mode a driver
    /// failure becomes [`QueryOutcome::Failure`] plus a warning instead of
    /// an error.
    pub async fn query(
        &mut self,
        stmt: &str,
        params: impl Into<Params>,
    ) -> DbResult<QueryOutcome> {
        let params = params.into();
        let expanded = placeholder::expand(stmt, &params)?;
        self.run(&expanded.text, &expanded.values).await
    }

    /// Execute a prepared statement, skipping expansion.
    pub async fn query_prepared(&mut self, stmt: &PreparedStatement) -> DbResult<QueryOutcome> {
        self.run(&stmt.text, &stmt.values).await
    }

    /// Normalize a statement once for repeated execution.
    pub fn prepare(&self, stmt: &str, params: impl Into<Params>) -> DbResult<PreparedStatement> {
        let params = params.into();
        let expanded = placeholder::expand(stmt, &params)?;
        Ok(PreparedStatement {
            placeholder_count: expanded.values.len(),
            text: expanded.text,
            values: expanded.values,
        })
    }

    /// Execute and return the first row; zero rows is a fatal
    /// [`DbError::NoRow`] regardless of silent-errors mode.
    pub async fn query_row(&mut self, stmt: &str, params: impl Into<Params>) -> DbResult<Row> {
        match self.query_row_opt(stmt, params).await? {
            Some(row) => Ok(row),
            None => Err(DbError::no_row(stmt.to_string())),
        }
    }

    /// Execute and return the first row, or `None` for zero rows.
    pub async fn query_row_opt(
        &mut self,
        stmt: &str,
        params: impl Into<Params>,
    ) -> DbResult<Option<Row>> {
        match self.query(stmt, params).await? {
            QueryOutcome::Rows(mut rows) => {
                if rows.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(rows.swap_remove(0)))
                }
            }
            _ => Ok(None),
        }
    }

    /// Execute and return the values at one column index from every row.
    pub async fn query_column(
        &mut self,
        stmt: &str,
        params: impl Into<Params>,
        column_index: usize,
    ) -> DbResult<Vec<SqlValue>> {
        let outcome = self.query(stmt, params).await?;
        let mut values = Vec::with_capacity(outcome.rows().len());
        for row in outcome.rows() {
            match row.get_index(column_index) {
                Some(value) => values.push(value.clone()),
                None => {
                    return Err(DbError::internal(format!(
                        "column index {} out of range for a {}-column row",
                        column_index,
                        row.len()
                    )));
                }
            }
        }
        Ok(values)
    }

    // -------------------------------------------------------------------
    // Rendering (no execution)
    // -------------------------------------------------------------------

    /// Render a statement with its parameters substituted, without
    /// executing it. Prefixed with [`RENDER_WARNING`] unless suppressed.
    pub fn query_return(
        &self,
        stmt: &str,
        params: impl Into<Params>,
        suppress_warning: bool,
    ) -> DbResult<String> {
        let params = params.into();
        let expanded = placeholder::expand(stmt, &params)?;
        let rendered = QueryTracker::render(&expanded.text, &expanded.values);
        Ok(Self::with_warning(rendered, suppress_warning))
    }

    /// Like [`QueryEngine::query_return`], additionally logging the
    /// rendering.
    pub fn query_dump(
        &self,
        stmt: &str,
        params: impl Into<Params>,
        suppress_warning: bool,
    ) -> DbResult<String> {
        let rendered = self.query_return(stmt, params, suppress_warning)?;
        info!(statement = %rendered, "Statement dump");
        Ok(rendered)
    }

    /// Render a prepared statement with its currently bound values.
    pub fn statement_return(&self, stmt: &PreparedStatement) -> String {
        let rendered = QueryTracker::render(&stmt.text, &stmt.values);
        Self::with_warning(rendered, false)
    }

    fn with_warning(rendered: String, suppress: bool) -> String {
        if suppress {
            rendered
        } else {
            format!("{RENDER_WARNING}{rendered}")
        }
    }

    /// Quote a value for literal inclusion, letting purely numeric values
    /// through unquoted.
    pub async fn quote_smart(&mut self, value: &SqlValue) -> DbResult<String> {
        if value.is_numeric() {
            return Ok(match value {
                SqlValue::Text(s) => s.clone(),
                other => other.literal(),
            });
        }
        let conn = self.manager.obtain().await?;
        Ok(conn.quote(value))
    }

    // -------------------------------------------------------------------
    // Streaming cursor
    // -------------------------------------------------------------------

    /// Execute without materializing rows; rows are then pulled one at a
    /// time with [`QueryEngine::query_next`]. An already-open cursor is
    /// implicitly discarded.
    pub async fn query_loop(&mut self, stmt: &str, params: impl Into<Params>) -> DbResult<()> {
        let params = params.into();
        let expanded = placeholder::expand(stmt, &params)?;

        if self.cursor.take().is_some() {
            warn!("Discarding previously open cursor");
        }

        let conn = self.manager.obtain().await?;
        let opened = conn
            .open_cursor(expanded.text.clone(), expanded.values.clone())
            .await;
        let entry = self.tracker.record(&expanded.text, &expanded.values);
        self.txn.append(entry);

        let receiver = opened?;
        self.cursor = Some(StreamingCursor::new(receiver, self.manager.generation()));
        Ok(())
    }

    /// Advance the open cursor; `Ok(None)` when the result set is
    /// exhausted. A cursor that outlived its connection, or a call with no
    /// cursor open, is a fatal [`DbError::InvalidCursor`].
    pub async fn query_next(&mut self) -> DbResult<Option<Row>> {
        let stale = match &self.cursor {
            None => {
                return Err(DbError::invalid_cursor(
                    "no cursor is open; call query_loop first",
                ));
            }
            Some(cursor) => {
                cursor.generation() != self.manager.generation()
                    || !self.manager.connection_exists()
            }
        };
        if stale {
            self.cursor = None;
            return Err(StreamingCursor::stale_error());
        }
        match self.cursor.as_mut() {
            Some(cursor) => cursor.next_row().await,
            None => Err(StreamingCursor::stale_error()),
        }
    }

    // -------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------

    /// Begin a transaction, optionally with an isolation intent.
    /// Transactions never nest.
    pub async fn start_transaction(
        &mut self,
        isolation: Option<IsolationLevel>,
    ) -> DbResult<()> {
        if self.txn.is_active() {
            return Err(DbError::transaction(
                "transaction already active; transactions do not nest",
            ));
        }
        let conn = self.manager.obtain().await?;
        conn.begin(isolation).await?;
        self.txn.start(isolation)?;
        info!(isolation = ?isolation, "Transaction started");
        Ok(())
    }

    /// Commit the open transaction. Committing while idle is a programmer
    /// error.
    pub async fn commit_transaction(&mut self) -> DbResult<()> {
        if !self.txn.is_active() {
            return self.txn.commit();
        }
        match self.manager.current() {
            Some(conn) => conn.commit().await?,
            None => {
                self.txn.rollback();
                return Err(DbError::transaction(
                    "transaction connection no longer exists",
                ));
            }
        }
        self.txn.commit()?;
        info!("Transaction committed");
        Ok(())
    }

    /// Roll back the open transaction. Returns false, with no driver call,
    /// when no transaction is active; true after an actual rollback.
    pub async fn rollback_transaction(&mut self) -> DbResult<bool> {
        if !self.txn.is_active() {
            return Ok(false);
        }
        if let Some(conn) = self.manager.current() {
            conn.rollback().await?;
        }
        self.txn.rollback();
        info!("Transaction rolled back");
        Ok(true)
    }

    // -------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------

    /// Validate an untrusted identifier against the catalog.
    ///
    /// Returns the identifier (delimiter-quoted when `quote` is true) when
    /// it names a known table or column, and an empty string otherwise.
    /// This is the sole sanctioned path for putting untrusted identifiers
    /// into statement text.
    pub async fn escape_identifier(&mut self, name: &str, quote: bool) -> DbResult<String> {
        let matched = self
            .ensure_catalog()
            .await?
            .lookup(name)
            .map(str::to_string);
        match matched {
            Some(valid) if quote => Ok(self.manager.driver().quote_identifier(&valid)),
            Some(valid) => Ok(valid),
            None => Ok(String::new()),
        }
    }

    /// All table names.
    pub async fn get_tables(&mut self) -> DbResult<Vec<String>> {
        Ok(self.ensure_catalog().await?.tables())
    }

    /// Every distinct column name across all tables. Memoized for the
    /// connection lifetime.
    pub async fn get_all_columns(&mut self) -> DbResult<Vec<String>> {
        self.manager.obtain().await?;
        let generation = self.manager.generation();
        if let Some((cached_gen, columns)) = &self.all_columns {
            if *cached_gen == generation {
                return Ok(columns.clone());
            }
        }
        let columns = self.ensure_catalog().await?.all_columns();
        self.all_columns = Some((generation, columns.clone()));
        Ok(columns)
    }

    /// Column metadata for one table (ordinal order), or for every table
    /// in catalog order when `table` is `None`.
    pub async fn get_table_columns(
        &mut self,
        table: Option<&str>,
    ) -> DbResult<Vec<ColumnInfo>> {
        Ok(self.ensure_catalog().await?.table_columns(table))
    }

    /// Member values of an `enum(...)`/`set(...)` column; empty for any
    /// other column type or unknown column.
    pub async fn enum_values(&mut self, table: &str, column: &str) -> DbResult<Vec<String>> {
        let members = match self.ensure_catalog().await?.column(table, column) {
            Some(info) => catalog::enum_members(&info.type_name),
            None => Vec::new(),
        };
        Ok(members)
    }

    // -------------------------------------------------------------------
    // Tracking
    // -------------------------------------------------------------------

    /// Executions recorded by this engine.
    pub fn get_query_count(&self) -> u64 {
        self.tracker.count()
    }

    /// Rendered dump of the most recent transaction's statement log (while
    /// open or just closed), else the single most recent statement.
    pub fn get_last(&self) -> String {
        if let Some(log) = self.txn.recent_log() {
            log.iter()
                .map(|entry| entry.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            self.tracker
                .last()
                .map(|entry| entry.text.clone())
                .unwrap_or_default()
        }
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    /// Execute normalized text+values and classify the result.
    async fn run(&mut self, text: &str, values: &[SqlValue]) -> DbResult<QueryOutcome> {
        let kind = StatementKind::classify(text);
        let conn = self.manager.obtain().await?;

        let result = match kind {
            StatementKind::Read => conn.fetch_all(text, values).await.map(QueryOutcome::Rows),
            StatementKind::Insert => conn
                .execute(text, values)
                .await
                .map(|outcome| QueryOutcome::LastInsertId(outcome.last_insert_id)),
            StatementKind::Write | StatementKind::Other => conn
                .execute(text, values)
                .await
                .map(|outcome| QueryOutcome::Affected(outcome.rows_affected)),
        };

        let entry = self.tracker.record(text, values);
        self.txn.append(entry);

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_recoverable() && self.manager.silent() => {
                warn!(error = %err, "Statement failed; suppressed by silent-errors mode");
                Ok(QueryOutcome::Failure(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Load (or reuse) the identifier catalog for the current connection
    /// generation.
    async fn ensure_catalog(&mut self) -> DbResult<&IdentifierCatalog> {
        self.manager.obtain().await?;
        let generation = self.manager.generation();
        let cached = self
            .catalog
            .as_ref()
            .is_some_and(|(cached_gen, _)| *cached_gen == generation);
        if !cached {
            let conn = self.manager.obtain().await?;
            let loaded = IdentifierCatalog::load(conn).await?;
            self.catalog = Some((generation, loaded));
        }
        match &self.catalog {
            Some((_, catalog)) => Ok(catalog),
            None => Err(DbError::internal("identifier catalog unavailable")),
        }
    }
}
