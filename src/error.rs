//! Error types for the access layer.
//!
//! This module defines all error types using `thiserror` for ergonomic error
//! handling. The taxonomy separates connect-time failures (always fatal) from
//! statement failures (recoverable under silent-errors mode) and programmer
//! errors (always fatal).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Every server in the pool was attempted and none accepted a connection,
    /// or the driver failed while establishing one.
    #[error("Connection failed: {message}")]
    Connection {
        message: String,
        /// Hosts tried during failover, in attempt order. Empty when the
        /// failure was not a pool walk (e.g. I/O loss mid-session).
        attempted: Vec<String>,
    },

    /// The driver reported a statement failure.
    #[error("Execution failed: {message}")]
    Execution {
        message: String,
        /// e.g. "42P01" for undefined table, when the driver supplies one
        sql_state: Option<String>,
    },

    /// A query that must produce a row produced none.
    #[error("Query returned no rows: {context}")]
    NoRow { context: String },

    /// A streaming cursor was used after its owning connection was replaced,
    /// or no cursor is open.
    #[error("Cursor is not valid: {reason}")]
    InvalidCursor { reason: String },

    /// Placeholder/parameter mismatch: wrong count, mixed placeholder styles,
    /// or a sequence bound to a named placeholder.
    #[error("Parameter binding failed: {message}")]
    Binding { message: String },

    /// Invalid transaction state transition.
    #[error("Transaction error: {message}")]
    Transaction { message: String },

    /// Decode failures and other conditions that indicate a bug.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with the list of attempted hosts.
    pub fn connection(message: impl Into<String>, attempted: Vec<String>) -> Self {
        Self::Connection {
            message: message.into(),
            attempted,
        }
    }

    /// Create an execution error with an optional SQL state.
    pub fn execution(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a no-row error.
    pub fn no_row(context: impl Into<String>) -> Self {
        Self::NoRow {
            context: context.into(),
        }
    }

    /// Create an invalid-cursor error.
    pub fn invalid_cursor(reason: impl Into<String>) -> Self {
        Self::InvalidCursor {
            reason: reason.into(),
        }
    }

    /// Create a binding error.
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding {
            message: message.into(),
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether silent-errors mode may absorb this error.
    ///
    /// Only driver-reported statement failures are recoverable; connect
    /// failures, missing rows, cursor misuse and binding mistakes always
    /// propagate.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::execution(db_err.message().to_string(), code)
            }
            sqlx::Error::RowNotFound => DbError::no_row("driver reported an empty result"),
            sqlx::Error::Configuration(msg) => DbError::connection(msg.to_string(), Vec::new()),
            sqlx::Error::Io(io_err) => {
                DbError::connection(format!("I/O error: {}", io_err), Vec::new())
            }
            sqlx::Error::Tls(tls_err) => {
                DbError::connection(format!("TLS error: {}", tls_err), Vec::new())
            }
            sqlx::Error::Protocol(msg) => {
                DbError::connection(format!("Protocol error: {}", msg), Vec::new())
            }
            sqlx::Error::PoolTimedOut => {
                DbError::connection("Timed out acquiring the connection", Vec::new())
            }
            sqlx::Error::PoolClosed => DbError::connection("Connection is closed", Vec::new()),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::internal(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
