//! Database access core.
//!
//! This module provides the access layer proper:
//! - Connection lifecycle with multi-server failover
//! - Placeholder expansion and safe parameter binding
//! - Query execution with kind-dispatched return semantics
//! - Streaming cursors
//! - Transaction state tracking
//! - Identifier whitelisting
//! - Execution counting and statement rendering

pub mod catalog;
pub mod connection;
pub mod cursor;
pub mod engine;
pub mod placeholder;
pub mod server_pool;
pub mod tracker;
pub mod transaction;

pub use catalog::IdentifierCatalog;
pub use connection::{ConnectionManager, NO_CONNECTION_HOST};
pub use cursor::StreamingCursor;
pub use engine::{PreparedStatement, QueryEngine};
pub use placeholder::Expanded;
pub use server_pool::ServerPool;
pub use tracker::{QueryLogEntry, QueryTracker, RENDER_WARNING};
pub use transaction::TransactionManager;
