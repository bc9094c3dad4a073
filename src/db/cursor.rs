//! Streaming row retrieval.

use crate::driver::RowReceiver;
use crate::error::{DbError, DbResult};
use crate::models::Row;

/// An open cursor over one in-flight statement.
///
/// Bound to the connection generation it was opened under; if the
/// connection is replaced or closed the cursor is dead and advancing it is
/// a programmer error. Dropping the cursor tells the driver to abandon the
/// statement.
#[derive(Debug)]
pub struct StreamingCursor {
    rows: RowReceiver,
    generation: u64,
}

impl StreamingCursor {
    /// Wrap a driver row receiver opened under the given connection
    /// generation.
    pub fn new(rows: RowReceiver, generation: u64) -> Self {
        Self { rows, generation }
    }

    /// The connection generation this cursor belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fetch the next row, or `None` when the result set is exhausted.
    ///
    /// The caller must have verified the generation still matches; a stale
    /// cursor would otherwise read rows from a connection that no longer
    /// exists.
    pub async fn next_row(&mut self) -> DbResult<Option<Row>> {
        match self.rows.recv().await {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    /// Build the error reported for a cursor whose connection was replaced.
    pub fn stale_error() -> DbError {
        DbError::invalid_cursor("owning connection was replaced or closed")
    }
}
