//! Transaction state machine and statement log.
//!
//! This component tracks state and bookkeeping only; the actual
//! begin/commit/rollback driver calls are issued by the engine, which
//! consults the state machine first. Transactions never nest.

use crate::db::tracker::QueryLogEntry;
use crate::error::{DbError, DbResult};
use crate::models::IsolationLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Idle,
    Active,
}

/// Tracks the one allowed transaction per connection.
#[derive(Debug)]
pub struct TransactionManager {
    state: TxState,
    isolation: Option<IsolationLevel>,
    /// Statements executed within the current or most recent transaction.
    entries: Vec<QueryLogEntry>,
    /// True while `entries` describes the current-or-just-closed
    /// transaction; cleared when the next one starts.
    log_is_current: bool,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            state: TxState::Idle,
            isolation: None,
            entries: Vec::new(),
            log_is_current: false,
        }
    }

    /// Whether a transaction is open.
    pub fn is_active(&self) -> bool {
        self.state == TxState::Active
    }

    /// Isolation intent of the current or most recent transaction.
    pub fn isolation(&self) -> Option<IsolationLevel> {
        self.isolation
    }

    /// Enter the active state with a fresh entry log.
    ///
    /// Valid only from idle; a second start while active is an error, not
    /// a nested transaction.
    pub fn start(&mut self, isolation: Option<IsolationLevel>) -> DbResult<()> {
        if self.state == TxState::Active {
            return Err(DbError::transaction(
                "transaction already active; transactions do not nest",
            ));
        }
        self.state = TxState::Active;
        self.isolation = isolation;
        self.entries.clear();
        self.log_is_current = true;
        Ok(())
    }

    /// Append an executed statement to the open transaction's log.
    /// Ignored while idle.
    pub fn append(&mut self, entry: QueryLogEntry) {
        if self.state == TxState::Active {
            self.entries.push(entry);
        }
    }

    /// Leave the active state after a commit.
    ///
    /// The entry log is retained for [`TransactionManager::recent_log`]
    /// until the next transaction starts. Committing while idle is a
    /// programmer error.
    pub fn commit(&mut self) -> DbResult<()> {
        if self.state == TxState::Idle {
            return Err(DbError::transaction("commit with no active transaction"));
        }
        self.state = TxState::Idle;
        Ok(())
    }

    /// Leave the active state after a rollback.
    ///
    /// Returns false (and must trigger no driver call) when idle; true
    /// after an actual rollback, regardless of what the driver reported
    /// for it.
    pub fn rollback(&mut self) -> bool {
        if self.state == TxState::Idle {
            return false;
        }
        self.state = TxState::Idle;
        true
    }

    /// The ordered entry log of the open or just-closed transaction, if it
    /// is still current.
    pub fn recent_log(&self) -> Option<&[QueryLogEntry]> {
        if self.log_is_current && !self.entries.is_empty() {
            Some(&self.entries)
        } else {
            None
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
