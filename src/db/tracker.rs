//! Execution counting and statement rendering.
//!
//! Every execution, successful or failed, is counted and logged here. The
//! tracker also renders a statement with its bound values substituted in,
//! which is what the log entries and the dump helpers show. Rendering is
//! for humans: the substituted text approximates what the driver runs and
//! must never itself be executed.
//!
//! The tracker is owned by its engine; nothing here is process-global.
//! Cross-engine aggregation, if ever needed, means sharing one tracker
//! explicitly.

use crate::db::placeholder;
use crate::models::SqlValue;
use chrono::{DateTime, Utc};

/// Warning line prepended to rendered statements, because parameter-type
/// coercion and escaping nuances are driver-specific.
pub const RENDER_WARNING: &str =
    "-- WARNING: rendered for inspection only; the driver may bind values differently\n";

/// One recorded execution.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLogEntry {
    /// Statement text with bound values rendered in.
    pub text: String,
    /// 1-based position in this tracker's execution history.
    pub ordinal: u64,
    pub at: DateTime<Utc>,
}

/// Per-engine execution counter and most-recent-statement log.
#[derive(Debug, Default)]
pub struct QueryTracker {
    count: u64,
    last: Option<QueryLogEntry>,
}

impl QueryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a statement with values substituted for its placeholders.
    pub fn render(text: &str, values: &[SqlValue]) -> String {
        placeholder::substitute(text, values)
    }

    /// Record one execution; returns the entry for transaction logs.
    pub fn record(&mut self, text: &str, values: &[SqlValue]) -> QueryLogEntry {
        self.count += 1;
        let entry = QueryLogEntry {
            text: Self::render(text, values),
            ordinal: self.count,
            at: Utc::now(),
        };
        self.last = Some(entry.clone());
        entry
    }

    /// Executions recorded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The most recent entry, if any execution happened.
    pub fn last(&self) -> Option<&QueryLogEntry> {
        self.last.as_ref()
    }
}
