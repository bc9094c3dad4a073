//! Execution outcomes and statement classification.
//!
//! Return semantics are dispatched on the statement's leading keyword. The
//! classifier is a documented heuristic: the first token after leading
//! whitespace and comments, compared case-insensitively. It does not parse
//! SQL and is not a validator.

use crate::models::Row;

/// Kind of SQL statement, detected from the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// SELECT and other row-returning forms (SHOW, DESCRIBE, EXPLAIN,
    /// PRAGMA, VALUES, WITH)
    Read,
    /// INSERT
    Insert,
    /// UPDATE, DELETE, REPLACE
    Write,
    /// Everything else (DDL, transaction control, ...)
    Other,
}

impl StatementKind {
    /// Classify a statement by its first keyword, skipping leading
    /// whitespace, `--` line comments and `/* */` block comments.
    pub fn classify(sql: &str) -> Self {
        let token = leading_keyword(sql);
        match token.to_ascii_uppercase().as_str() {
            "SELECT" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "PRAGMA" | "VALUES"
            | "WITH" => Self::Read,
            "INSERT" => Self::Insert,
            "UPDATE" | "DELETE" | "REPLACE" => Self::Write,
            _ => Self::Other,
        }
    }

    /// Whether this kind returns rows.
    pub fn returns_rows(&self) -> bool {
        matches!(self, Self::Read)
    }
}

/// Extract the first keyword of a statement, skipping comments.
fn leading_keyword(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        rest = rest.trim_start();
        if let Some(stripped) = rest.strip_prefix("--") {
            rest = match stripped.find('\n') {
                Some(i) => &stripped[i + 1..],
                None => "",
            };
        } else if let Some(stripped) = rest.strip_prefix("/*") {
            rest = match stripped.find("*/") {
                Some(i) => &stripped[i + 2..],
                None => "",
            };
        } else {
            break;
        }
    }
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Result of one statement execution, tagged by return semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Row-returning statements. Empty for zero rows, never absent.
    Rows(Vec<Row>),
    /// INSERT: the generated key, or None when the driver reports none.
    LastInsertId(Option<i64>),
    /// UPDATE/DELETE/REPLACE and other non-returning statements.
    Affected(u64),
    /// Suppressed execution failure (silent-errors mode only).
    Failure(String),
}

impl QueryOutcome {
    /// Rows of a read outcome; empty for every other variant.
    pub fn rows(&self) -> &[Row] {
        match self {
            Self::Rows(rows) => rows,
            _ => &[],
        }
    }

    /// Generated key of an insert outcome.
    pub fn last_insert_id(&self) -> Option<i64> {
        match self {
            Self::LastInsertId(id) => *id,
            _ => None,
        }
    }

    /// Affected-row count of a write outcome.
    pub fn affected(&self) -> Option<u64> {
        match self {
            Self::Affected(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the execution failed under silent-errors mode.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_basic() {
        assert_eq!(StatementKind::classify("SELECT * FROM users"), StatementKind::Read);
        assert_eq!(StatementKind::classify("insert into t values (1)"), StatementKind::Insert);
        assert_eq!(StatementKind::classify("UPDATE t SET a = 1"), StatementKind::Write);
        assert_eq!(StatementKind::classify("DELETE FROM t"), StatementKind::Write);
        assert_eq!(StatementKind::classify("REPLACE INTO t VALUES (1)"), StatementKind::Write);
        assert_eq!(StatementKind::classify("CREATE TABLE t (id INTEGER)"), StatementKind::Other);
    }

    #[test]
    fn test_classify_skips_whitespace_and_comments() {
        assert_eq!(
            StatementKind::classify("  \n\t SELECT 1"),
            StatementKind::Read
        );
        assert_eq!(
            StatementKind::classify("-- leading comment\nSELECT 1"),
            StatementKind::Read
        );
        assert_eq!(
            StatementKind::classify("/* block */ INSERT INTO t VALUES (1)"),
            StatementKind::Insert
        );
        assert_eq!(
            StatementKind::classify("/* a */ -- b\n /* c */ update t set x = 1"),
            StatementKind::Write
        );
    }

    #[test]
    fn test_classify_read_forms() {
        for sql in ["SHOW TABLES", "PRAGMA table_info('t')", "WITH x AS (SELECT 1) SELECT * FROM x", "EXPLAIN SELECT 1"] {
            assert_eq!(StatementKind::classify(sql), StatementKind::Read, "{sql}");
        }
    }

    #[test]
    fn test_classify_unterminated_comment() {
        assert_eq!(StatementKind::classify("/* never closed"), StatementKind::Other);
        assert_eq!(StatementKind::classify("-- only a comment"), StatementKind::Other);
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = QueryOutcome::Affected(3);
        assert_eq!(outcome.affected(), Some(3));
        assert!(outcome.rows().is_empty());
        assert!(!outcome.is_failure());
        assert!(QueryOutcome::Failure("boom".into()).is_failure());
        assert_eq!(QueryOutcome::LastInsertId(Some(9)).last_insert_id(), Some(9));
    }
}
