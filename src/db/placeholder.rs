//! Placeholder scanning and expansion.
//!
//! Statements use exactly one placeholder style: anonymous (`?`) or named
//! (`:label`). Before binding, the expander rewrites the statement to
//! anonymous form and flattens the parameter set into a value list whose
//! order matches the rewritten text. Sequence-valued parameters expand a
//! single `?` into a comma-separated group; values are only ever bound,
//! never spliced into the text.
//!
//! The scanner understands enough SQL lexing to leave markers inside
//! string literals, quoted identifiers and comments alone.

use crate::error::{DbError, DbResult};
use crate::models::{Param, Params, SqlValue};

/// A placeholder found in statement text, with its byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Anonymous { start: usize },
    Named { start: usize, end: usize },
}

impl Marker {
    fn start(&self) -> usize {
        match self {
            Self::Anonymous { start } => *start,
            Self::Named { start, .. } => *start,
        }
    }

    fn end(&self) -> usize {
        match self {
            Self::Anonymous { start } => start + 1,
            Self::Named { end, .. } => *end,
        }
    }
}

/// Scan statement text for placeholder markers.
///
/// Skips `'…'` and `"…"` literals, backtick identifiers, `--` line
/// comments and `/* … */` block comments. A `::` pair (cast syntax) is not
/// a named placeholder.
pub fn scan(sql: &str) -> Vec<Marker> {
    let bytes = sql.as_bytes();
    let mut markers = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                let delim = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != delim {
                    i += 1;
                }
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            b'?' => {
                markers.push(Marker::Anonymous { start: i });
                i += 1;
            }
            b':' => {
                if bytes.get(i + 1) == Some(&b':') {
                    // cast syntax
                    i += 2;
                    continue;
                }
                let start = i;
                let mut end = i + 1;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                if end > i + 1 {
                    markers.push(Marker::Named { start, end });
                    i = end;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    markers
}

/// A statement rewritten for driver binding: anonymous placeholders only,
/// values flattened in matching order.
#[derive(Debug, Clone, PartialEq)]
pub struct Expanded {
    pub text: String,
    pub values: Vec<SqlValue>,
}

/// Rewrite a statement and its parameter set for binding.
///
/// Count mismatches, mixed placeholder styles and sequences bound to named
/// placeholders are all [`DbError::Binding`]; nothing is truncated or
/// padded.
pub fn expand(sql: &str, params: &Params) -> DbResult<Expanded> {
    let markers = scan(sql);

    let has_named = markers.iter().any(|m| matches!(m, Marker::Named { .. }));
    let has_anonymous = markers.iter().any(|m| matches!(m, Marker::Anonymous { .. }));
    if has_named && has_anonymous {
        return Err(DbError::binding(
            "statement mixes anonymous and named placeholders",
        ));
    }

    match params {
        Params::None => {
            if markers.is_empty() {
                Ok(Expanded {
                    text: sql.to_string(),
                    values: Vec::new(),
                })
            } else {
                Err(DbError::binding(format!(
                    "{} placeholders but no parameters bound",
                    markers.len()
                )))
            }
        }
        Params::Positional(positional) => {
            if has_named {
                return Err(DbError::binding(
                    "positional parameters bound to a named-placeholder statement",
                ));
            }
            if markers.len() != positional.len() {
                return Err(DbError::binding(format!(
                    "{} placeholders but {} parameters bound",
                    markers.len(),
                    positional.len()
                )));
            }
            try_rewrite(sql, &markers, |i, _| Ok(&positional[i]))
        }
        Params::Named(named) => {
            if has_anonymous {
                return Err(DbError::binding(
                    "named parameters bound to an anonymous-placeholder statement",
                ));
            }
            let mut used = vec![false; named.len()];
            let expanded = try_rewrite(sql, &markers, |_, marker| {
                let (start, end) = match marker {
                    Marker::Named { start, end } => (*start, *end),
                    Marker::Anonymous { .. } => unreachable!("checked above"),
                };
                let label = &sql[start + 1..end];
                let position = named
                    .iter()
                    .position(|(name, _)| name == label)
                    .ok_or_else(|| {
                        DbError::binding(format!("no parameter bound for placeholder :{label}"))
                    })?;
                used[position] = true;
                match &named[position].1 {
                    Param::Value(_) => Ok(&named[position].1),
                    Param::List(_) => Err(DbError::binding(format!(
                        "sequence bound to named placeholder :{label}; expansion requires an anonymous placeholder"
                    ))),
                }
            })?;
            if let Some(unused) = used.iter().position(|u| !u) {
                return Err(DbError::binding(format!(
                    "parameter :{} is bound but never referenced",
                    named[unused].0
                )));
            }
            Ok(expanded)
        }
    }
}

/// Rebuild statement text around markers.
fn try_rewrite<'p>(
    sql: &str,
    markers: &[Marker],
    mut param_for: impl FnMut(usize, &Marker) -> DbResult<&'p Param>,
) -> DbResult<Expanded> {
    let mut text = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut cursor = 0;

    for (i, marker) in markers.iter().enumerate() {
        text.push_str(&sql[cursor..marker.start()]);
        match param_for(i, marker)? {
            Param::Value(value) => {
                text.push('?');
                values.push(value.clone());
            }
            Param::List(list) if list.is_empty() => {
                // Minimum one placeholder: an empty sequence binds NULL, so
                // `IN (?)` matches nothing instead of becoming `IN ()`.
                text.push('?');
                values.push(SqlValue::Null);
            }
            Param::List(list) => {
                for (j, value) in list.iter().enumerate() {
                    if j > 0 {
                        text.push_str(", ");
                    }
                    text.push('?');
                    values.push(value.clone());
                }
            }
        }
        cursor = marker.end();
    }
    text.push_str(&sql[cursor..]);

    Ok(Expanded { text, values })
}

/// Substitute rendered literals for anonymous placeholders, for debugging
/// output only. Lenient: surplus placeholders are left as-is.
pub fn substitute(text: &str, values: &[SqlValue]) -> String {
    let markers = scan(text);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut next_value = 0;

    for marker in &markers {
        if !matches!(marker, Marker::Anonymous { .. }) || next_value >= values.len() {
            continue;
        }
        out.push_str(&text[cursor..marker.start()]);
        out.push_str(&values[next_value].literal());
        next_value += 1;
        cursor = marker.end();
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_anonymous() {
        let markers = scan("SELECT * FROM t WHERE a = ? AND b = ?");
        assert_eq!(markers.len(), 2);
        assert!(markers.iter().all(|m| matches!(m, Marker::Anonymous { .. })));
    }

    #[test]
    fn test_scan_named() {
        let sql = "SELECT * FROM t WHERE a = :alpha AND b = :beta_2";
        let labels: Vec<&str> = scan(sql)
            .iter()
            .map(|m| match m {
                Marker::Named { start, end } => &sql[start + 1..*end],
                Marker::Anonymous { .. } => panic!("unexpected anonymous marker"),
            })
            .collect();
        assert_eq!(labels, vec!["alpha", "beta_2"]);
    }

    #[test]
    fn test_scan_skips_literals_and_comments() {
        let sql = "SELECT '?' , \"que?tion\", `col?` -- trailing ?\n/* block ? :x */ FROM t WHERE a = ?";
        let markers = scan(sql);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].start(), sql.len() - 1);
    }

    #[test]
    fn test_scan_ignores_cast_syntax() {
        let markers = scan("SELECT a::text FROM t WHERE b = :b");
        assert_eq!(markers.len(), 1);
        assert!(matches!(markers[0], Marker::Named { .. }));
    }

    #[test]
    fn test_expand_plain_values() {
        let expanded = expand(
            "INSERT INTO users (a, b) VALUES (?, ?)",
            &Params::values(["x", "y"]),
        )
        .unwrap();
        assert_eq!(expanded.text, "INSERT INTO users (a, b) VALUES (?, ?)");
        assert_eq!(expanded.values.len(), 2);
    }

    #[test]
    fn test_expand_sequence() {
        let expanded = expand(
            "SELECT * FROM t WHERE id IN (?) AND kind = ?",
            &Params::positional([Param::list([2, 3, 5, 7, 11]), Param::from("post")]),
        )
        .unwrap();
        assert_eq!(
            expanded.text,
            "SELECT * FROM t WHERE id IN (?, ?, ?, ?, ?) AND kind = ?"
        );
        assert_eq!(expanded.values.len(), 6);
        assert_eq!(expanded.values[4], SqlValue::Int(11));
        assert_eq!(expanded.values[5], SqlValue::from("post"));
    }

    /// k placeholders with one length-n sequence yields k-1+n of each.
    #[test]
    fn test_expansion_count_arithmetic() {
        let k = 3;
        let n = 4;
        let expanded = expand(
            "SELECT 1 WHERE a = ? AND b IN (?) AND c = ?",
            &Params::positional([
                Param::from(1),
                Param::list((0..n as i64).collect::<Vec<_>>()),
                Param::from(2),
            ]),
        )
        .unwrap();
        assert_eq!(scan(&expanded.text).len(), k - 1 + n);
        assert_eq!(expanded.values.len(), k - 1 + n);
    }

    #[test]
    fn test_expand_empty_sequence_binds_null() {
        let expanded = expand(
            "SELECT * FROM t WHERE id IN (?)",
            &Params::positional([Param::list(Vec::<i64>::new())]),
        )
        .unwrap();
        assert_eq!(expanded.text, "SELECT * FROM t WHERE id IN (?)");
        assert_eq!(expanded.values, vec![SqlValue::Null]);
    }

    #[test]
    fn test_expand_count_mismatch() {
        let err = expand("SELECT ? , ?", &Params::values([1])).unwrap_err();
        assert!(matches!(err, DbError::Binding { .. }));
        let err = expand("SELECT ?", &Params::values([1, 2])).unwrap_err();
        assert!(matches!(err, DbError::Binding { .. }));
    }

    #[test]
    fn test_expand_named() {
        let expanded = expand(
            "SELECT * FROM t WHERE a = :a AND b = :b AND a2 = :a",
            &Params::named([("a", Param::from(1)), ("b", Param::from(2))]),
        )
        .unwrap();
        assert_eq!(expanded.text, "SELECT * FROM t WHERE a = ? AND b = ? AND a2 = ?");
        assert_eq!(
            expanded.values,
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(1)]
        );
    }

    #[test]
    fn test_expand_named_rejects_sequences() {
        let err = expand(
            "SELECT * FROM t WHERE id IN (:ids)",
            &Params::named([("ids", Param::list([1, 2]))]),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Binding { .. }));
    }

    #[test]
    fn test_expand_named_missing_and_unused() {
        let err = expand(
            "SELECT :a",
            &Params::named([("b", Param::from(1))]),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Binding { .. }));

        let err = expand(
            "SELECT :a",
            &Params::named([("a", Param::from(1)), ("b", Param::from(2))]),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Binding { .. }));
    }

    #[test]
    fn test_expand_rejects_mixed_styles() {
        let err = expand("SELECT ? , :a", &Params::values([1])).unwrap_err();
        assert!(matches!(err, DbError::Binding { .. }));
    }

    #[test]
    fn test_expand_rejects_wrong_style_params() {
        let err = expand("SELECT :a", &Params::values([1])).unwrap_err();
        assert!(matches!(err, DbError::Binding { .. }));
        let err = expand("SELECT ?", &Params::named([("a", Param::from(1))])).unwrap_err();
        assert!(matches!(err, DbError::Binding { .. }));
    }

    #[test]
    fn test_expand_no_params_no_placeholders() {
        let expanded = expand("SELECT 1", &Params::None).unwrap();
        assert_eq!(expanded.text, "SELECT 1");
        assert!(expanded.values.is_empty());
    }

    #[test]
    fn test_substitute_renders_literals() {
        let rendered = substitute(
            "SELECT * FROM t WHERE a = ? AND b = ?",
            &[SqlValue::Int(5), SqlValue::from("O'Brien")],
        );
        assert_eq!(rendered, "SELECT * FROM t WHERE a = 5 AND b = 'O''Brien'");
    }

    #[test]
    fn test_substitute_leaves_quoted_markers() {
        let rendered = substitute("SELECT '?' WHERE a = ?", &[SqlValue::Int(1)]);
        assert_eq!(rendered, "SELECT '?' WHERE a = 1");
    }
}
