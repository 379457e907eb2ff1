//! Lexical statement classification.
//!
//! Routing between `query_fetch` and `exec` is decided from the first
//! whitespace-delimited token of the statement only. Nothing after that
//! token is inspected.

use crate::error::{DbError, DbResult};

/// Leading keywords that mark a read statement (compared case-insensitively).
const READ_KEYWORDS: &[&str] = &["select", "sel"];

/// Kind of SQL statement detected by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Starts with a read keyword; belongs to `query_fetch`.
    Read,
    /// Anything else; belongs to `exec`.
    Write,
    /// Empty or whitespace-only statement.
    Unknown,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a statement by its leading keyword.
///
/// ```
/// use dbtrans::db::statement::{StatementKind, classify};
///
/// assert_eq!(classify("  SELECT a FROM t"), StatementKind::Read);
/// assert_eq!(classify("sel * from t"), StatementKind::Read);
/// assert_eq!(classify("INSERT INTO t VALUES (1)"), StatementKind::Write);
/// assert_eq!(classify("   "), StatementKind::Unknown);
/// ```
pub fn classify(sql: &str) -> StatementKind {
    match sql.split_whitespace().next() {
        None => StatementKind::Unknown,
        Some(token) if READ_KEYWORDS.iter().any(|k| token.eq_ignore_ascii_case(k)) => {
            StatementKind::Read
        }
        Some(_) => StatementKind::Write,
    }
}

/// Require `expected` for the entry point named by `operation`.
pub(crate) fn expect_kind(
    sql: &str,
    expected: StatementKind,
    operation: &str,
) -> DbResult<StatementKind> {
    let kind = classify(sql);
    if kind == expected {
        return Ok(kind);
    }

    let reason = match kind {
        StatementKind::Read => "SELECT statements must go through query_fetch",
        StatementKind::Write => "only SELECT statements may go through query_fetch; use exec",
        StatementKind::Unknown => "empty statement",
    };
    Err(DbError::invalid_operation(operation, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_keywords_any_case() {
        for sql in ["SELECT 1", "select 1", "Select 1", "SEL 1", "sel 1", "sElEcT 1"] {
            assert_eq!(classify(sql), StatementKind::Read, "{sql}");
        }
    }

    #[test]
    fn test_leading_whitespace_and_newlines() {
        assert_eq!(classify("\n\t  select\n a from t"), StatementKind::Read);
        assert_eq!(classify("\n update t set a = 1"), StatementKind::Write);
    }

    #[test]
    fn test_everything_else_is_write() {
        for sql in [
            "INSERT INTO t VALUES (1)",
            "CREATE TABLE t(a INT)",
            "delete from t",
            "WITH x AS (SELECT 1) SELECT * FROM x",
            "selection",
            "(SELECT 1)",
        ] {
            assert_eq!(classify(sql), StatementKind::Write, "{sql}");
        }
    }

    #[test]
    fn test_empty_is_unknown() {
        assert_eq!(classify(""), StatementKind::Unknown);
        assert_eq!(classify(" \n\t "), StatementKind::Unknown);
    }

    #[test]
    fn test_expect_kind_mismatch_is_invalid_operation() {
        let err = expect_kind("SELECT 1", StatementKind::Write, "exec").unwrap_err();
        assert!(matches!(err, DbError::InvalidOperation { .. }));

        let err = expect_kind("DELETE FROM t", StatementKind::Read, "query_fetch").unwrap_err();
        assert!(matches!(err, DbError::InvalidOperation { .. }));

        let err = expect_kind("", StatementKind::Write, "exec").unwrap_err();
        assert!(err.to_string().contains("empty statement"));
    }

    #[test]
    fn test_expect_kind_match() {
        assert_eq!(
            expect_kind("select 1", StatementKind::Read, "query_fetch").unwrap(),
            StatementKind::Read
        );
    }
}
