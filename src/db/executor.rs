//! Transactional statement execution.
//!
//! Every call runs in its own transaction:
//! - the statement is classified before anything touches the database
//! - a transaction is begun on the registered pool
//! - the statement runs with its bound parameters (or raw, without any)
//! - the transaction is committed on success and rolled back on any failure
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific fetch and execute operations
//! - `postgres`: PostgreSQL-specific fetch and execute operations
//! - `sqlite`: SQLite-specific fetch and execute operations
//!
//! Each submodule provides identical functionality adapted to the database's type system.

use crate::db::params::{bind_mysql_param, bind_postgres_param, bind_sqlite_param};
use crate::db::registry::ConnectionRegistry;
use crate::db::statement::{self, StatementKind};
use crate::db::types::RowToText;
use crate::error::{DbError, DbResult};
use crate::models::{CellValue, QueryParam, ResultColumn};
use futures_util::TryStreamExt;
use sqlx::{Database, Pool, Transaction};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// Runs statements against registered connections, one transaction per call.
#[derive(Debug, Clone)]
pub struct TransactionalExecutor {
    registry: ConnectionRegistry,
}

impl TransactionalExecutor {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Run a read statement and return its result as text columns.
    ///
    /// Only statements whose first token is `SELECT` (or `SEL`) are accepted.
    /// The result holds one [`ResultColumn`] per selected column, in select
    /// order, each with one cell per row in retrieval order. A read that
    /// matches no rows still reports its columns.
    pub async fn query_fetch(
        &self,
        driver_id: &str,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<Vec<ResultColumn>> {
        let span = info_span!(
            "query_fetch",
            call_id = %call_id(),
            driver_id = %driver_id,
            kind = %statement::classify(sql)
        );

        async move {
            statement::expect_kind(sql, StatementKind::Read, "query_fetch")
                .inspect_err(|e| warn!(error = %e, "Rejected statement"))?;
            let handle = self.registry.lookup(driver_id).await?;

            debug!(sql = %sql, params = params.len(), "Executing query");

            let columns = impl_db_dispatch!(handle.pool(), {
                MySql(pool) => {
                    let mut tx = begin(pool).await?;
                    let outcome = mysql::fetch_columns(&mut tx, sql, params).await;
                    finalize(tx, outcome).await
                },
                Postgres(pool) => {
                    let mut tx = begin(pool).await?;
                    let outcome = postgres::fetch_columns(&mut tx, sql, params).await;
                    finalize(tx, outcome).await
                },
                SQLite(pool) => {
                    let mut tx = begin(pool).await?;
                    let outcome = sqlite::fetch_columns(&mut tx, sql, params).await;
                    finalize(tx, outcome).await
                },
            })?;

            info!(
                columns = columns.len(),
                rows = crate::models::row_count(&columns),
                "Query committed"
            );
            Ok(columns)
        }
        .instrument(span)
        .await
    }

    /// Run a write statement and return the affected row count.
    ///
    /// Statements whose first token is `SELECT` (or `SEL`) are rejected.
    pub async fn exec(&self, driver_id: &str, sql: &str, params: &[QueryParam]) -> DbResult<i64> {
        let span = info_span!(
            "exec",
            call_id = %call_id(),
            driver_id = %driver_id,
            kind = %statement::classify(sql)
        );

        async move {
            statement::expect_kind(sql, StatementKind::Write, "exec")
                .inspect_err(|e| warn!(error = %e, "Rejected statement"))?;
            let handle = self.registry.lookup(driver_id).await?;

            debug!(sql = %sql, params = params.len(), "Executing write operation");

            let rows_affected = impl_db_dispatch!(handle.pool(), {
                MySql(pool) => {
                    let mut tx = begin(pool).await?;
                    let outcome = mysql::execute(&mut tx, sql, params).await.and_then(to_row_count);
                    finalize(tx, outcome).await
                },
                Postgres(pool) => {
                    let mut tx = begin(pool).await?;
                    let outcome = postgres::execute(&mut tx, sql, params).await.and_then(to_row_count);
                    finalize(tx, outcome).await
                },
                SQLite(pool) => {
                    let mut tx = begin(pool).await?;
                    let outcome = sqlite::execute(&mut tx, sql, params).await.and_then(to_row_count);
                    finalize(tx, outcome).await
                },
            })?;

            info!(rows_affected = rows_affected, "Write committed");
            Ok(rows_affected)
        }
        .instrument(span)
        .await
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn call_id() -> String {
    format!("tx_{}", Uuid::new_v4().simple())
}

async fn begin<DB: Database>(pool: &Pool<DB>) -> DbResult<Transaction<'static, DB>> {
    pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to begin transaction");
        DbError::begin(&e)
    })
}

/// Commit on success, roll back on failure.
///
/// A rollback failure is logged and the statement error is returned.
async fn finalize<DB: Database, T>(
    tx: Transaction<'static, DB>,
    outcome: DbResult<T>,
) -> DbResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(|e| {
                error!(error = %e, "Failed to commit transaction");
                DbError::commit(&e)
            })?;
            Ok(value)
        }
        Err(err) => {
            error!(error = %err, "Statement failed, rolling back");
            match tx.rollback().await {
                Ok(()) => debug!("Transaction rolled back"),
                Err(e) => error!(error = %e, "Rollback failed"),
            }
            Err(err)
        }
    }
}

fn to_row_count(rows_affected: u64) -> DbResult<i64> {
    i64::try_from(rows_affected).map_err(|_| {
        DbError::row_count(format!(
            "affected row count {} does not fit in i64",
            rows_affected
        ))
    })
}

/// Accumulates text rows into columns.
struct ColumnBuilder {
    columns: Vec<ResultColumn>,
}

impl ColumnBuilder {
    fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    fn start<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = names.into_iter().map(ResultColumn::new).collect();
    }

    fn push_row<R: RowToText>(&mut self, row: &R) -> DbResult<()> {
        self.push(&row.column_names(), row.to_text_cells()?)
    }

    /// Append one row. Its columns must match the first row's exactly; a
    /// multi-statement batch can otherwise mix result sets of other shapes.
    fn push(&mut self, names: &[String], cells: Vec<CellValue>) -> DbResult<()> {
        let same_shape = names.len() == self.columns.len()
            && cells.len() == self.columns.len()
            && self.columns.iter().zip(names).all(|(c, n)| c.name == *n);
        if !same_shape {
            let expected: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
            return Err(DbError::iteration(format!(
                "row columns [{}] do not match result columns [{}]",
                names.join(", "),
                expected.join(", ")
            )));
        }

        for (column, cell) in self.columns.iter_mut().zip(cells) {
            column.values.push(cell);
        }
        Ok(())
    }

    fn finish(self) -> Vec<ResultColumn> {
        self.columns
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{Column, Executor, MySql, Statement};

    pub async fn fetch_columns(
        tx: &mut Transaction<'static, MySql>,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<Vec<ResultColumn>> {
        let mut builder = ColumnBuilder::new();
        let mut seen_row = false;
        {
            // Without params, run raw SQL to avoid prepared statement issues
            let mut rows = if params.is_empty() {
                (&mut **tx).fetch(sql)
            } else {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql_param(query, param);
                }
                query.fetch(&mut **tx)
            };

            while let Some(row) = next_row::<MySqlRow>(rows.try_next().await, seen_row)? {
                if !seen_row {
                    builder.start(row.column_names());
                    seen_row = true;
                }
                builder.push_row(&row)?;
            }
        }

        if !seen_row {
            let statement = (&mut **tx)
                .prepare(sql)
                .await
                .map_err(|e| DbError::metadata(e.to_string()))?;
            builder.start(statement.columns().iter().map(|c| c.name()));
        }

        Ok(builder.finish())
    }

    pub async fn execute(
        tx: &mut Transaction<'static, MySql>,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<u64> {
        // Some SQL (CREATE PROCEDURE, multi-statement batches) can't be prepared
        let result = if params.is_empty() {
            (&mut **tx).execute(sql).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_mysql_param(query, param);
            }
            query.execute(&mut **tx).await
        };

        result
            .map(|r| r.rows_affected())
            .map_err(|e| DbError::execution(&e))
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::PgRow;
    use sqlx::{Column, Executor, Postgres, Statement};

    pub async fn fetch_columns(
        tx: &mut Transaction<'static, Postgres>,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<Vec<ResultColumn>> {
        let mut builder = ColumnBuilder::new();
        let mut seen_row = false;
        {
            let mut rows = if params.is_empty() {
                (&mut **tx).fetch(sql)
            } else {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_postgres_param(query, param);
                }
                query.fetch(&mut **tx)
            };

            while let Some(row) = next_row::<PgRow>(rows.try_next().await, seen_row)? {
                if !seen_row {
                    builder.start(row.column_names());
                    seen_row = true;
                }
                builder.push_row(&row)?;
            }
        }

        if !seen_row {
            let statement = (&mut **tx)
                .prepare(sql)
                .await
                .map_err(|e| DbError::metadata(e.to_string()))?;
            builder.start(statement.columns().iter().map(|c| c.name()));
        }

        Ok(builder.finish())
    }

    pub async fn execute(
        tx: &mut Transaction<'static, Postgres>,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<u64> {
        let result = if params.is_empty() {
            (&mut **tx).execute(sql).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_postgres_param(query, param);
            }
            query.execute(&mut **tx).await
        };

        result
            .map(|r| r.rows_affected())
            .map_err(|e| DbError::execution(&e))
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Column, Executor, Sqlite, Statement};

    pub async fn fetch_columns(
        tx: &mut Transaction<'static, Sqlite>,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<Vec<ResultColumn>> {
        let mut builder = ColumnBuilder::new();
        let mut seen_row = false;
        {
            let mut rows = if params.is_empty() {
                (&mut **tx).fetch(sql)
            } else {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_sqlite_param(query, param);
                }
                query.fetch(&mut **tx)
            };

            while let Some(row) = next_row::<SqliteRow>(rows.try_next().await, seen_row)? {
                if !seen_row {
                    builder.start(row.column_names());
                    seen_row = true;
                }
                builder.push_row(&row)?;
            }
        }

        if !seen_row {
            let statement = (&mut **tx)
                .prepare(sql)
                .await
                .map_err(|e| DbError::metadata(e.to_string()))?;
            builder.start(statement.columns().iter().map(|c| c.name()));
        }

        Ok(builder.finish())
    }

    pub async fn execute(
        tx: &mut Transaction<'static, Sqlite>,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<u64> {
        let result = if params.is_empty() {
            (&mut **tx).execute(sql).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_sqlite_param(query, param);
            }
            query.execute(&mut **tx).await
        };

        result
            .map(|r| r.rows_affected())
            .map_err(|e| DbError::execution(&e))
    }
}

/// Map one row-stream step to a row, classifying stream failures.
///
/// A failure before the first row means the statement itself failed; after
/// that it is a failure while iterating.
fn next_row<R>(step: Result<Option<R>, sqlx::Error>, seen_row: bool) -> DbResult<Option<R>> {
    step.map_err(|e| {
        if seen_row {
            DbError::iteration(&e)
        } else {
            DbError::execution(&e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_row_count() {
        assert_eq!(to_row_count(0).unwrap(), 0);
        assert_eq!(to_row_count(42).unwrap(), 42);
        assert_eq!(to_row_count(i64::MAX as u64).unwrap(), i64::MAX);
        let err = to_row_count(u64::MAX).unwrap_err();
        assert!(matches!(err, DbError::RowCount { .. }));
    }

    #[test]
    fn test_call_id_format() {
        let id = call_id();
        assert!(id.starts_with("tx_"));
        assert_eq!(id.len(), 3 + 32);
        assert_ne!(id, call_id());
    }

    #[test]
    fn test_next_row_error_classification() {
        let before = next_row::<()>(Err(sqlx::Error::RowNotFound), false).unwrap_err();
        assert!(matches!(before, DbError::Execution { .. }));

        let after = next_row::<()>(Err(sqlx::Error::RowNotFound), true).unwrap_err();
        assert!(matches!(after, DbError::Iteration { .. }));

        assert_eq!(next_row(Ok(Some(1)), true).unwrap(), Some(1));
        assert_eq!(next_row::<i32>(Ok(None), false).unwrap(), None);
    }

    #[test]
    fn test_column_builder_names_without_rows() {
        let mut builder = ColumnBuilder::new();
        builder.start(["a", "b"]);
        let columns = builder.finish();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].name, "b");
        assert!(columns.iter().all(|c| c.values == Vec::<CellValue>::new()));
    }

    #[test]
    fn test_column_builder_rejects_rows_of_another_shape() {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let mut builder = ColumnBuilder::new();
        builder.start(["a", "b"]);
        builder
            .push(&names(&["a", "b"]), vec!["1".into(), "2".into()])
            .unwrap();

        let err = builder
            .push(&names(&["c"]), vec!["3".into()])
            .unwrap_err();
        assert!(matches!(err, DbError::Iteration { .. }));

        // Same width, different names
        let err = builder
            .push(&names(&["x", "y"]), vec!["3".into(), "4".into()])
            .unwrap_err();
        assert!(matches!(err, DbError::Iteration { .. }));

        let columns = builder.finish();
        assert!(columns.iter().all(|c| c.len() == 1));
    }

    #[tokio::test]
    async fn test_query_fetch_rejects_write_before_lookup() {
        // No driver registered: classification must fail first
        let executor = TransactionalExecutor::new(ConnectionRegistry::new());
        let err = executor
            .query_fetch("sqlite3", "DELETE FROM t", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidOperation { .. }));
    }

    #[tokio::test]
    async fn test_exec_not_registered() {
        let executor = TransactionalExecutor::new(ConnectionRegistry::new());
        let err = executor
            .exec("sqlite3", "DELETE FROM t", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotRegistered { .. }));
    }
}
