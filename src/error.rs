//! Error types for dbtrans.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each variant names the stage of the transactional protocol that failed, so callers
//! can tell a bad statement apart from a connection or commit problem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Driver '{driver_id}' is not registered")]
    NotRegistered { driver_id: String },

    #[error("Invalid operation: {operation} - {reason}")]
    InvalidOperation { operation: String, reason: String },

    #[error("Failed to begin transaction: {message}")]
    Begin { message: String },

    #[error("Execution failed: {message}")]
    Execution {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Failed to read result metadata: {message}")]
    Metadata { message: String },

    #[error("Failed to scan column '{column}': {message}")]
    Scan { column: String, message: String },

    #[error("Failed while iterating rows: {message}")]
    Iteration { message: String },

    #[error("Failed to read affected row count: {message}")]
    RowCount { message: String },

    #[error("Failed to commit transaction: {message}")]
    Commit { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn not_registered(driver_id: impl Into<String>) -> Self {
        Self::NotRegistered {
            driver_id: driver_id.into(),
        }
    }

    pub fn invalid_operation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn begin(err: &sqlx::Error) -> Self {
        Self::Begin {
            message: err.to_string(),
        }
    }

    /// Create an execution error, keeping the SQLSTATE code when the driver reports one.
    pub fn execution(err: &sqlx::Error) -> Self {
        let sql_state = match err {
            sqlx::Error::Database(db_err) => db_err.code().map(|c| c.to_string()),
            _ => None,
        };
        let message = match err {
            sqlx::Error::Database(db_err) => db_err.message().to_string(),
            other => other.to_string(),
        };
        Self::Execution {
            message,
            sql_state,
            suggestion: "Check the SQL syntax and referenced objects".to_string(),
        }
    }

    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata {
            message: message.into(),
        }
    }

    pub fn scan(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scan {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn iteration(err: impl std::fmt::Display) -> Self {
        Self::Iteration {
            message: err.to_string(),
        }
    }

    pub fn row_count(message: impl Into<String>) -> Self {
        Self::RowCount {
            message: message.into(),
        }
    }

    pub fn commit(err: &sqlx::Error) -> Self {
        Self::Commit {
            message: err.to_string(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Execution { suggestion, .. } => Some(suggestion),
            Self::NotRegistered { .. } => Some("Call open() for this driver first"),
            _ => None,
        }
    }

    /// SQLSTATE reported by the driver for a failed statement.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Execution { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
