//! dbtrans library
//!
//! A small transactional facade over SQL databases (SQLite, PostgreSQL,
//! MySQL). Connections are registered once per driver identifier, every
//! statement runs in its own transaction, and read results come back as
//! columns of text cells.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::Config;
pub use db::{ConnectionRef, ConnectionRegistry, StatementRunner, TransactionalExecutor};
pub use error::{DbError, DbResult};
pub use models::{CellValue, QueryParam, ResultColumn};
