//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection registry with one pool per driver identifier
//! - Transactional statement execution
//! - Statement classification
//! - Parameter binding and text decoding of result values
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod executor;
pub mod params;
pub mod registry;
pub mod statement;
pub mod types;

pub use executor::TransactionalExecutor;
pub use registry::{
    ConnectionHandle, ConnectionRef, ConnectionRegistry, DEFAULT_MAX_CONNECTIONS, DbPool,
    StatementRunner,
};
pub use statement::{StatementKind, classify};
