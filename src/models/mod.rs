//! Data models for dbtrans.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{DriverKind, mask_connection_string};
pub use query::{CellValue, QueryParam, ResultColumn, row_count};
