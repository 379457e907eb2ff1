//! Database dispatch macros for reducing code duplication.
//!
//! This module provides declarative macros that generate database-specific
//! match arms while keeping each backend branch readable. The macros expand
//! at compile time with zero runtime overhead.

/// Macro for generating database dispatch match arms.
///
/// Generates one match arm per `DbPool` variant, so every caller that needs
/// the concrete `sqlx` pool spells out all three backends in one place.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(handle.pool(), {
///     MySql(p) => mysql::run(p).await,
///     Postgres(p) => postgres::run(p).await,
///     SQLite(p) => sqlite::run(p).await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::registry::DbPool::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
