//! Connection-related data models.
//!
//! This module defines the driver identifier mapping used by the registry.

use serde::{Deserialize, Serialize};

/// Backend family behind a driver identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DriverKind {
    /// Resolve a driver identifier such as `"sqlite3"` or `"postgres"`.
    pub fn from_driver_id(driver_id: &str) -> Option<Self> {
        match driver_id.trim().to_ascii_lowercase().as_str() {
            "sqlite3" | "sqlite" => Some(Self::SQLite),
            "postgres" | "postgresql" | "pgx" | "pq" => Some(Self::PostgreSQL),
            "mysql" | "mariadb" => Some(Self::MySQL),
            _ => None,
        }
    }

    /// Driver identifiers accepted by [`DriverKind::from_driver_id`].
    pub fn supported_driver_ids() -> &'static [&'static str] {
        &[
            "sqlite3",
            "sqlite",
            "postgres",
            "postgresql",
            "pgx",
            "pq",
            "mysql",
            "mariadb",
        ]
    }

    /// Get the display name for this driver kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Get a display-safe version of a connection string (password masked).
pub fn mask_connection_string(connection_string: &str) -> String {
    if let Some(at_pos) = connection_string.find('@') {
        // Only a scheme ahead of the '@' counts; "://" may also appear in query params
        let scheme_end = connection_string[..at_pos]
            .find("://")
            .map(|p| p + 3)
            .unwrap_or(0);
        if let Some(colon_pos) = connection_string[scheme_end..at_pos].rfind(':') {
            let colon_pos = scheme_end + colon_pos;
            let prefix = &connection_string[..colon_pos + 1];
            let suffix = &connection_string[at_pos..];
            return format!("{}****{}", prefix, suffix);
        }
    }
    connection_string.to_string()
}
