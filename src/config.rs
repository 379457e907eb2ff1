//! Configuration handling for dbtrans.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::models::{DriverKind, QueryParam};
use clap::Parser;
use thiserror::Error;

pub const DEFAULT_DRIVER: &str = "sqlite3";
pub const DEFAULT_DSN: &str = ":memory:";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Prefix marking a base64-encoded binary parameter, e.g. `b64:aGk=`.
pub const BYTES_PARAM_PREFIX: &str = "b64:";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Errors found while validating configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unsupported driver '{driver}'. Supported: {supported}")]
    UnsupportedDriver { driver: String, supported: String },

    #[error("Invalid parameter '{value}': {reason}")]
    InvalidParam { value: String, reason: String },

    #[error("Invalid log level '{0}'. Use trace, debug, info, warn, error or off")]
    InvalidLogLevel(String),
}

/// Configuration for the dbtrans CLI.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dbtrans",
    about = "Run SQL statements, each in its own transaction, and print the results as JSON",
    version,
    author
)]
pub struct Config {
    /// Driver identifier (sqlite3, sqlite, postgres, postgresql, pgx, pq, mysql, mariadb)
    #[arg(short = 'D', long, default_value = DEFAULT_DRIVER, env = "DBTRANS_DRIVER")]
    pub driver: String,

    /// Driver-specific connection string.
    /// SQLite accepts a file path, :memory: or a sqlite: URL.
    #[arg(short = 'd', long, default_value = DEFAULT_DSN, env = "DBTRANS_DSN")]
    pub dsn: String,

    /// Maximum open (and idle) connections; 0 selects the driver default
    #[arg(long, default_value_t = 0, env = "DBTRANS_MAX_POOL_SIZE")]
    pub max_pool_size: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "DBTRANS_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DBTRANS_JSON_LOGS")]
    pub json_logs: bool,

    /// Statement parameter, bound in order. Can be specified multiple times.
    /// The same list is bound to every statement, so give several statements
    /// only when they take the same placeholders.
    /// Syntax: null, true, false, 42, 1.5, 'text', "text", b64:<base64> or bare text.
    #[arg(short = 'p', long = "param", value_name = "VALUE")]
    pub params: Vec<String>,

    /// SQL statements to run, in order
    #[arg(value_name = "SQL", required = true)]
    pub statements: Vec<String>,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            dsn: DEFAULT_DSN.to_string(),
            max_pool_size: 0,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
            params: Vec::new(),
            statements: Vec::new(),
        }
    }

    /// Check the driver identifier and log level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if DriverKind::from_driver_id(&self.driver).is_none() {
            return Err(ConfigError::UnsupportedDriver {
                driver: self.driver.clone(),
                supported: DriverKind::supported_driver_ids().join(", "),
            });
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }

        Ok(())
    }

    /// Parse all `--param` values, in order.
    pub fn parse_params(&self) -> Result<Vec<QueryParam>, ConfigError> {
        self.params.iter().map(|s| parse_param(s)).collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Parse one typed parameter value.
///
/// # Format
///
/// ```text
/// null              -> NULL
/// true / false      -> boolean (case-insensitive)
/// 42, -7            -> integer
/// 1.5, 2e10         -> float
/// 'text', "text"    -> text, quotes removed
/// b64:aGk=          -> binary
/// anything else     -> text, as written
/// ```
pub fn parse_param(s: &str) -> Result<QueryParam, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidParam {
        value: s.to_string(),
        reason: reason.to_string(),
    };

    if s.eq_ignore_ascii_case("null") {
        return Ok(QueryParam::Null);
    }
    if s.eq_ignore_ascii_case("true") {
        return Ok(QueryParam::Bool(true));
    }
    if s.eq_ignore_ascii_case("false") {
        return Ok(QueryParam::Bool(false));
    }

    if let Some(quote) = s.chars().next().filter(|c| *c == '\'' || *c == '"') {
        return match s[1..].strip_suffix(quote) {
            Some(inner) => Ok(QueryParam::Text(inner.to_string())),
            None => Err(invalid("unterminated quote")),
        };
    }

    if let Some(encoded) = s.strip_prefix(BYTES_PARAM_PREFIX) {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        return STANDARD
            .decode(encoded)
            .map(QueryParam::Bytes)
            .map_err(|e| invalid(&format!("invalid base64: {e}")));
    }

    if let Ok(v) = s.parse::<i64>() {
        return Ok(QueryParam::Int(v));
    }

    // "inf" and "nan" parse as floats but are meant as text here
    if s.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(v) = s.parse::<f64>() {
            return Ok(QueryParam::Float(v));
        }
    }

    Ok(QueryParam::Text(s.to_string()))
}
