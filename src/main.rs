//! dbtrans - Main entry point.
//!
//! Opens one connection and runs each SQL statement given on the command
//! line in its own transaction. Results go to stdout as JSON, logs go to
//! stderr.

use clap::Parser;
use dbtrans::config::Config;
use dbtrans::db::{ConnectionRegistry, StatementKind, StatementRunner, classify};
use dbtrans::error::DbResult;
use dbtrans::models::{QueryParam, mask_connection_string};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Route one statement by its first token and render the outcome as JSON.
async fn run_statement(
    runner: &impl StatementRunner,
    sql: &str,
    params: &[QueryParam],
) -> DbResult<serde_json::Result<String>> {
    match classify(sql) {
        StatementKind::Read => {
            let columns = runner.query_fetch(sql, params).await?;
            Ok(serde_json::to_string(&columns))
        }
        StatementKind::Write | StatementKind::Unknown => {
            let rows_affected = runner.exec(sql, params).await?;
            Ok(serde_json::to_string(&json!({ "rows_affected": rows_affected })))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    config.validate()?;
    let params = config.parse_params()?;

    info!(
        driver = %config.driver,
        dsn = %mask_connection_string(&config.dsn),
        statements = config.statements.len(),
        "Starting dbtrans v{}",
        env!("CARGO_PKG_VERSION")
    );

    let registry = ConnectionRegistry::new();
    let connection = registry
        .open(&config.driver, &config.dsn, config.max_pool_size)
        .await
        .inspect_err(|e| error!(error = %e, suggestion = ?e.suggestion(), "Open failed"))?;

    for (index, sql) in config.statements.iter().enumerate() {
        let output = run_statement(&connection, sql, &params).await;

        match output {
            Ok(json) => println!("{}", json?),
            Err(e) => {
                error!(
                    statement = index + 1,
                    error = %e,
                    suggestion = ?e.suggestion(),
                    "Statement failed"
                );
                return Err(e.into());
            }
        }
    }

    info!("Done");
    Ok(())
}
