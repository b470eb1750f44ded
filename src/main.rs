//! db-access - Main entry point.
//!
//! Lists the configured connections or runs SQL against one of them, printing
//! rows as JSON lines.

use clap::Parser;
use db_access::config::{Command, Config, parse_name_map};
use db_access::db::{
    Connection, ConnectionResolver, ProviderRegistry, ResultCursor, close_connection,
    open_connection, run_in_transaction,
};
use db_access::error::DbError;
use db_access::sort::SortSpec;
use serde_json::{Map, Value as JsonValue, json};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr, rows to stdout
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

/// Append the sort expression to `sql` as an ORDER BY clause.
fn apply_sort(sql: &str, sort: Option<&str>, sort_map: &[String]) -> Result<String, DbError> {
    let Some(raw) = sort else {
        return Ok(sql.to_string());
    };

    let mapping = parse_name_map(sort_map)?;
    let spec = SortSpec::parse_with_mapping(raw, Some(&mapping));
    if !spec.has_only_safe_identifiers() {
        return Err(DbError::invalid_input(format!(
            "Sort expression '{}' contains characters that are not allowed in column names",
            raw
        )));
    }

    Ok(match spec.order_by_clause() {
        Some(clause) => format!("{} {}", sql.trim_end().trim_end_matches(';'), clause),
        None => sql.to_string(),
    })
}

fn run(config: &Config) -> Result<(), DbError> {
    let settings = config.connection_settings()?;
    let resolver = ConnectionResolver::new(
        Arc::new(settings),
        ProviderRegistry::with_sqlx_providers()?,
    );

    match &config.command {
        Command::List => {
            for name in resolver.names() {
                let descriptor = resolver.descriptor(&name)?;
                println!(
                    "{}",
                    json!({
                        "name": descriptor.name,
                        "provider": descriptor.provider_key,
                        "target": descriptor.masked_connection_string(),
                    })
                );
            }
        }
        Command::Query {
            name,
            sql,
            sort,
            sort_map,
        } => {
            let sql = apply_sort(sql, sort.as_deref(), sort_map)?;
            let mut connection = resolver.resolve(name)?;
            open_connection(connection.as_mut())?;

            let result = connection.query(&sql, &[]);
            close_connection(connection.as_mut(), true)?;
            let mut cursor = result?;

            let columns = cursor.columns().to_vec();
            let mut rows = 0usize;
            while cursor.advance()? {
                let mut row = Map::new();
                for (idx, column) in columns.iter().enumerate() {
                    row.insert(column.clone(), cursor.value(idx)?.to_json());
                }
                println!("{}", JsonValue::Object(row));
                rows += 1;
            }
            info!(connection = %name, rows, "Query complete");
        }
        Command::Execute { name, statements } => {
            let mut connection = resolver.resolve(name)?;
            let affected = run_in_transaction(connection.as_mut(), |scope| {
                let mut total = 0u64;
                for statement in statements {
                    total += scope.execute(statement, &[])?;
                }
                Ok(total)
            })?;
            println!("{}", json!({ "rows_affected": affected }));
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    if let Err(e) = run(&config) {
        error!(error = %e, "Command failed");
        if let Some(suggestion) = e.suggestion() {
            eprintln!("Hint: {}", suggestion);
        }
        if e.is_retryable() {
            eprintln!("The failure looks transient; running the command again may succeed.");
        }
        return Err(e.into());
    }

    Ok(())
}
