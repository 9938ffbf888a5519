//! `rowkit` CLI entry-point.
//!
//! Thin front-end over the `db` helpers. Rows are printed as JSON on
//! stdout; logs go to stderr.
//!
//! Available sub-commands:
//! - `tables`: list the registered tables.
//! - `get`: first row where a field equals a value.
//! - `list`: rows matching an optional equality filter.
//! - `insert`: insert one row and print it.
//! - `update`: update a row by id and print it.
//! - `bulk-insert`: insert a JSON array of rows in batches.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use db::repository::{
    bulk_insert, generic_list, get_any, insert_and_return, update_and_return,
};
use db::{Db, DbConfig, QueryOpts, Row, Table};

#[derive(Parser)]
#[command(
    name = "rowkit",
    about = "Generic row access for the application database",
    version
)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = db::config::DEFAULT_MAX_CONNECTIONS, global = true)]
    max_connections: u32,

    /// Print rows with storage (snake_case) keys.
    #[arg(long, global = true)]
    snake_case: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered tables.
    Tables,
    /// Print the first row where FIELD equals VALUE.
    Get {
        table: String,
        field: String,
        /// JSON value; anything that is not valid JSON is taken as a string.
        value: String,
    },
    /// Print all rows matching an optional equality filter.
    List {
        table: String,
        /// JSON object of column/value pairs, e.g. '{"campaign_id": 3}'.
        #[arg(long = "where")]
        filter: Option<String>,
    },
    /// Insert one row (camelCase JSON object) and print it.
    Insert { table: String, row: String },
    /// Update the row with the given id and print it.
    Update { table: String, id: String, fields: String },
    /// Insert a JSON array of rows in batches.
    BulkInsert {
        table: String,
        rows: String,
        #[arg(long)]
        chunk_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Command::Tables => Value::from(Table::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>()),
        command => {
            let database_url = cli
                .database_url
                .context("DATABASE_URL is not set (pass --database-url)")?;
            let config = DbConfig {
                database_url,
                max_connections: cli.max_connections,
            };
            let db = Db::connect(&config)
                .await
                .context("failed to connect to database")?;

            let mut opts = QueryOpts::new();
            opts.snake_case = cli.snake_case;
            run(&db, command, opts).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(db: &Db, command: Command, opts: QueryOpts) -> Result<Value> {
    let output = match command {
        Command::Tables => Value::Null,
        Command::Get { table, field, value } => {
            let row = get_any(db, &table, &field, parse_value(&value), &opts).await?;
            row.map_or(Value::Null, Value::Object)
        }
        Command::List { table, filter } => {
            let filter = filter.as_deref().map(parse_row).transpose()?;
            let rows = generic_list(db, &table, filter, &opts).await?;
            rows_to_value(rows)
        }
        Command::Insert { table, row } => {
            let inserted = insert_and_return(db, &table, parse_row(&row)?, &opts).await?;
            inserted.map_or(Value::Null, Value::Object)
        }
        Command::Update { table, id, fields } => {
            let updated =
                update_and_return(db, &table, parse_value(&id), parse_row(&fields)?, &opts).await?;
            updated.map_or(Value::Null, Value::Object)
        }
        Command::BulkInsert { table, rows, chunk_size } => {
            let rows = parse_rows(&rows)?;
            let opts = match chunk_size {
                Some(size) => opts.chunk_size(size),
                None => opts,
            };
            let count = rows.len();
            let inserted = bulk_insert(db, &table, rows, &opts).await?;
            info!("Inserted {count} rows into {table}");
            rows_to_value(inserted)
        }
    };
    Ok(output)
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_row(raw: &str) -> Result<Row> {
    match serde_json::from_str::<Value>(raw).context("row must be valid JSON")? {
        Value::Object(row) => Ok(row),
        other => bail!("expected a JSON object, got {other}"),
    }
}

fn parse_rows(raw: &str) -> Result<Vec<Row>> {
    match serde_json::from_str::<Value>(raw).context("rows must be valid JSON")? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => bail!("expected a JSON object, got {other}"),
            })
            .collect(),
        other => bail!("expected a JSON array of objects, got {other}"),
    }
}

fn rows_to_value(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_fall_back_to_strings() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("null"), json!(null));
        assert_eq!(parse_value("a@example.com"), json!("a@example.com"));
    }

    #[test]
    fn rows_must_be_objects() {
        assert!(parse_row(r#"{"firstName": "A"}"#).is_ok());
        assert!(parse_row("[1]").is_err());
        assert!(parse_rows(r#"[{"a": 1}, 2]"#).is_err());
        assert_eq!(parse_rows(r#"[{"a": 1}, {"a": 2}]"#).unwrap().len(), 2);
    }

    #[test]
    fn cli_parses_bulk_insert() {
        let cli = Cli::try_parse_from([
            "rowkit",
            "--database-url",
            "postgres://localhost/app",
            "bulk-insert",
            "message",
            "[]",
            "--chunk-size",
            "2",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::BulkInsert { chunk_size: Some(2), .. }));
    }
}
