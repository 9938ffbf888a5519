//! Postgres connection pool.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::{config::DbConfig, DbError};

/// Type alias for the shared Postgres pool used across the whole application.
pub type DbPool = PgPool;

/// Create a new connection pool from `config`.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool, DbError> {
    info!("Connecting to database (max_connections={})", config.max_connections);
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}
