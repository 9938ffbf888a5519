//! The seam between the helpers and the database driver.
//!
//! `Backend` is the default connection, `TxBackend` an open transaction.
//! The Postgres implementations run a `Statement` whose result set is a
//! single `jsonb` column per row.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::QueryScalar;
use sqlx::types::Json;
use sqlx::{PgPool, Transaction};
use tracing::debug;

use crate::{
    config::DbConfig,
    models::{Row, Statement},
    pool::create_pool,
    DbError,
};

/// A connection source that can run statements and open transactions.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn TxBackend>, DbError>;

    async fn fetch(&self, stmt: &Statement) -> Result<Vec<Row>, DbError>;
}

/// An open transaction. Consumed by `commit` or `rollback`.
#[async_trait]
pub trait TxBackend: Send {
    async fn fetch(&mut self, stmt: &Statement) -> Result<Vec<Row>, DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}

/// Handle to the default connection, shared by every helper.
#[derive(Clone)]
pub struct Db {
    backend: Arc<dyn Backend>,
}

impl Db {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(Arc::new(PgBackend::new(pool)))
    }

    /// Open a pool for `config` and wrap it.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        Ok(Self::from_pool(create_pool(config).await?))
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn begin(&self) -> Result<Box<dyn TxBackend>, DbError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn fetch(&self, stmt: &Statement) -> Result<Vec<Row>, DbError> {
        debug!(params = stmt.params.len(), "executing statement");
        let values = bind(stmt).fetch_all(&self.pool).await?;
        into_rows(values)
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TxBackend for PgTx {
    async fn fetch(&mut self, stmt: &Statement) -> Result<Vec<Row>, DbError> {
        debug!(params = stmt.params.len(), "executing statement in transaction");
        let values = bind(stmt).fetch_all(&mut *self.tx).await?;
        into_rows(values)
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn bind(stmt: &Statement) -> QueryScalar<'_, Postgres, Json<Value>, PgArguments> {
    stmt.params.iter().fold(
        sqlx::query_scalar::<Postgres, Json<Value>>(&stmt.sql),
        |query, param| query.bind(Json(param.clone())),
    )
}

fn into_rows(values: Vec<Json<Value>>) -> Result<Vec<Row>, DbError> {
    values
        .into_iter()
        .map(|Json(value)| match value {
            Value::Object(row) => Ok(row),
            other => Err(DbError::NotAnObject(other.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_values_become_rows() {
        let rows = into_rows(vec![Json(json!({ "id": 1 })), Json(json!({ "id": 2 }))]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], json!(2));
    }

    #[test]
    fn non_object_values_are_rejected() {
        let err = into_rows(vec![Json(json!([1, 2]))]).unwrap_err();
        assert!(matches!(err, DbError::NotAnObject(_)));
    }
}
