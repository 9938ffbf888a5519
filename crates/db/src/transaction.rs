//! Transaction handles and the helpers that open them.
//!
//! A `TxHandle` is cheap to clone and every clone refers to the same open
//! transaction. Statements issued through clones are serialized by the
//! handle's lock, since a transaction lives on a single connection.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    client::{Db, TxBackend},
    models::{Row, Statement},
    options::QueryOpts,
    DbError,
};

#[derive(Clone)]
pub struct TxHandle {
    inner: Arc<Mutex<Option<Box<dyn TxBackend>>>>,
}

impl TxHandle {
    pub fn new(tx: Box<dyn TxBackend>) -> Self {
        Self { inner: Arc::new(Mutex::new(Some(tx))) }
    }

    pub async fn fetch(&self, stmt: &Statement) -> Result<Vec<Row>, DbError> {
        let mut guard = self.inner.lock().await;
        let tx = guard.as_mut().ok_or(DbError::TransactionClosed)?;
        tx.fetch(stmt).await
    }

    pub async fn commit(&self) -> Result<(), DbError> {
        let tx = self.inner.lock().await.take().ok_or(DbError::TransactionClosed)?;
        tx.commit().await
    }

    pub async fn rollback(&self) -> Result<(), DbError> {
        let tx = self.inner.lock().await.take().ok_or(DbError::TransactionClosed)?;
        tx.rollback().await
    }

    /// Whether both handles refer to the same transaction.
    pub fn same_as(&self, other: &TxHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxHandle")
            .field("handle", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

/// Open a transaction, run `f` on it, then commit on `Ok` or roll back on
/// `Err`.
///
/// The error returned by `f` wins over a failed rollback, which is only
/// logged. A failed commit is returned as is.
pub async fn transaction<T, E, F, Fut>(db: &Db, f: F) -> Result<T, E>
where
    F: FnOnce(TxHandle) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<DbError>,
{
    let tx = TxHandle::new(db.backend().begin().await?);
    debug!("transaction opened");

    match f(tx.clone()).await {
        Ok(value) => {
            tx.commit().await?;
            debug!("transaction committed");
            Ok(value)
        }
        Err(err) => {
            warn!("rolling back transaction");
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Run `f` inside the caller's transaction if `opts` carries one,
/// otherwise inside a new transaction added to `opts`.
///
/// Nested calls that pass their `opts` along reuse the outer transaction,
/// so a call chain opens at most one.
pub async fn with_transaction<T, E, F, Fut>(db: &Db, opts: QueryOpts, f: F) -> Result<T, E>
where
    F: FnOnce(QueryOpts) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<DbError>,
{
    if opts.transaction.is_some() {
        return f(opts).await;
    }
    transaction(db, move |tx| f(opts.with_transaction(tx))).await
}
