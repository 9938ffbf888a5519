//! Typed error type for the db crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// The driver returned a row that is not a JSON object.
    #[error("expected a row object, got: {0}")]
    NotAnObject(String),

    /// Insert or update was called without any columns.
    #[error("no columns given for {0}")]
    EmptyFields(&'static str),

    /// The transaction handle was used after commit or rollback.
    #[error("transaction is already closed")]
    TransactionClosed,

    #[error("configuration error: {0}")]
    Config(String),
}
