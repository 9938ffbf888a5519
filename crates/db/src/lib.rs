//! `db` crate: generic relational data access helpers.
//!
//! Wraps a table-scoped query builder with camelCase/snake_case key
//! conversion, transaction threading, and small CRUD helpers over untyped
//! rows. Postgres via sqlx; the driver sits behind the `Backend` trait.

pub mod case;
pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod models;
pub mod options;
pub mod pool;
pub mod query;
pub mod repository;
pub mod table;
pub mod transaction;

pub use case::{camelize, convert_case, decamelize};
pub use client::{Backend, Db, PgBackend, TxBackend};
pub use config::DbConfig;
pub use error::DbError;
pub use models::{Row, Statement};
pub use options::QueryOpts;
pub use pool::DbPool;
pub use query::{query_builder, QueryBuilder};
pub use table::Table;
pub use transaction::{transaction, with_transaction, TxHandle};
