//! Generic get / list / insert / update helpers.
//!
//! Field names used in filters are passed to the database as given; only
//! row payloads are converted between camelCase and snake_case.

use serde_json::Value;
use tracing::debug;

use crate::{
    case::{convert_case, convert_case_first, decamelize_row},
    client::Db,
    models::Row,
    options::QueryOpts,
    query::query_builder,
    transaction::with_transaction,
    DbError,
};

/// First row where `field = value`, or `None`.
pub async fn get_any(
    db: &Db,
    table: impl AsRef<str>,
    field: &str,
    value: impl Into<Value>,
    opts: &QueryOpts,
) -> Result<Option<Row>, DbError> {
    let row = query_builder(db, table, opts)
        .where_eq(field, value)
        .fetch_first()
        .await?;

    Ok(row.map(|row| convert_case(row, opts)))
}

/// First row where `field` is any of `values`.
///
/// Only one row comes back even when several match; use
/// [`generic_get_all`] for every match.
pub async fn generic_get_many<I, V>(
    db: &Db,
    table: impl AsRef<str>,
    field: &str,
    values: I,
    opts: &QueryOpts,
) -> Result<Option<Row>, DbError>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let row = query_builder(db, table, opts)
        .where_in(field, values)
        .fetch_first()
        .await?;

    Ok(row.map(|row| convert_case(row, opts)))
}

/// Every row where `field` is any of `values`.
pub async fn generic_get_all<I, V>(
    db: &Db,
    table: impl AsRef<str>,
    field: &str,
    values: I,
    opts: &QueryOpts,
) -> Result<Vec<Row>, DbError>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let rows = query_builder(db, table, opts)
        .where_in(field, values)
        .select()
        .await?;

    Ok(rows.into_iter().map(|row| convert_case(row, opts)).collect())
}

/// Rows matching every `column = value` pair of `filter`; all rows when
/// `filter` is `None`.
pub async fn generic_list(
    db: &Db,
    table: impl AsRef<str>,
    filter: Option<Row>,
    opts: &QueryOpts,
) -> Result<Vec<Row>, DbError> {
    let mut qb = query_builder(db, table, opts);
    if let Some(filter) = filter {
        qb = qb.where_all(filter);
    }
    let rows = qb.select().await?;

    Ok(rows.into_iter().map(|row| convert_case(row, opts)).collect())
}

/// Insert one row given in camelCase and return it as stored.
pub async fn insert_and_return(
    db: &Db,
    table: impl AsRef<str>,
    fields: Row,
    opts: &QueryOpts,
) -> Result<Option<Row>, DbError> {
    let rows = query_builder(db, table, opts)
        .insert(vec![decamelize_row(fields)])
        .await?;

    Ok(convert_case_first(rows, opts))
}

/// Insert `rows` in batches of `opts.chunk_size` (default 1000).
///
/// All batches share one transaction: the caller's when `opts` carries
/// one, otherwise a new one. Inserted rows are returned with storage
/// (snake_case) keys regardless of `opts.snake_case`.
pub async fn bulk_insert(
    db: &Db,
    table: impl AsRef<str>,
    rows: Vec<Row>,
    opts: &QueryOpts,
) -> Result<Vec<Row>, DbError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let table = table.as_ref();
    let chunk_size = opts.effective_chunk_size();
    let rows: Vec<Row> = rows.into_iter().map(decamelize_row).collect();

    with_transaction(db, opts.clone(), |opts| async move {
        let mut inserted = Vec::with_capacity(rows.len());
        for batch in rows.chunks(chunk_size) {
            debug!(table, rows = batch.len(), "inserting batch");
            let batch_rows = query_builder(db, table, &opts)
                .insert(batch.to_vec())
                .await?;
            inserted.extend(batch_rows);
        }
        Ok::<_, DbError>(inserted)
    })
    .await
}

/// Update the row whose `id` is `id` and return it, or `None` when no row
/// has that id.
pub async fn update_and_return(
    db: &Db,
    table: impl AsRef<str>,
    id: impl Into<Value>,
    fields: Row,
    opts: &QueryOpts,
) -> Result<Option<Row>, DbError> {
    let rows = query_builder(db, table, opts)
        .where_eq("id", id)
        .update(decamelize_row(fields))
        .await?;

    Ok(convert_case_first(rows, opts))
}
