//! Table-scoped query builder.
//!
//! Builds Postgres statements whose parameters are all `jsonb`. Values are
//! coerced to each column's declared type by populating a record of the
//! table's row type, so callers never deal with SQL types:
//!
//! ```sql
//! SELECT to_jsonb(t) FROM "user" AS t
//! WHERE t."email" = (jsonb_populate_record(NULL::"user", $1))."email"
//! LIMIT 1
//! ```
//!
//! Every statement yields one `jsonb` row object per result row.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use crate::{
    client::{Backend, Db},
    models::{Row, Statement},
    options::QueryOpts,
    transaction::TxHandle,
    DbError,
};

/// Where a built statement runs.
#[derive(Clone)]
enum Scope {
    Connection(Arc<dyn Backend>),
    Transaction(TxHandle),
}

#[derive(Debug, Clone, PartialEq)]
enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
}

/// Query scoped to one table, running on a transaction or the default
/// connection.
#[derive(Clone)]
pub struct QueryBuilder {
    table: String,
    scope: Scope,
    filters: Vec<Filter>,
    for_update: bool,
    limit: Option<u64>,
}

/// Start a query on `table`, using `opts.transaction` when present.
///
/// `opts.for_update` makes selects lock the rows they return.
pub fn query_builder(db: &Db, table: impl AsRef<str>, opts: &QueryOpts) -> QueryBuilder {
    let scope = match &opts.transaction {
        Some(tx) => Scope::Transaction(tx.clone()),
        None => Scope::Connection(Arc::clone(db.backend())),
    };
    QueryBuilder {
        table: table.as_ref().to_string(),
        scope,
        filters: Vec::new(),
        for_update: opts.for_update,
        limit: None,
    }
}

impl QueryBuilder {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn in_transaction(&self) -> bool {
        matches!(self.scope, Scope::Transaction(_))
    }

    /// `column = value`; a JSON `null` becomes `column IS NULL`.
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        self.filters.push(if value.is_null() {
            Filter::IsNull(column)
        } else {
            Filter::Eq(column, value)
        });
        self
    }

    /// `column IN (values)`. An empty list matches nothing.
    pub fn where_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filters.push(Filter::In(
            column.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// AND of `column = value` for every entry of `conditions`.
    pub fn where_all(self, conditions: Row) -> Self {
        conditions
            .into_iter()
            .fold(self, |qb, (column, value)| qb.where_eq(column, value))
    }

    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn first(self) -> Self {
        self.limit(1)
    }

    // -----------------------------------------------------------------------
    // statement building
    // -----------------------------------------------------------------------

    pub fn select_statement(&self) -> Statement {
        let mut params = Vec::new();
        let mut sql = format!("SELECT to_jsonb(t) FROM {} AS t", quote_ident(&self.table));
        sql.push_str(&self.where_clause(&mut params));
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if self.for_update {
            sql.push_str(" FOR UPDATE");
        }
        Statement::new(sql, params)
    }

    /// Multi-row insert returning every inserted row.
    ///
    /// The column list is the union of the rows' keys; a row missing a
    /// column gets the column's `DEFAULT`. A single row without any keys
    /// inserts `DEFAULT VALUES`.
    pub fn insert_statement(&self, rows: &[Row]) -> Result<Statement, DbError> {
        let table = quote_ident(&self.table);
        let columns: BTreeSet<&str> = rows
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        if columns.is_empty() {
            return match rows {
                [_] => Ok(Statement::new(
                    format!("INSERT INTO {table} AS t DEFAULT VALUES RETURNING to_jsonb(t)"),
                    Vec::new(),
                )),
                _ => Err(DbError::EmptyFields("insert")),
            };
        }

        // one jsonb param per row
        let mut params = Vec::with_capacity(rows.len());
        let tuples: Vec<String> = rows
            .iter()
            .map(|row| {
                params.push(Value::Object(row.clone()));
                let n = params.len();
                let values: Vec<String> = columns
                    .iter()
                    .map(|&column| {
                        if row.contains_key(column) {
                            format!(
                                "(jsonb_populate_record(NULL::{table}, ${n})).{}",
                                quote_ident(column)
                            )
                        } else {
                            "DEFAULT".to_string()
                        }
                    })
                    .collect();
                format!("({})", values.join(", "))
            })
            .collect();

        let sql = format!(
            "INSERT INTO {table} AS t ({}) VALUES {} RETURNING to_jsonb(t)",
            column_list(columns.iter().copied()),
            tuples.join(", ")
        );
        Ok(Statement::new(sql, params))
    }

    /// Update of the filtered rows returning every updated row.
    pub fn update_statement(&self, fields: &Row) -> Result<Statement, DbError> {
        if fields.is_empty() {
            return Err(DbError::EmptyFields("update"));
        }
        let columns = column_list(fields.keys().map(String::as_str));
        let table = quote_ident(&self.table);

        let mut params = vec![Value::Object(fields.clone())];
        let where_clause = self.where_clause(&mut params);
        let sql = format!(
            "UPDATE {table} AS t SET ({columns}) = \
             (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1))\
             {where_clause} RETURNING to_jsonb(t)"
        );
        Ok(Statement::new(sql, params))
    }

    fn where_clause(&self, params: &mut Vec<Value>) -> String {
        if self.filters.is_empty() {
            return String::new();
        }
        let table = quote_ident(&self.table);
        let conditions: Vec<String> = self
            .filters
            .iter()
            .map(|filter| match filter {
                Filter::IsNull(column) => format!("t.{} IS NULL", quote_ident(column)),
                Filter::Eq(column, value) => {
                    params.push(record(column, value.clone()));
                    let column = quote_ident(column);
                    format!(
                        "t.{column} = (jsonb_populate_record(NULL::{table}, ${})).{column}",
                        params.len()
                    )
                }
                Filter::In(_, values) if values.is_empty() => "FALSE".to_string(),
                Filter::In(column, values) => {
                    params.push(Value::Array(
                        values.iter().map(|v| record(column, v.clone())).collect(),
                    ));
                    let column = quote_ident(column);
                    format!(
                        "t.{column} IN (SELECT {column} FROM jsonb_populate_recordset(NULL::{table}, ${}))",
                        params.len()
                    )
                }
            })
            .collect();
        format!(" WHERE {}", conditions.join(" AND "))
    }

    // -----------------------------------------------------------------------
    // execution
    // -----------------------------------------------------------------------

    pub async fn select(self) -> Result<Vec<Row>, DbError> {
        let stmt = self.select_statement();
        self.run(&stmt).await
    }

    /// First matching row, if any.
    pub async fn fetch_first(self) -> Result<Option<Row>, DbError> {
        Ok(self.first().select().await?.into_iter().next())
    }

    pub async fn insert(self, rows: Vec<Row>) -> Result<Vec<Row>, DbError> {
        let stmt = self.insert_statement(&rows)?;
        self.run(&stmt).await
    }

    pub async fn update(self, fields: Row) -> Result<Vec<Row>, DbError> {
        let stmt = self.update_statement(&fields)?;
        self.run(&stmt).await
    }

    async fn run(&self, stmt: &Statement) -> Result<Vec<Row>, DbError> {
        match &self.scope {
            Scope::Connection(backend) => backend.fetch(stmt).await,
            Scope::Transaction(tx) => tx.fetch(stmt).await,
        }
    }
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("table", &self.table)
            .field("in_transaction", &self.in_transaction())
            .field("filters", &self.filters)
            .field("for_update", &self.for_update)
            .field("limit", &self.limit)
            .finish()
    }
}

/// Double-quote an identifier; dotted names are quoted per segment.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn column_list<'a>(columns: impl IntoIterator<Item = &'a str>) -> String {
    columns
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

fn record(column: &str, value: Value) -> Value {
    let mut row = Row::new();
    row.insert(column.to_string(), value);
    Value::Object(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use serde_json::json;

    fn db() -> Db {
        MockBackend::new().db()
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("user"), "\"user\"");
        assert_eq!(quote_ident("public.user"), "\"public\".\"user\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn select_with_equality_filter_and_limit() {
        let stmt = query_builder(&db(), "user", &QueryOpts::default())
            .where_eq("email", "a@example.com")
            .first()
            .select_statement();

        assert_eq!(
            stmt.sql,
            "SELECT to_jsonb(t) FROM \"user\" AS t \
             WHERE t.\"email\" = (jsonb_populate_record(NULL::\"user\", $1)).\"email\" LIMIT 1"
        );
        assert_eq!(stmt.params, vec![json!({ "email": "a@example.com" })]);
    }

    #[test]
    fn for_update_option_locks_selected_rows() {
        let stmt = query_builder(&db(), "campaign", &QueryOpts::default().for_update())
            .first()
            .select_statement();
        assert!(stmt.sql.ends_with("LIMIT 1 FOR UPDATE"), "{}", stmt.sql);
    }

    #[test]
    fn null_equality_becomes_is_null() {
        let stmt = query_builder(&db(), "message", &QueryOpts::default())
            .where_all(row(json!({ "campaign_contact_id": 7, "user_id": null })))
            .select_statement();

        assert!(stmt.sql.contains("t.\"user_id\" IS NULL"), "{}", stmt.sql);
        assert!(stmt.sql.contains(" AND "));
        assert_eq!(stmt.params, vec![json!({ "campaign_contact_id": 7 })]);
    }

    #[test]
    fn where_in_binds_a_recordset() {
        let stmt = query_builder(&db(), "tag", &QueryOpts::default())
            .where_in("id", [1, 2, 3])
            .select_statement();

        assert!(stmt.sql.contains(
            "t.\"id\" IN (SELECT \"id\" FROM jsonb_populate_recordset(NULL::\"tag\", $1))"
        ));
        assert_eq!(stmt.params, vec![json!([{ "id": 1 }, { "id": 2 }, { "id": 3 }])]);
    }

    #[test]
    fn empty_where_in_matches_nothing() {
        let stmt = query_builder(&db(), "tag", &QueryOpts::default())
            .where_in("id", Vec::<i64>::new())
            .select_statement();
        assert!(stmt.sql.ends_with("WHERE FALSE"));
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn insert_fills_missing_columns_with_default() {
        let rows = vec![
            row(json!({ "title": "a" })),
            row(json!({ "title": "b", "created_at": "2024-01-01T00:00:00Z" })),
        ];
        let stmt = query_builder(&db(), "campaign", &QueryOpts::default())
            .insert_statement(&rows)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO \"campaign\" AS t (\"created_at\", \"title\") VALUES \
             (DEFAULT, (jsonb_populate_record(NULL::\"campaign\", $1)).\"title\"), \
             ((jsonb_populate_record(NULL::\"campaign\", $2)).\"created_at\", \
             (jsonb_populate_record(NULL::\"campaign\", $2)).\"title\") \
             RETURNING to_jsonb(t)"
        );
        assert_eq!(
            stmt.params,
            vec![
                json!({ "title": "a" }),
                json!({ "title": "b", "created_at": "2024-01-01T00:00:00Z" }),
            ]
        );
    }

    #[test]
    fn explicit_null_is_inserted_not_defaulted() {
        let stmt = query_builder(&db(), "label", &QueryOpts::default())
            .insert_statement(&[row(json!({ "name": "a", "description": null }))])
            .unwrap();
        assert!(!stmt.sql.contains("DEFAULT"), "{}", stmt.sql);
    }

    #[test]
    fn single_empty_row_inserts_default_values() {
        let stmt = query_builder(&db(), "tag", &QueryOpts::default())
            .insert_statement(&[Row::new()])
            .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO \"tag\" AS t DEFAULT VALUES RETURNING to_jsonb(t)");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn update_numbers_filter_params_after_fields() {
        let stmt = query_builder(&db(), "organization", &QueryOpts::default())
            .where_eq("id", 3)
            .update_statement(&row(json!({ "name": "Acme" })))
            .unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE \"organization\" AS t SET (\"name\") = \
             (SELECT \"name\" FROM jsonb_populate_record(NULL::\"organization\", $1)) \
             WHERE t.\"id\" = (jsonb_populate_record(NULL::\"organization\", $2)).\"id\" \
             RETURNING to_jsonb(t)"
        );
        assert_eq!(stmt.params, vec![json!({ "name": "Acme" }), json!({ "id": 3 })]);
    }

    #[test]
    fn empty_column_sets_are_rejected() {
        let qb = query_builder(&db(), "user", &QueryOpts::default());
        assert!(matches!(qb.insert_statement(&[]), Err(DbError::EmptyFields("insert"))));
        assert!(matches!(
            qb.insert_statement(&[Row::new(), Row::new()]),
            Err(DbError::EmptyFields("insert"))
        ));
        assert!(matches!(qb.update_statement(&Row::new()), Err(DbError::EmptyFields("update"))));
    }
}
