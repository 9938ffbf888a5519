//! Row and statement types shared by the query builder and the backends.
//!
//! Rows are untyped: their shape is whatever the schema says.

use serde_json::{Map, Value};

/// A table row, column name to value.
pub type Row = Map<String, Value>;

/// SQL text plus its positional parameters.
///
/// Every parameter is bound as `jsonb`; the SQL coerces it to the
/// column's own type.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self { sql: sql.into(), params }
    }
}
