//! `MockBackend`: an in-process test double for `Backend`.
//!
//! Records every statement it receives and counts transaction begins,
//! commits and rollbacks, so helper behaviour can be checked without a
//! live Postgres.
//!
//! State sits behind a `std::sync::Mutex`; every accessor panics if a
//! previous holder panicked and poisoned the lock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    client::{Backend, Db, TxBackend},
    models::{Row, Statement},
    DbError,
};

/// A statement seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub statement: Statement,
    /// Set when the statement ran inside a transaction.
    pub transaction: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    begins: usize,
    commits: usize,
    rollbacks: usize,
    statements: Vec<RecordedStatement>,
    responses: VecDeque<Result<Vec<Row>, String>>,
}

/// Recording backend. Unscripted statements are answered by echo:
///
/// Inserts echo one record per inserted row (an empty row for
/// `DEFAULT VALUES`), updates echo the new field values
/// merged with the equality filters, and selects return no rows.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a clone of this mock in a `Db`; the mock keeps observing it.
    pub fn db(&self) -> Db {
        Db::new(Arc::new(self.clone()))
    }

    /// Answer the next statement with `rows`.
    pub fn respond_with(&self, rows: Vec<Row>) {
        self.state.lock().unwrap().responses.push_back(Ok(rows));
    }

    /// Fail the next statement with a protocol error carrying `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state.lock().unwrap().responses.push_back(Err(message.into()));
    }

    pub fn begin_count(&self) -> usize {
        self.state.lock().unwrap().begins
    }

    pub fn commit_count(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn rollback_count(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    /// All statements seen so far, in call order.
    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state.lock().unwrap().statements.clone()
    }

    fn answer(&self, stmt: &Statement, transaction: Option<usize>) -> Result<Vec<Row>, DbError> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(RecordedStatement {
            statement: stmt.clone(),
            transaction,
        });

        match state.responses.pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(DbError::Sqlx(sqlx::Error::Protocol(message))),
            None => Ok(echo(stmt)),
        }
    }
}

fn echo(stmt: &Statement) -> Vec<Row> {
    if stmt.sql.starts_with("INSERT") {
        if stmt.params.is_empty() {
            return vec![Row::new()];
        }
        return stmt
            .params
            .iter()
            .filter_map(|record| record.as_object().cloned())
            .collect();
    }
    if stmt.sql.starts_with("UPDATE") {
        let mut row = Row::new();
        for param in stmt.params.iter().rev() {
            if let Some(fields) = param.as_object() {
                row.extend(fields.clone());
            }
        }
        return vec![row];
    }
    Vec::new()
}

#[async_trait]
impl Backend for MockBackend {
    async fn begin(&self) -> Result<Box<dyn TxBackend>, DbError> {
        let id = {
            let mut state = self.state.lock().unwrap();
            state.begins += 1;
            state.begins
        };
        Ok(Box::new(MockTx { backend: self.clone(), id }))
    }

    async fn fetch(&self, stmt: &Statement) -> Result<Vec<Row>, DbError> {
        self.answer(stmt, None)
    }
}

struct MockTx {
    backend: MockBackend,
    id: usize,
}

#[async_trait]
impl TxBackend for MockTx {
    async fn fetch(&mut self, stmt: &Statement) -> Result<Vec<Row>, DbError> {
        self.backend.answer(stmt, Some(self.id))
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.backend.state.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.backend.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic]
    fn poisoned_state_panics_on_access() {
        let mock = MockBackend::new();
        let state = Arc::clone(&mock.state);
        let _ = std::thread::spawn(move || {
            let _guard = state.lock().unwrap();
            panic!("holder panicked");
        })
        .join();

        mock.begin_count();
    }

    #[tokio::test]
    async fn empty_insert_echoes_one_empty_row() {
        let mock = MockBackend::new();
        let stmt = Statement::new("INSERT INTO \"tag\" AS t DEFAULT VALUES RETURNING to_jsonb(t)", Vec::new());
        let rows = mock.fetch(&stmt).await.unwrap();
        assert_eq!(rows, vec![Row::new()]);
    }
}
