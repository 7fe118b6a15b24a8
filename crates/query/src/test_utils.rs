//! Test utilities for code that talks to a query backend
//!
//! `ScriptedBackend` answers queries from a closure and records every call,
//! so tests can assert both on the SQL that was built and on how many times
//! the store was actually hit.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::QueryBackend;
use crate::error::QueryError;
use crate::params::QueryParams;
use crate::result::{QueryResult, Record};

type Handler = dyn Fn(&str, &QueryParams) -> Result<QueryResult, QueryError> + Send + Sync;

/// A query the scripted backend received
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    /// SQL text
    pub sql: String,
    /// Bound parameters
    pub params: QueryParams,
}

/// In-memory backend driven by a handler closure
pub struct ScriptedBackend {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedQuery>>,
}

impl ScriptedBackend {
    /// Create a backend that answers with `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &QueryParams) -> Result<QueryResult, QueryError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always return the same result
    pub fn returning(result: QueryResult) -> Self {
        Self::new(move |_, _| Ok(result.clone()))
    }

    /// Always fail with an execution error
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_, _| Err(QueryError::Execution(message.clone())))
    }

    /// Wrap in an `Arc` for injection
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of executed queries
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Every query received, in order
    pub fn calls(&self) -> Vec<RecordedQuery> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<QueryResult, QueryError> {
        self.calls.lock().push(RecordedQuery {
            sql: sql.to_string(),
            params: params.clone(),
        });
        (self.handler)(sql, params)
    }

    async fn health_check(&self) -> Result<(), QueryError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Build a result from JSON objects, columns in the given order
///
/// Panics if a value is not a JSON object; test input only.
pub fn rows(columns: &[&str], values: Vec<serde_json::Value>) -> QueryResult {
    let records: Vec<Record> = values
        .into_iter()
        .map(|v| match v {
            serde_json::Value::Object(map) => map,
            other => panic!("expected JSON object row, got {}", other),
        })
        .collect();
    QueryResult::from_records(columns, &records)
}
