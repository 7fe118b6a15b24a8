//! Fixtures shared by the aggregator tests

use std::sync::Arc;

use chrono::NaiveDate;
use vantage_cache::{CacheTtls, MemoryStore, ReadThroughCache};
use vantage_query::QueryParams;
use vantage_query::test_utils::ScriptedBackend;

use crate::context::QueryContext;
use crate::schema::{DateEncoding, FieldKind, TableRegistry, TableSchema};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn positions() -> TableSchema {
    TableSchema::new("positions", "as_of_date", DateEncoding::Calendar)
        .with_field("desk", FieldKind::Text)
        .with_field("counterparty", FieldKind::Text)
        .with_field("amount", FieldKind::Number)
        .with_field("rate", FieldKind::Number)
        .with_field("notional", FieldKind::Number)
        .with_maturity_column("maturity_date")
}

pub fn trades() -> TableSchema {
    TableSchema::new("trades", "snap", DateEncoding::Compact)
        .with_field("desk", FieldKind::Text)
        .with_field("amount", FieldKind::Number)
}

pub fn registry() -> TableRegistry {
    TableRegistry::new()
        .with_table(positions())
        .unwrap()
        .with_table(trades())
        .unwrap()
}

pub fn context(backend: Arc<ScriptedBackend>) -> QueryContext {
    let cache = ReadThroughCache::new(backend, Arc::new(MemoryStore::new()));
    QueryContext::new(cache, registry(), CacheTtls::default())
}

/// Value bound under `name`
pub fn param<'a>(params: &'a QueryParams, name: &str) -> &'a str {
    params
        .get(name)
        .map(|p| p.value.as_str())
        .unwrap_or_else(|| panic!("parameter {} not bound", name))
}
