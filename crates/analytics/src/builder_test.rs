//! Tests for the query builder

use chrono::NaiveDate;
use vantage_query::ParamType;

use crate::builder::QueryBuilder;
use crate::filter::Filter;
use crate::measure::OrderDirection;
use crate::predicate::compile;
use crate::schema::{DateEncoding, FieldKind, TableSchema};

fn positions() -> TableSchema {
    TableSchema::new("positions", "as_of_date", DateEncoding::Calendar)
        .with_field("desk", FieldKind::Text)
        .with_field("amount", FieldKind::Number)
}

#[test]
fn test_simple_select() {
    let query = QueryBuilder::new("positions")
        .select("desk")
        .select("amount")
        .build();

    assert_eq!(query.sql, "SELECT desk, amount FROM positions");
    assert!(query.params.is_empty());
}

#[test]
fn test_select_star() {
    let query = QueryBuilder::new("positions").build();
    assert_eq!(query.sql, "SELECT * FROM positions");
}

#[test]
fn test_select_as() {
    let query = QueryBuilder::new("positions")
        .select_as("count()", "total")
        .build();
    assert_eq!(query.sql, "SELECT count() AS total FROM positions");
}

#[test]
fn test_where_param_binds_value() {
    let query = QueryBuilder::new("positions")
        .select("desk")
        .where_param("desk", "=", "d", ParamType::String, "EQ")
        .build();

    assert_eq!(query.sql, "SELECT desk FROM positions WHERE desk = {d:String}");
    assert_eq!(query.params.get("d").unwrap().value, "EQ");
    assert_eq!(query.inline(), "SELECT desk FROM positions WHERE desk = 'EQ'");
}

#[test]
fn test_where_date_uses_table_encoding() {
    let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

    let calendar = QueryBuilder::new("positions")
        .where_date(&positions(), "=", "snapshot", date)
        .build();
    assert_eq!(
        calendar.sql,
        "SELECT * FROM positions WHERE as_of_date = {snapshot:Date}"
    );
    assert_eq!(calendar.params.get("snapshot").unwrap().value, "2024-02-01");

    let compact_schema = TableSchema::new("trades", "snap", DateEncoding::Compact);
    let compact = QueryBuilder::new("trades")
        .where_date(&compact_schema, "<=", "base", date)
        .build();
    assert_eq!(compact.sql, "SELECT * FROM trades WHERE snap <= {base:String}");
    assert_eq!(compact.params.get("base").unwrap().value, "20240201");
}

#[test]
fn test_where_predicate() {
    let schema = positions();
    let predicate = compile(&[Filter::one_of("desk", ["EQ", "FX"])], &schema).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

    let query = QueryBuilder::new("positions")
        .select("desk")
        .where_date(&schema, "=", "snapshot", date)
        .where_predicate(&predicate)
        .build();

    assert_eq!(
        query.sql,
        "SELECT desk FROM positions WHERE as_of_date = {snapshot:Date} \
         AND (desk IN ({p0_0:String}, {p0_1:String}))"
    );
    assert_eq!(query.params.len(), 3);
    assert!(query.params.validate().is_ok());
}

#[test]
fn test_empty_predicate_adds_nothing() {
    let predicate = compile(&[], &positions()).unwrap();
    let query = QueryBuilder::new("positions")
        .where_predicate(&predicate)
        .build();
    assert_eq!(query.sql, "SELECT * FROM positions");
}

#[test]
fn test_group_by_order_limit() {
    let query = QueryBuilder::new("positions")
        .select_as("desk", "group_key")
        .select_as("sum(amount)", "value")
        .group_by("group_key")
        .order_by_dir("value", OrderDirection::Desc)
        .order_by("group_key")
        .limit(100)
        .build();

    assert_eq!(
        query.sql,
        "SELECT desk AS group_key, sum(amount) AS value FROM positions \
         GROUP BY group_key ORDER BY value DESC, group_key LIMIT 100"
    );
}

#[test]
fn test_offset_only_with_limit() {
    let query = QueryBuilder::new("positions")
        .order_by_desc("amount")
        .limit(50)
        .offset(100)
        .build();
    assert_eq!(
        query.sql,
        "SELECT * FROM positions ORDER BY amount DESC LIMIT 50 OFFSET 100"
    );

    let no_limit = QueryBuilder::new("positions").offset(100).build();
    assert_eq!(no_limit.sql, "SELECT * FROM positions");

    let zero = QueryBuilder::new("positions").limit(5).offset(0).build();
    assert_eq!(zero.sql, "SELECT * FROM positions LIMIT 5");
}
