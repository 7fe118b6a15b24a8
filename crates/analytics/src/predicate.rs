//! Filter to predicate compilation
//!
//! Turns a list of [`Filter`]s into a WHERE fragment plus bound parameters.
//! Field names are checked against the table's allow-list; values are never
//! written into the SQL text, only bound as typed parameters.

use chrono::NaiveDate;
use vantage_query::{ParamType, QueryParams};

use crate::error::{AnalyticsError, Result};
use crate::filter::{Filter, Operator};
use crate::schema::{FieldKind, TableSchema};

/// A compiled WHERE fragment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    /// SQL with placeholders; empty when no filter applies
    pub sql: String,
    /// Values bound by `sql`
    pub params: QueryParams,
}

impl Predicate {
    /// Whether no filter applies
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Render with literals substituted, for logs only
    pub fn inline(&self) -> String {
        self.params.inline(&self.sql)
    }
}

/// Compile filters against a table schema
///
/// Distinct filters are joined with AND. OR only appears inside a single
/// "includes any" filter. Filters without values are skipped.
pub fn compile(filters: &[Filter], schema: &TableSchema) -> Result<Predicate> {
    let mut params = QueryParams::new();
    let mut clauses = Vec::new();

    for (i, filter) in filters.iter().enumerate() {
        if filter.is_empty() {
            continue;
        }
        let kind = schema.field(&filter.field)?;
        let mut binder = Binder {
            params: &mut params,
            filter: i,
            next: 0,
        };
        clauses.push(compile_filter(filter, kind, &mut binder)?);
    }

    Ok(Predicate {
        sql: clauses.join(" AND "),
        params,
    })
}

/// Binds values of one filter as `p<filter>_<value>`
struct Binder<'a> {
    params: &'a mut QueryParams,
    filter: usize,
    next: usize,
}

impl Binder<'_> {
    fn bind(&mut self, param_type: ParamType, value: String) -> String {
        let name = format!("p{}_{}", self.filter, self.next);
        self.next += 1;
        self.params.bind(name, param_type, value)
    }

    /// Bind a value compared directly against a field of `kind`
    fn bind_typed(&mut self, kind: FieldKind, field: &str, value: &str) -> Result<String> {
        let value = normalize_value(kind, field, value)?;
        Ok(self.bind(kind.param_type(), value))
    }

    /// Bind a LIKE pattern matching `value` anywhere
    fn bind_pattern(&mut self, value: &str) -> String {
        self.bind(ParamType::String, format!("%{}%", escape_like(value)))
    }
}

fn compile_filter(filter: &Filter, kind: FieldKind, binder: &mut Binder<'_>) -> Result<String> {
    let field = filter.field.as_str();
    let values = &filter.values;

    let clause = match &filter.operator {
        Operator::Equals => membership(field, kind, values, binder, "=", "IN")?,
        Operator::NotEquals => membership(field, kind, values, binder, "!=", "NOT IN")?,
        Operator::OneOf => {
            let placeholders = bind_all(kind, field, values, binder)?;
            format!("{} IN ({})", field, placeholders.join(", "))
        }
        Operator::Contains | Operator::AllOf => {
            substring(field, kind, values, binder, "ILIKE", " AND ")
        }
        Operator::NotContains | Operator::NoneOf => {
            substring(field, kind, values, binder, "NOT ILIKE", " AND ")
        }
        Operator::AnyOf => substring(field, kind, values, binder, "ILIKE", " OR "),
        Operator::LessThan
        | Operator::GreaterThan
        | Operator::LessOrEqual
        | Operator::GreaterOrEqual => {
            let symbol = filter.operator.comparison_symbol().unwrap_or("=");
            let placeholder = binder.bind_typed(kind, field, &values[0])?;
            format!("{} {} {}", field, symbol, placeholder)
        }
        Operator::Unrecognized(op) => {
            tracing::warn!(
                field = %field,
                operator = %op,
                "unrecognized filter operator, comparing for equality"
            );
            membership(field, kind, values, binder, "=", "IN")?
        }
    };

    Ok(clause)
}

/// `f = v` for one value, `f IN (...)` for several
fn membership(
    field: &str,
    kind: FieldKind,
    values: &[String],
    binder: &mut Binder<'_>,
    single: &str,
    multiple: &str,
) -> Result<String> {
    let placeholders = bind_all(kind, field, values, binder)?;
    if placeholders.len() == 1 {
        Ok(format!("{} {} {}", field, single, placeholders[0]))
    } else {
        Ok(format!("{} {} ({})", field, multiple, placeholders.join(", ")))
    }
}

fn substring(
    field: &str,
    kind: FieldKind,
    values: &[String],
    binder: &mut Binder<'_>,
    op: &str,
    joiner: &str,
) -> String {
    let target = match kind {
        FieldKind::Text => field.to_string(),
        FieldKind::Number | FieldKind::Date => format!("toString({})", field),
    };
    let parts: Vec<String> = values
        .iter()
        .map(|v| format!("{} {} {}", target, op, binder.bind_pattern(v)))
        .collect();

    match parts.as_slice() {
        [single] => single.clone(),
        _ => format!("({})", parts.join(joiner)),
    }
}

fn bind_all(
    kind: FieldKind,
    field: &str,
    values: &[String],
    binder: &mut Binder<'_>,
) -> Result<Vec<String>> {
    values
        .iter()
        .map(|v| binder.bind_typed(kind, field, v))
        .collect()
}

/// Check a value fits the field and put it in ClickHouse text form
fn normalize_value(kind: FieldKind, field: &str, value: &str) -> Result<String> {
    match kind {
        FieldKind::Text => Ok(value.to_string()),
        FieldKind::Number => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.to_string())
            .ok_or_else(|| {
                AnalyticsError::InvalidFilter(format!("'{}' is not a number for {}", value, field))
            }),
        FieldKind::Date => parse_filter_date(value)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .ok_or_else(|| {
                AnalyticsError::InvalidFilter(format!("'{}' is not a date for {}", value, field))
            }),
    }
}

fn parse_filter_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
}

/// Escape LIKE pattern special characters
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
