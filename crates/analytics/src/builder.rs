//! Query builder for parameterized analytics SQL
//!
//! Builds ClickHouse SELECT statements whose values travel as bound
//! parameters:
//! - Snapshot and range conditions on the table's date column
//! - Compiled filter predicates
//! - GROUP BY / ORDER BY / LIMIT / OFFSET

use chrono::NaiveDate;
use vantage_query::{ParamType, QueryParams};

use crate::measure::OrderDirection;
use crate::predicate::Predicate;
use crate::schema::TableSchema;

/// A finished statement and its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    /// SQL with placeholders
    pub sql: String,
    /// Bound values
    pub params: QueryParams,
}

impl BuiltQuery {
    /// Render with literals substituted, for logs only
    pub fn inline(&self) -> String {
        self.params.inline(&self.sql)
    }
}

/// Query builder for analytics SQL
pub struct QueryBuilder {
    table: String,
    select: Vec<String>,
    where_clauses: Vec<String>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    params: QueryParams,
}

impl QueryBuilder {
    /// Create a new query builder for a table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: Vec::new(),
            where_clauses: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            params: QueryParams::new(),
        }
    }

    /// Add a SELECT column
    pub fn select(mut self, column: impl Into<String>) -> Self {
        self.select.push(column.into());
        self
    }

    /// Add a SELECT column with alias
    pub fn select_as(mut self, expr: impl Into<String>, alias: impl Into<String>) -> Self {
        self.select.push(format!("{} AS {}", expr.into(), alias.into()));
        self
    }

    /// Add a WHERE clause without parameters
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clauses.push(clause.into());
        self
    }

    /// Add `<column> <op> {name:Type}` and bind the value
    pub fn where_param(
        mut self,
        column: &str,
        op: &str,
        name: &str,
        param_type: ParamType,
        value: impl Into<String>,
    ) -> Self {
        let placeholder = self.params.bind(name, param_type, value);
        self.where_clauses
            .push(format!("{} {} {}", column, op, placeholder));
        self
    }

    /// Compare the table's date column against a snapshot date
    pub fn where_date(
        mut self,
        schema: &TableSchema,
        op: &str,
        name: &str,
        date: NaiveDate,
    ) -> Self {
        let placeholder = schema.bind_date(&mut self.params, name, date);
        self.where_clauses
            .push(format!("{} {} {}", schema.date_column(), op, placeholder));
        self
    }

    /// AND a compiled predicate; empty predicates add nothing
    pub fn where_predicate(mut self, predicate: &Predicate) -> Self {
        if !predicate.is_empty() {
            self.where_clauses.push(format!("({})", predicate.sql));
            self.params.extend(predicate.params.clone());
        }
        self
    }

    /// Add a GROUP BY column
    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    /// Add an ORDER BY column
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(column.into());
        self
    }

    /// Add ORDER BY with direction
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(format!("{} DESC", column.into()));
        self
    }

    /// Add ORDER BY in the given direction
    pub fn order_by_dir(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by
            .push(format!("{} {}", column.into(), direction.as_sql()));
        self
    }

    /// Set LIMIT
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set OFFSET (only rendered with a limit)
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Build the final SQL query
    pub fn build(self) -> BuiltQuery {
        let mut sql = String::new();

        // SELECT
        sql.push_str("SELECT ");
        if self.select.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select.join(", "));
        }

        // FROM
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        // WHERE
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        // GROUP BY
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        // ORDER BY
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        // LIMIT / OFFSET
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
            if let Some(offset) = self.offset.filter(|o| *o > 0) {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        BuiltQuery {
            sql,
            params: self.params,
        }
    }
}
