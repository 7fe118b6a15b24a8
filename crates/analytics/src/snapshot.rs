//! Snapshot date resolution
//!
//! Tables hold one immutable copy per snapshot date. A requested as-of date
//! is aligned to the nearest available snapshot: backward for current and
//! historical views, forward for maturity projections.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::builder::QueryBuilder;
use crate::context::QueryContext;
use crate::error::Result;
use crate::schema::TableSchema;
use crate::value::as_date;

/// Which way to look for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Greatest snapshot on or before the target
    Backward,
    /// Least snapshot on or after the target
    Forward,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Backward => "backward",
            Self::Forward => "forward",
        }
    }

    fn aggregate(&self) -> &'static str {
        match self {
            Self::Backward => "maxOrNull",
            Self::Forward => "minOrNull",
        }
    }

    fn comparison(&self) -> &'static str {
        match self {
            Self::Backward => "<=",
            Self::Forward => ">=",
        }
    }
}

/// Resolves target dates against the snapshots a table holds
pub struct SnapshotResolver<'a> {
    ctx: &'a QueryContext,
}

impl<'a> SnapshotResolver<'a> {
    /// Create a resolver
    pub fn new(ctx: &'a QueryContext) -> Self {
        Self { ctx }
    }

    /// Greatest snapshot on or before `target`, or `target` when none exists
    pub async fn resolve_backward(
        &self,
        target: NaiveDate,
        table: &TableSchema,
    ) -> Result<NaiveDate> {
        self.resolve(target, table, Direction::Backward).await
    }

    /// Least snapshot on or after `target`, or `target` when none exists
    pub async fn resolve_forward(
        &self,
        target: NaiveDate,
        table: &TableSchema,
    ) -> Result<NaiveDate> {
        self.resolve(target, table, Direction::Forward).await
    }

    /// Resolve in either direction
    ///
    /// Store failures propagate. A missing or unreadable snapshot degrades
    /// to the target date with a warning.
    pub async fn resolve(
        &self,
        target: NaiveDate,
        table: &TableSchema,
        direction: Direction,
    ) -> Result<NaiveDate> {
        let column = table.date_column();
        let query = QueryBuilder::new(table.name())
            .select_as(format!("{}({})", direction.aggregate(), column), "snapshot")
            .where_date(table, direction.comparison(), "target", target)
            .build();
        let key = format!(
            "snapshot:{}:{}:{}",
            table.name(),
            direction.as_str(),
            target
        );

        let result = self
            .ctx
            .fetch(&query, Some(key), self.ctx.ttls().snapshot)
            .await?;

        let resolved = result
            .value(0, "snapshot")
            .and_then(|v| as_date(v, table.date_encoding()));

        match resolved {
            Some(date) => {
                tracing::debug!(
                    table = table.name(),
                    direction = direction.as_str(),
                    %target,
                    %date,
                    "snapshot resolved"
                );
                Ok(date)
            }
            None => {
                tracing::warn!(
                    table = table.name(),
                    direction = direction.as_str(),
                    %target,
                    "no snapshot found, using target date"
                );
                Ok(target)
            }
        }
    }
}
