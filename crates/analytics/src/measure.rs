//! Measures: what to aggregate and how
//!
//! A [`MeasureSpec`] is one aggregate column. [`GroupMeasureSpec`] adds up to
//! three auxiliary result slots computed in the same GROUP BY pass, plus the
//! ordering and limit of the grouped result.

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::schema::TableSchema;

/// Maximum auxiliary result slots of a grouped measure
pub const MAX_RESULTS: usize = 3;

/// Default grouped result limit (chart-friendly)
pub const DEFAULT_LIMIT: usize = 12;

/// Aggregation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Aggregation {
    /// Sum of values
    Sum,
    /// Count of non-null values
    Count,
    /// Arithmetic mean
    Avg,
    /// Minimum
    Min,
    /// Maximum
    Max,
    /// Exact count of distinct values
    CountDistinct,
    /// `sum(value * weight) / sum(weight)`
    WeightedAvg,
}

impl Aggregation {
    /// Whether the source field is coerced to a number
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Count | Self::CountDistinct)
    }
}

/// One aggregate column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureSpec {
    /// Source field
    pub field: String,
    /// Aggregation function
    pub aggregation: Aggregation,
    /// Weight field, required by `weightedAvg`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_field: Option<String>,
}

impl MeasureSpec {
    /// Create a measure
    pub fn new(field: impl Into<String>, aggregation: Aggregation) -> Self {
        Self {
            field: field.into(),
            aggregation,
            weight_field: None,
        }
    }

    /// Sum of a field
    pub fn sum(field: impl Into<String>) -> Self {
        Self::new(field, Aggregation::Sum)
    }

    /// Weighted average of a field
    pub fn weighted_avg(field: impl Into<String>, weight_field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            aggregation: Aggregation::WeightedAvg,
            weight_field: Some(weight_field.into()),
        }
    }

    /// Check fields against the table and the weight requirement
    pub fn validate(&self, schema: &TableSchema) -> Result<()> {
        schema.field(&self.field)?;
        if self.aggregation == Aggregation::WeightedAvg {
            match &self.weight_field {
                Some(weight) => {
                    schema.field(weight)?;
                }
                None => return Err(AnalyticsError::MissingWeightField(self.field.clone())),
            }
        }
        Ok(())
    }

    /// Aggregate expression
    ///
    /// Numeric aggregates read the field through `toFloat64OrZero` so that
    /// a malformed cell counts as zero instead of failing the query.
    /// Call [`validate`](Self::validate) first.
    pub fn sql_expr(&self) -> String {
        let field = self.field.as_str();
        match self.aggregation {
            Aggregation::Sum => format!("sum({})", numeric(field)),
            Aggregation::Avg => format!("avg({})", numeric(field)),
            Aggregation::Min => format!("min({})", numeric(field)),
            Aggregation::Max => format!("max({})", numeric(field)),
            Aggregation::Count => format!("count({})", field),
            Aggregation::CountDistinct => format!("uniqExact({})", field),
            Aggregation::WeightedAvg => {
                let weight = numeric(self.weight_field.as_deref().unwrap_or(field));
                format!(
                    "ifNull(sum({} * {}) / nullIf(sum({}), 0), 0)",
                    numeric(field),
                    weight,
                    weight
                )
            }
        }
    }
}

fn numeric(field: &str) -> String {
    format!("toFloat64OrZero(toString({}))", field)
}

/// Column a grouped result is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    /// Main aggregate
    #[default]
    Value,
    /// First result slot
    Result1,
    /// Second result slot
    Result2,
    /// Third result slot
    Result3,
    /// Group label
    Group,
}

impl OrderBy {
    /// Column alias in the grouped query
    pub fn column(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Result1 => "result1",
            Self::Result2 => "result2",
            Self::Result3 => "result3",
            Self::Group => "group_key",
        }
    }

    /// Result slot index, if ordering by one
    pub fn result_slot(&self) -> Option<usize> {
        match self {
            Self::Result1 => Some(0),
            Self::Result2 => Some(1),
            Self::Result3 => Some(2),
            Self::Value | Self::Group => None,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Ascending
    Asc,
    /// Descending
    #[default]
    Desc,
}

impl OrderDirection {
    /// SQL keyword
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

/// A grouped measure with auxiliary results
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMeasureSpec {
    /// Source table
    pub table: String,
    /// Main aggregate
    #[serde(flatten)]
    pub measure: MeasureSpec,
    /// Auxiliary aggregates (`result1..result3`)
    #[serde(default)]
    pub results: Vec<MeasureSpec>,
    /// Ordering column
    #[serde(default)]
    pub order_by: OrderBy,
    /// Ordering direction
    #[serde(default)]
    pub order_direction: OrderDirection,
    /// Requested number of groups
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl GroupMeasureSpec {
    /// Create a grouped measure with default ordering and limit
    pub fn new(table: impl Into<String>, measure: MeasureSpec) -> Self {
        Self {
            table: table.into(),
            measure,
            results: Vec::new(),
            order_by: OrderBy::default(),
            order_direction: OrderDirection::default(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Add an auxiliary result slot
    pub fn with_result(mut self, result: MeasureSpec) -> Self {
        self.results.push(result);
        self
    }

    /// Set ordering
    pub fn with_order(mut self, order_by: OrderBy, direction: OrderDirection) -> Self {
        self.order_by = order_by;
        self.order_direction = direction;
        self
    }

    /// Set the requested limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Validate every measure and the ordering against the table
    pub fn validate(&self, schema: &TableSchema) -> Result<()> {
        if self.results.len() > MAX_RESULTS {
            return Err(AnalyticsError::TooManyResults(self.results.len()));
        }
        self.measure.validate(schema)?;
        for result in &self.results {
            result.validate(schema)?;
        }
        if let Some(slot) = self.order_by.result_slot()
            && slot >= self.results.len()
        {
            return Err(AnalyticsError::InvalidRequest(format!(
                "cannot order by {} with {} result slot(s)",
                self.order_by.column(),
                self.results.len()
            )));
        }
        if self.limit == 0 {
            return Err(AnalyticsError::OutOfRange("limit must be positive".to_string()));
        }
        Ok(())
    }
}

/// A measure with the name it is reported under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedMeasure {
    /// Report name
    pub name: String,
    /// Aggregate
    #[serde(flatten)]
    pub measure: MeasureSpec,
}

impl NamedMeasure {
    /// Create a named measure
    pub fn new(name: impl Into<String>, measure: MeasureSpec) -> Self {
        Self {
            name: name.into(),
            measure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DateEncoding, FieldKind};

    fn positions() -> TableSchema {
        TableSchema::new("positions", "as_of_date", DateEncoding::Calendar)
            .with_field("desk", FieldKind::Text)
            .with_field("amount", FieldKind::Number)
            .with_field("rate", FieldKind::Number)
            .with_field("notional", FieldKind::Number)
    }

    #[test]
    fn test_sql_exprs() {
        assert_eq!(
            MeasureSpec::sum("amount").sql_expr(),
            "sum(toFloat64OrZero(toString(amount)))"
        );
        assert_eq!(
            MeasureSpec::new("desk", Aggregation::Count).sql_expr(),
            "count(desk)"
        );
        assert_eq!(
            MeasureSpec::new("desk", Aggregation::CountDistinct).sql_expr(),
            "uniqExact(desk)"
        );
        assert_eq!(
            MeasureSpec::weighted_avg("rate", "notional").sql_expr(),
            "ifNull(sum(toFloat64OrZero(toString(rate)) * toFloat64OrZero(toString(notional))) \
             / nullIf(sum(toFloat64OrZero(toString(notional))), 0), 0)"
        );
    }

    #[test]
    fn test_weighted_avg_requires_weight() {
        let measure = MeasureSpec::new("rate", Aggregation::WeightedAvg);
        assert!(matches!(
            measure.validate(&positions()),
            Err(AnalyticsError::MissingWeightField(f)) if f == "rate"
        ));
        assert!(MeasureSpec::weighted_avg("rate", "notional")
            .validate(&positions())
            .is_ok());
        assert!(matches!(
            MeasureSpec::weighted_avg("rate", "bogus").validate(&positions()),
            Err(AnalyticsError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_group_measure_validation() {
        let schema = positions();
        let spec = GroupMeasureSpec::new("positions", MeasureSpec::sum("amount"));
        assert!(spec.validate(&schema).is_ok());

        let too_many = (0..4).fold(spec.clone(), |s, _| s.with_result(MeasureSpec::sum("amount")));
        assert!(matches!(
            too_many.validate(&schema),
            Err(AnalyticsError::TooManyResults(4))
        ));

        let bad_result = spec
            .clone()
            .with_result(MeasureSpec::new("rate", Aggregation::WeightedAvg));
        assert!(matches!(
            bad_result.validate(&schema),
            Err(AnalyticsError::MissingWeightField(_))
        ));

        let bad_order = spec
            .clone()
            .with_order(OrderBy::Result2, OrderDirection::Asc)
            .with_result(MeasureSpec::sum("amount"));
        assert!(matches!(
            bad_order.validate(&schema),
            Err(AnalyticsError::InvalidRequest(_))
        ));

        assert!(spec.with_limit(0).validate(&schema).is_err());
    }

    #[test]
    fn test_group_measure_serde() {
        let spec: GroupMeasureSpec = serde_json::from_str(
            r#"{
                "table": "positions",
                "field": "rate",
                "aggregation": "weightedAvg",
                "weightField": "notional",
                "results": [{"field": "desk", "aggregation": "countDistinct"}],
                "orderBy": "result1",
                "orderDirection": "asc"
            }"#,
        )
        .unwrap();

        assert_eq!(spec.measure, MeasureSpec::weighted_avg("rate", "notional"));
        assert_eq!(spec.results[0].aggregation, Aggregation::CountDistinct);
        assert_eq!(spec.order_by, OrderBy::Result1);
        assert_eq!(spec.order_direction, OrderDirection::Asc);
        assert_eq!(spec.limit, DEFAULT_LIMIT);
    }
}
