//! Comparison periods
//!
//! The comparison snapshot of a request is the as-of date shifted back by a
//! period, or an explicit date. Either way it is then resolved to an
//! available snapshot like the current date.

use std::fmt;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// How far back the comparison period lies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComparePeriod {
    /// One day earlier
    PreviousDay,
    /// One week earlier
    PreviousWeek,
    /// One month earlier
    #[default]
    PreviousMonth,
    /// Three months earlier
    PreviousQuarter,
    /// One year earlier
    PreviousYear,
}

impl ComparePeriod {
    /// Parse a period from string
    pub fn parse(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "previousday" | "day" | "dod" | "1d" => Ok(Self::PreviousDay),
            "previousweek" | "week" | "wow" | "1w" => Ok(Self::PreviousWeek),
            "previousmonth" | "month" | "mom" | "1m" => Ok(Self::PreviousMonth),
            "previousquarter" | "quarter" | "qoq" | "3m" => Ok(Self::PreviousQuarter),
            "previousyear" | "year" | "yoy" | "1y" => Ok(Self::PreviousYear),
            _ => Err(AnalyticsError::InvalidPeriod(s.to_string())),
        }
    }

    /// Canonical spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreviousDay => "previousDay",
            Self::PreviousWeek => "previousWeek",
            Self::PreviousMonth => "previousMonth",
            Self::PreviousQuarter => "previousQuarter",
            Self::PreviousYear => "previousYear",
        }
    }

    /// Shift a date back by this period
    ///
    /// Month arithmetic clamps to the end of shorter months
    /// (2024-03-31 minus one month is 2024-02-29).
    pub fn shift(&self, date: NaiveDate) -> Result<NaiveDate> {
        let shifted = match self {
            Self::PreviousDay => date.checked_sub_days(Days::new(1)),
            Self::PreviousWeek => date.checked_sub_days(Days::new(7)),
            Self::PreviousMonth => date.checked_sub_months(Months::new(1)),
            Self::PreviousQuarter => date.checked_sub_months(Months::new(3)),
            Self::PreviousYear => date.checked_sub_months(Months::new(12)),
        };
        shifted.ok_or_else(|| {
            AnalyticsError::OutOfRange(format!("{} before {}", self.as_str(), date))
        })
    }
}

impl TryFrom<String> for ComparePeriod {
    type Error = AnalyticsError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<ComparePeriod> for String {
    fn from(period: ComparePeriod) -> Self {
        period.as_str().to_string()
    }
}

impl fmt::Display for ComparePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target date of the comparison period, before snapshot resolution
///
/// An explicit `compare_date` wins over `period` and must not lie after the
/// as-of date.
pub fn comparison_target(
    as_of: NaiveDate,
    period: Option<ComparePeriod>,
    compare_date: Option<NaiveDate>,
) -> Result<NaiveDate> {
    match compare_date {
        Some(date) if date > as_of => Err(AnalyticsError::InvalidPeriod(format!(
            "comparison date {} is after {}",
            date, as_of
        ))),
        Some(date) => Ok(date),
        None => period.unwrap_or_default().shift(as_of),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(ComparePeriod::parse("previousMonth").unwrap(), ComparePeriod::PreviousMonth);
        assert_eq!(ComparePeriod::parse("previous_year").unwrap(), ComparePeriod::PreviousYear);
        assert_eq!(ComparePeriod::parse("QoQ").unwrap(), ComparePeriod::PreviousQuarter);
        assert_eq!(ComparePeriod::parse("1w").unwrap(), ComparePeriod::PreviousWeek);
        assert!(matches!(
            ComparePeriod::parse("fortnight"),
            Err(AnalyticsError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_serde() {
        let period: ComparePeriod = serde_json::from_str("\"previous_day\"").unwrap();
        assert_eq!(period, ComparePeriod::PreviousDay);
        assert_eq!(
            serde_json::to_string(&ComparePeriod::PreviousQuarter).unwrap(),
            "\"previousQuarter\""
        );
        assert!(serde_json::from_str::<ComparePeriod>("\"someday\"").is_err());
    }

    #[test]
    fn test_shift() {
        let d = date(2024, 3, 31);
        assert_eq!(ComparePeriod::PreviousDay.shift(d).unwrap(), date(2024, 3, 30));
        assert_eq!(ComparePeriod::PreviousWeek.shift(d).unwrap(), date(2024, 3, 24));
        assert_eq!(ComparePeriod::PreviousMonth.shift(d).unwrap(), date(2024, 2, 29));
        assert_eq!(ComparePeriod::PreviousQuarter.shift(d).unwrap(), date(2023, 12, 31));
        assert_eq!(
            ComparePeriod::PreviousYear.shift(date(2024, 2, 29)).unwrap(),
            date(2023, 2, 28)
        );
        assert_eq!(
            ComparePeriod::PreviousMonth.shift(date(2024, 1, 15)).unwrap(),
            date(2023, 12, 15)
        );
    }

    #[test]
    fn test_comparison_target() {
        let as_of = date(2024, 3, 15);
        assert_eq!(comparison_target(as_of, None, None).unwrap(), date(2024, 2, 15));
        assert_eq!(
            comparison_target(as_of, Some(ComparePeriod::PreviousYear), None).unwrap(),
            date(2023, 3, 15)
        );
        assert_eq!(
            comparison_target(as_of, Some(ComparePeriod::PreviousYear), Some(date(2024, 1, 1)))
                .unwrap(),
            date(2024, 1, 1)
        );
        assert!(comparison_target(as_of, None, Some(date(2024, 4, 1))).is_err());
    }
}
