//! Lenient conversions from result cells
//!
//! Aggregated cells are read leniently: anything that is not a number (or a
//! string holding one) reads as zero. ClickHouse quotes 64-bit integers in
//! JSON output, so numeric strings are the common case, not the exception.

use chrono::NaiveDate;
use serde_json::Value;

use crate::schema::DateEncoding;

/// Read a cell as a number, zero when it is not one
pub fn as_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Read a cell as a group label
pub fn as_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Read a cell as a date in the given encoding
pub fn as_date(value: &Value, encoding: DateEncoding) -> Option<NaiveDate> {
    match value {
        Value::String(s) => encoding.parse(s),
        Value::Number(n) => encoding.parse(&n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_number() {
        assert_eq!(as_number(&json!(12.5)), 12.5);
        assert_eq!(as_number(&json!("18446744073709551615")), 18446744073709551615.0);
        assert_eq!(as_number(&json!(" 42 ")), 42.0);
        assert_eq!(as_number(&json!("n/a")), 0.0);
        assert_eq!(as_number(&json!("nan")), 0.0);
        assert_eq!(as_number(&json!(null)), 0.0);
        assert_eq!(as_number(&json!(true)), 1.0);
    }

    #[test]
    fn test_as_label() {
        assert_eq!(as_label(&json!("EQ")), "EQ");
        assert_eq!(as_label(&json!(7)), "7");
        assert_eq!(as_label(&json!(null)), "");
    }

    #[test]
    fn test_as_date() {
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1);
        assert_eq!(as_date(&json!("2024-02-01"), DateEncoding::Calendar), feb);
        assert_eq!(as_date(&json!("20240201"), DateEncoding::Compact), feb);
        assert_eq!(as_date(&json!(20240201), DateEncoding::Compact), feb);
        assert_eq!(as_date(&json!(null), DateEncoding::Calendar), None);
    }
}
