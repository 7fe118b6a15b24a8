//! Tests for result data types

use chrono::NaiveDate;

use crate::series::{Comparison, GroupedRow, ResultValue, StatMetric, cumulate};

fn month(m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
}

#[test]
fn test_comparison_increase() {
    let comp = Comparison::between(150.0, 100.0);
    assert_eq!(comp.change, 50.0);
    assert!((comp.change_percent - 50.0).abs() < 0.001);
}

#[test]
fn test_comparison_decrease() {
    let comp = Comparison::between(75.0, 100.0);
    assert_eq!(comp.change, -25.0);
    assert!((comp.change_percent - (-25.0)).abs() < 0.001);
}

#[test]
fn test_comparison_zero_previous_is_zero_percent() {
    for current in [0.0, 1.0, 100.0, -5.0, 1e12] {
        let comp = Comparison::between(current, 0.0);
        assert_eq!(comp.change_percent, 0.0);
        assert!(comp.change_percent.is_finite());
        assert_eq!(comp.change, current);
    }
}

#[test]
fn test_grouped_row() {
    let row = GroupedRow::new("EQ", 50.0, 40.0, vec![ResultValue::default()], 200.0);
    assert_eq!(row.change, 10.0);
    assert!((row.change_percent - 25.0).abs() < 0.001);
    assert!((row.percentage_of_total - 25.0).abs() < 0.001);
    assert!(!row.is_others);
    assert!(row.into_others().is_others);
}

#[test]
fn test_grouped_row_zero_total() {
    let row = GroupedRow::new("EQ", 0.0, 0.0, Vec::new(), 0.0);
    assert_eq!(row.percentage_of_total, 0.0);
    assert_eq!(row.change_percent, 0.0);
}

#[test]
fn test_grouped_row_serializes_camel_case() {
    let row = GroupedRow::new("EQ", 50.0, 0.0, Vec::new(), 100.0);
    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["changePercent"], 0.0);
    assert_eq!(json["percentageOfTotal"], 50.0);
    assert_eq!(json["isOthers"], false);
}

#[test]
fn test_stat_metric_flattens() {
    let metric = StatMetric {
        name: "exposure".to_string(),
        comparison: Comparison::between(10.0, 5.0),
    };
    let json = serde_json::to_value(&metric).unwrap();
    assert_eq!(json["name"], "exposure");
    assert_eq!(json["current"], 10.0);
    assert_eq!(json["changePercent"], 100.0);
}

#[test]
fn test_cumulate_remaining() {
    let points = cumulate(&[(month(1), 100.0), (month(2), 50.0), (month(3), 25.0)]);

    assert_eq!(points.len(), 3);
    assert_eq!(points[0].cumulative, 100.0);
    assert_eq!(points[0].remaining, 75.0);
    assert_eq!(points[1].cumulative, 150.0);
    assert_eq!(points[1].remaining, 25.0);
    assert_eq!(points[2].cumulative, 175.0);
    assert_eq!(points[2].remaining, 0.0);
}

#[test]
fn test_cumulate_empty() {
    assert!(cumulate(&[]).is_empty());
}
