//! Tests for filter and operator handling

use crate::filter::{Filter, Operator};

#[test]
fn test_operator_parse_display_spellings() {
    assert_eq!(Operator::parse("is"), Operator::Equals);
    assert_eq!(Operator::parse("is not"), Operator::NotEquals);
    assert_eq!(Operator::parse("is any of"), Operator::OneOf);
    assert_eq!(Operator::parse("contains"), Operator::Contains);
    assert_eq!(Operator::parse("does not contain"), Operator::NotContains);
    assert_eq!(Operator::parse("includes all"), Operator::AllOf);
    assert_eq!(Operator::parse("includes any"), Operator::AnyOf);
    assert_eq!(Operator::parse("excludes all"), Operator::NoneOf);
    assert_eq!(Operator::parse("is before"), Operator::LessThan);
    assert_eq!(Operator::parse("is after"), Operator::GreaterThan);
    assert_eq!(Operator::parse("is on or before"), Operator::LessOrEqual);
    assert_eq!(Operator::parse("is on or after"), Operator::GreaterOrEqual);
}

#[test]
fn test_operator_parse_terse_spellings() {
    assert_eq!(Operator::parse("eq"), Operator::Equals);
    assert_eq!(Operator::parse("=="), Operator::Equals);
    assert_eq!(Operator::parse("<>"), Operator::NotEquals);
    assert_eq!(Operator::parse("in"), Operator::OneOf);
    assert_eq!(Operator::parse("not_contains"), Operator::NotContains);
    assert_eq!(Operator::parse("any_of"), Operator::AnyOf);
    assert_eq!(Operator::parse("none-of"), Operator::NoneOf);
    assert_eq!(Operator::parse("<"), Operator::LessThan);
    assert_eq!(Operator::parse(">="), Operator::GreaterOrEqual);
}

#[test]
fn test_operator_parse_case_insensitive() {
    assert_eq!(Operator::parse("IS ANY OF"), Operator::OneOf);
    assert_eq!(Operator::parse("  Contains "), Operator::Contains);
}

#[test]
fn test_operator_parse_unrecognized() {
    assert_eq!(
        Operator::parse("roughly"),
        Operator::Unrecognized("roughly".to_string())
    );
    assert_eq!(Operator::parse("roughly").as_str(), "roughly");
}

#[test]
fn test_operator_serde() {
    let filter: Filter =
        serde_json::from_str(r#"{"field":"desk","operator":"is any of","values":["EQ","FX"]}"#)
            .unwrap();
    assert_eq!(filter.operator, Operator::OneOf);
    assert_eq!(filter.values, vec!["EQ", "FX"]);

    let json = serde_json::to_value(&Filter::ne("desk", "EQ")).unwrap();
    assert_eq!(json["operator"], "is not");
}

#[test]
fn test_unknown_operator_deserializes() {
    let filter: Filter =
        serde_json::from_str(r#"{"field":"desk","operator":"sounds like","values":["EQ"]}"#)
            .unwrap();
    assert!(matches!(filter.operator, Operator::Unrecognized(_)));
}

#[test]
fn test_missing_values_is_empty() {
    let filter: Filter = serde_json::from_str(r#"{"field":"desk","operator":"is"}"#).unwrap();
    assert!(filter.is_empty());
}

#[test]
fn test_filter_constructors() {
    let f = Filter::one_of("desk", ["EQ", "FX"]);
    assert_eq!(f.operator, Operator::OneOf);
    assert_eq!(f.values.len(), 2);

    assert_eq!(Filter::eq("desk", "EQ").operator, Operator::Equals);
    assert_eq!(Filter::contains("name", "bank").operator, Operator::Contains);
}

#[test]
fn test_comparison_symbol() {
    assert_eq!(Operator::LessThan.comparison_symbol(), Some("<"));
    assert_eq!(Operator::GreaterOrEqual.comparison_symbol(), Some(">="));
    assert_eq!(Operator::Equals.comparison_symbol(), None);
    assert!(Operator::AnyOf.is_substring());
    assert!(!Operator::OneOf.is_substring());
}
