//! Top-N + Others consolidation
//!
//! Small, chart-friendly result sets keep the largest groups of the current
//! period and merge the long tail into one synthetic `Others` bucket. Which
//! groups are kept is always decided by the current period; the comparison
//! period is folded against that same set.
//!
//! A real group carrying the [`OTHERS_LABEL`] is never kept by name when
//! consolidating; it folds into the bucket so every returned label is unique.

use std::collections::HashSet;

use crate::measure::Aggregation;

/// Groups kept verbatim when consolidating
pub const TOP_N: usize = 11;

/// Largest requested limit that consolidates
pub const SMALL_LIMIT: usize = 12;

/// Groups fetched when consolidating, so the tail can be merged
pub const CONSOLIDATION_FETCH: usize = 100;

/// Label of the consolidated bucket
pub const OTHERS_LABEL: &str = "Others";

/// Whether a requested limit takes the consolidation path
pub fn consolidates(limit: usize) -> bool {
    limit <= SMALL_LIMIT
}

/// Number of groups to fetch for a requested limit
pub fn effective_limit(limit: usize) -> usize {
    if consolidates(limit) {
        CONSOLIDATION_FETCH
    } else {
        limit
    }
}

/// One group's main value and auxiliary results in one period
#[derive(Debug, Clone, PartialEq)]
pub struct GroupValues {
    /// Group label
    pub group: String,
    /// Main aggregate
    pub value: f64,
    /// Auxiliary results
    pub results: Vec<f64>,
}

impl GroupValues {
    /// Create group values
    pub fn new(group: impl Into<String>, value: f64, results: Vec<f64>) -> Self {
        Self {
            group: group.into(),
            value,
            results,
        }
    }
}

/// How each column folds into `Others`
///
/// Extrema keep the extreme value; every other aggregation is summed.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRule {
    value: Aggregation,
    results: Vec<Aggregation>,
}

impl MergeRule {
    /// Create a rule from the main and auxiliary aggregations
    pub fn new(value: Aggregation, results: Vec<Aggregation>) -> Self {
        Self { value, results }
    }

    /// Merge rows into one bucket; `None` when there is nothing to merge
    pub fn merge<'a>(
        &self,
        label: &str,
        rows: impl IntoIterator<Item = &'a GroupValues>,
    ) -> Option<GroupValues> {
        let mut merged: Option<GroupValues> = None;
        for row in rows {
            match merged.as_mut() {
                None => {
                    let mut first = row.clone();
                    first.group = label.to_string();
                    first.results.resize(self.results.len(), 0.0);
                    merged = Some(first);
                }
                Some(acc) => {
                    acc.value = combine(self.value, acc.value, row.value);
                    for (i, agg) in self.results.iter().enumerate() {
                        let x = row.results.get(i).copied().unwrap_or(0.0);
                        acc.results[i] = combine(*agg, acc.results[i], x);
                    }
                }
            }
        }
        merged
    }
}

fn combine(aggregation: Aggregation, acc: f64, x: f64) -> f64 {
    match aggregation {
        Aggregation::Min => acc.min(x),
        Aggregation::Max => acc.max(x),
        _ => acc + x,
    }
}

/// Labels of the `n` largest groups by main value
///
/// Ties break on the label so the choice is stable across calls.
pub fn top_groups(rows: &[GroupValues], n: usize) -> Vec<String> {
    let mut ranked: Vec<&GroupValues> = rows.iter().collect();
    ranked.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.group.cmp(&b.group))
    });
    ranked.into_iter().take(n).map(|r| r.group.clone()).collect()
}

/// Split a period's rows into kept groups and the merged remainder
pub fn fold_others(
    rows: &[GroupValues],
    keep: &HashSet<&str>,
    rule: &MergeRule,
) -> (Vec<GroupValues>, Option<GroupValues>) {
    let (kept, rest): (Vec<&GroupValues>, Vec<&GroupValues>) =
        rows.iter().partition(|r| keep.contains(r.group.as_str()));
    let others = rule.merge(OTHERS_LABEL, rest);
    (kept.into_iter().cloned().collect(), others)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_rule() -> MergeRule {
        MergeRule::new(Aggregation::Sum, vec![Aggregation::Max])
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(effective_limit(1), 100);
        assert_eq!(effective_limit(12), 100);
        assert_eq!(effective_limit(13), 13);
        assert_eq!(effective_limit(500), 500);
        assert!(consolidates(12));
        assert!(!consolidates(13));
    }

    #[test]
    fn test_top_groups_ranks_by_value() {
        let rows = vec![
            GroupValues::new("a", 1.0, vec![]),
            GroupValues::new("b", 3.0, vec![]),
            GroupValues::new("c", 2.0, vec![]),
            GroupValues::new("d", 3.0, vec![]),
        ];
        assert_eq!(top_groups(&rows, 3), vec!["b", "d", "c"]);
        assert_eq!(top_groups(&rows, 10).len(), 4);
    }

    #[test]
    fn test_merge_rule() {
        let rows = [
            GroupValues::new("x", 10.0, vec![5.0]),
            GroupValues::new("y", 2.0, vec![9.0]),
        ];
        let merged = sum_rule().merge("Others", rows.iter()).unwrap();
        assert_eq!(merged.group, "Others");
        assert_eq!(merged.value, 12.0);
        assert_eq!(merged.results, vec![9.0]);

        let min_rule = MergeRule::new(Aggregation::Min, vec![]);
        assert_eq!(min_rule.merge("Others", rows.iter()).unwrap().value, 2.0);

        assert!(sum_rule().merge("Others", std::iter::empty()).is_none());
    }

    #[test]
    fn test_fold_others() {
        let rows = vec![
            GroupValues::new("a", 5.0, vec![1.0]),
            GroupValues::new("b", 4.0, vec![2.0]),
            GroupValues::new("c", 3.0, vec![3.0]),
        ];
        let keep: HashSet<&str> = ["a"].into_iter().collect();
        let (kept, others) = fold_others(&rows, &keep, &sum_rule());

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].group, "a");
        let others = others.unwrap();
        assert_eq!(others.value, 7.0);
        assert_eq!(others.results, vec![3.0]);
    }
}
