//! Exploratory data analysis
//!
//! Structural summaries of a table: shape, column names, missing-value
//! counts, dtype names, and (when a target column is given) class balance.

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Structural summary of a table.
///
/// Field order is part of the contract: `missing_values` and `dtypes` follow
/// the table's column order, and `target_balance` is sorted by descending
/// count with first-seen order breaking ties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdaSummary {
    /// (rows, columns)
    pub shape: (usize, usize),
    /// Column names in table order
    pub columns: Vec<String>,
    /// Per-column missing-value counts, in table order
    pub missing_values: Vec<(String, usize)>,
    /// Per-column dtype names, in table order
    pub dtypes: Vec<(String, String)>,
    /// Count of rows per distinct target value; present only when a target
    /// was supplied and names an actual column
    pub target_balance: Option<Vec<(String, usize)>>,
}

impl EdaSummary {
    /// Missing-value count for a column, if the column exists
    pub fn missing_count(&self, column: &str) -> Option<usize> {
        self.missing_values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, count)| *count)
    }
}

/// Summarize a table.
///
/// Pure: the input frame is never mutated. A `target` that does not name a
/// column is ignored here rather than rejected; target validity is enforced
/// by the trainer, which is the stage that actually needs it.
pub fn summarize(df: &DataFrame, target: Option<&str>) -> Result<EdaSummary> {
    let columns: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut missing_values = Vec::with_capacity(columns.len());
    let mut dtypes = Vec::with_capacity(columns.len());
    for name in &columns {
        let column = df.column(name)?;
        missing_values.push((name.clone(), column.null_count()));
        dtypes.push((name.clone(), column.dtype().to_string()));
    }

    let target_balance = match target {
        Some(t) if columns.iter().any(|c| c == t) => Some(class_balance(df, t)?),
        _ => None,
    };

    Ok(EdaSummary {
        shape: df.shape(),
        columns,
        missing_values,
        dtypes,
        target_balance,
    })
}

/// Count rows per distinct value, descending, first-seen order on ties.
/// Nulls are counted under the label "null" so the counts always sum to the
/// row count.
fn class_balance(df: &DataFrame, target: &str) -> Result<Vec<(String, usize)>> {
    let series = df.column(target)?.as_materialized_series().clone();

    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for value in series.iter() {
        let label = label_of(&value);
        match index.get(&label) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(label.clone(), counts.len());
                counts.push((label, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(counts)
}

fn label_of(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => "null".to_string(),
        AnyValue::String(s) => (*s).to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df!(
            "age" => &[Some(31i64), Some(44), Some(28), Some(51)],
            "income" => &[Some(42_000.0), None, Some(63_500.0), None],
            "label" => &["yes", "no", "yes", "yes"]
        )
        .unwrap()
    }

    #[test]
    fn test_shape_and_columns() {
        let summary = summarize(&sample_df(), None).unwrap();
        assert_eq!(summary.shape, (4, 3));
        assert_eq!(summary.columns, vec!["age", "income", "label"]);
    }

    #[test]
    fn test_missing_counts_in_column_order() {
        let summary = summarize(&sample_df(), None).unwrap();
        assert_eq!(
            summary.missing_values,
            vec![
                ("age".to_string(), 0),
                ("income".to_string(), 2),
                ("label".to_string(), 0),
            ]
        );
        assert_eq!(summary.missing_count("income"), Some(2));
        assert_eq!(summary.missing_count("nope"), None);
    }

    #[test]
    fn test_balance_sums_to_row_count() {
        let summary = summarize(&sample_df(), Some("label")).unwrap();
        let balance = summary.target_balance.unwrap();
        assert_eq!(balance.iter().map(|(_, n)| n).sum::<usize>(), 4);
        assert_eq!(balance[0], ("yes".to_string(), 3));
        assert_eq!(balance[1], ("no".to_string(), 1));
    }

    #[test]
    fn test_unknown_target_is_ignored() {
        let summary = summarize(&sample_df(), Some("not_a_column")).unwrap();
        assert!(summary.target_balance.is_none());
    }

    #[test]
    fn test_balance_tie_keeps_first_seen_order() {
        let df = df!(
            "label" => &["b", "a", "b", "a"]
        )
        .unwrap();
        let summary = summarize(&df, Some("label")).unwrap();
        let balance = summary.target_balance.unwrap();
        assert_eq!(balance[0].0, "b");
        assert_eq!(balance[1].0, "a");
    }

    #[test]
    fn test_null_target_values_are_counted() {
        let df = df!(
            "label" => &[Some("x"), None, Some("x")]
        )
        .unwrap();
        let summary = summarize(&df, Some("label")).unwrap();
        let balance = summary.target_balance.unwrap();
        assert_eq!(balance.iter().map(|(_, n)| n).sum::<usize>(), 3);
        assert!(balance.iter().any(|(label, n)| label == "null" && *n == 1));
    }
}
