//! Report generation
//!
//! Turns the EDA summary and model comparison into prose. Uses the local
//! text model when the handle can provide one; otherwise degrades to a
//! deterministic template assembled from the structured results. The
//! fallback is total: it cannot fail, only shrink.

mod text_model;

pub use text_model::{ModelHandle, OllamaModel, TextModel, DEFAULT_MODEL_ID, MODEL_ENV_VAR};

use crate::eda::EdaSummary;
use crate::training::ComparisonRow;
use std::sync::Arc;

/// Maximum prompt length, in characters, submitted to the text model
pub const MAX_PROMPT_CHARS: usize = 4000;

/// Fallback columns listed in the missing-values line
const TOP_MISSING_LIMIT: usize = 5;

/// Comparison rows embedded in the model prompt
const PROMPT_COMPARISON_ROWS: usize = 5;

const NEXT_STEPS: &str = "Next steps: try feature engineering (interactions, binning), \
handle missing values carefully, and tune the best model's hyperparameters.";

const APOLOGY: &str = "The pipeline completed but no explanation could be generated. \
Inspect the structured EDA and comparison results directly.";

/// Generates the run's explanation text
pub struct ReportGenerator {
    handle: Arc<ModelHandle>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator {
    /// Generator backed by the environment-configured local model
    pub fn new() -> Self {
        Self {
            handle: Arc::new(ModelHandle::from_env()),
        }
    }

    /// Generator backed by an explicit handle (tests inject stubs here)
    pub fn with_handle(handle: Arc<ModelHandle>) -> Self {
        Self { handle }
    }

    /// Produce the report. Total: every failure path degrades to the
    /// template, and the template itself cannot fail.
    pub fn generate(&self, eda: Option<&EdaSummary>, comparison: &[ComparisonRow]) -> String {
        if let Some(model) = self.handle.acquire() {
            let prompt = truncate_prompt(build_prompt(eda, comparison));
            match model.generate(&prompt) {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) => {
                    tracing::warn!("local model returned empty text, using fallback report");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "local model generation failed, using fallback report");
                }
            }
        }
        fallback_report(eda, comparison)
    }
}

fn build_prompt(eda: Option<&EdaSummary>, comparison: &[ComparisonRow]) -> String {
    let eda_json = eda
        .and_then(|summary| serde_json::to_string(summary).ok())
        .unwrap_or_else(|| "{}".to_string());
    let top_rows: Vec<&ComparisonRow> = comparison.iter().take(PROMPT_COMPARISON_ROWS).collect();
    let comparison_json = serde_json::to_string(&top_rows).unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are an expert data scientist. The user ran an automated model \
comparison on a classification dataset.\n\
Provide a plain-English explanation that covers:\n\
1) What the EDA indicates (data shape, class balance, major missing values)\n\
2) Which model ranked best (include top metrics)\n\
3) Why this model might have performed best (consider model family, class balance, feature types)\n\
4) Actionable next steps (feature engineering, data augmentation, threshold tuning)\n\n\
Here is the EDA summary: {eda_json}\n\n\
Here is the model comparison (top {PROMPT_COMPARISON_ROWS}): {comparison_json}\n\
Write the explanation in 5-8 short paragraphs.\n"
    )
}

fn truncate_prompt(prompt: String) -> String {
    if prompt.chars().count() <= MAX_PROMPT_CHARS {
        prompt
    } else {
        prompt.chars().take(MAX_PROMPT_CHARS).collect()
    }
}

/// Deterministic template report.
///
/// Ordered best-effort sub-steps; each contributes a paragraph only when its
/// input is present, and the advice block is always appended, so the result
/// is never empty.
pub fn fallback_report(eda: Option<&EdaSummary>, comparison: &[ComparisonRow]) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(summary) = eda {
        let (rows, cols) = summary.shape;
        parts.push(format!("The dataset has {rows} rows and {cols} columns."));

        if let Some(balance) = &summary.target_balance {
            if !balance.is_empty() {
                let pairs: Vec<String> = balance
                    .iter()
                    .map(|(label, count)| format!("{label}: {count}"))
                    .collect();
                parts.push(format!("Target class distribution: {}", pairs.join(", ")));
            }
        }

        let top = top_missing(summary);
        if !top.is_empty() {
            let pairs: Vec<String> = top
                .iter()
                .map(|(column, count)| format!("{column}({count})"))
                .collect();
            parts.push(format!(
                "Columns with most missing values: {}",
                pairs.join(", ")
            ));
        }
    }

    match comparison.first() {
        Some(best) => parts.push(format!(
            "{} ranked best in the model comparison based on held-out validation metrics.",
            best.model_name
        )),
        None => parts.push(
            "Multiple models were compared and the best-performing model was selected.".to_string(),
        ),
    }

    parts.push(NEXT_STEPS.to_string());

    let report = parts.join("\n\n");
    if report.trim().is_empty() {
        APOLOGY.to_string()
    } else {
        report
    }
}

/// Up to five columns by descending missing count. The take happens before
/// zero-count columns are dropped, and the sort is stable, so ties keep the
/// summary's original column order.
fn top_missing(summary: &EdaSummary) -> Vec<(String, usize)> {
    let mut pairs = summary.missing_values.clone();
    pairs.sort_by(|a, b| b.1.cmp(&a.1));
    pairs.truncate(TOP_MISSING_LIMIT);
    pairs.retain(|(_, count)| *count > 0);
    pairs
}

#[cfg(test)]
mod tests {
    use super::text_model::test_support::StubModel;
    use super::*;
    use crate::error::DatasageError;
    use std::collections::HashMap;

    fn summary_with_missing(missing: Vec<(&str, usize)>) -> EdaSummary {
        let columns: Vec<String> = missing.iter().map(|(name, _)| name.to_string()).collect();
        EdaSummary {
            shape: (100, columns.len()),
            columns: columns.clone(),
            missing_values: missing
                .into_iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect(),
            dtypes: columns.iter().map(|c| (c.clone(), "f64".to_string())).collect(),
            target_balance: None,
        }
    }

    fn one_row(name: &str) -> Vec<ComparisonRow> {
        vec![ComparisonRow {
            model_name: name.to_string(),
            metrics: HashMap::from([("accuracy".to_string(), 0.9)]),
            training_time_secs: 0.1,
        }]
    }

    #[test]
    fn test_primary_path_uses_model_output() {
        let handle = Arc::new(ModelHandle::preloaded(Arc::new(StubModel {
            output: Ok("model-written report".to_string()),
        })));
        let generator = ReportGenerator::with_handle(handle);
        let report = generator.generate(None, &one_row("Logistic Regression"));
        assert_eq!(report, "model-written report");
    }

    #[test]
    fn test_generation_failure_falls_back() {
        let handle = Arc::new(ModelHandle::preloaded(Arc::new(StubModel {
            output: Err(DatasageError::ReportError("oom".to_string())),
        })));
        let generator = ReportGenerator::with_handle(handle);
        let report = generator.generate(None, &one_row("Logistic Regression"));
        assert!(report.contains("Logistic Regression ranked best"));
        assert!(report.contains("Next steps"));
    }

    #[test]
    fn test_unavailable_model_falls_back() {
        let generator = ReportGenerator::with_handle(Arc::new(ModelHandle::unavailable()));
        let report = generator.generate(None, &[]);
        assert!(!report.trim().is_empty());
    }

    #[test]
    fn test_fallback_never_empty_on_empty_inputs() {
        let report = fallback_report(None, &[]);
        assert!(!report.trim().is_empty());
        assert!(report.contains("best-performing model"));
    }

    #[test]
    fn test_fallback_lists_at_most_five_missing_columns() {
        let summary = summary_with_missing(vec![
            ("a", 7),
            ("b", 9),
            ("c", 9),
            ("d", 1),
            ("e", 4),
            ("f", 12),
            ("g", 2),
        ]);
        let report = fallback_report(Some(&summary), &[]);

        // Descending by count; b before c on the tie (original order)
        assert!(report.contains("f(12), b(9), c(9), a(7), e(4)"));
        assert!(!report.contains("g(2)"));
        assert!(!report.contains("d(1)"));
    }

    #[test]
    fn test_fallback_omits_zero_count_columns_inside_top_five() {
        let summary = summary_with_missing(vec![("a", 3), ("b", 0), ("c", 0), ("d", 0), ("e", 0)]);
        let report = fallback_report(Some(&summary), &[]);
        assert!(report.contains("Columns with most missing values: a(3)"));
        assert!(!report.contains("b(0)"));
    }

    #[test]
    fn test_fallback_reports_shape_and_balance() {
        let mut summary = summary_with_missing(vec![("age", 0), ("income", 3), ("label", 0)]);
        summary.target_balance = Some(vec![("0".to_string(), 60), ("1".to_string(), 40)]);
        let report = fallback_report(Some(&summary), &one_row("Gaussian Naive Bayes"));

        assert!(report.contains("100 rows and 3 columns"));
        assert!(report.contains("Target class distribution: 0: 60, 1: 40"));
        assert!(report.contains("income(3)"));
        assert!(report.contains("Gaussian Naive Bayes"));
    }

    #[test]
    fn test_prompt_is_truncated() {
        let columns: Vec<String> = (0..600).map(|i| format!("column_{i}")).collect();
        let summary = EdaSummary {
            shape: (10, columns.len()),
            columns: columns.clone(),
            missing_values: columns.iter().map(|c| (c.clone(), 1)).collect(),
            dtypes: columns.iter().map(|c| (c.clone(), "f64".to_string())).collect(),
            target_balance: None,
        };
        let prompt = truncate_prompt(build_prompt(Some(&summary), &[]));
        assert!(prompt.chars().count() <= MAX_PROMPT_CHARS);
    }
}
