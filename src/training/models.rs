//! Evaluation metrics shared by the candidate models

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for classifier evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Fraction of correct predictions
    pub accuracy: Option<f64>,
    /// Area under the ROC curve (binary tasks with scores only)
    pub auc: Option<f64>,
    /// Macro-averaged recall
    pub recall: Option<f64>,
    /// Macro-averaged precision
    pub precision: Option<f64>,
    /// Macro-averaged F1 score
    pub f1: Option<f64>,
    /// Training time in seconds
    pub training_time_secs: f64,
    /// Number of features
    pub n_features: usize,
    /// Number of training samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self {
            accuracy: None,
            auc: None,
            recall: None,
            precision: None,
            f1: None,
            training_time_secs: 0.0,
            n_features: 0,
            n_samples: 0,
        }
    }

    /// Compute classification metrics.
    ///
    /// Precision, recall, and F1 are macro-averaged over the classes
    /// `0..n_classes`. AUC is filled in only for binary tasks where the model
    /// produced positive-class scores.
    pub fn compute_classification(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_score: Option<&Array1<f64>>,
        n_classes: usize,
    ) -> Self {
        let mut metrics = Self::new();
        metrics.n_samples = y_true.len();

        if y_true.is_empty() {
            return metrics;
        }

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (**t - **p).abs() < 0.5)
            .count();
        metrics.accuracy = Some(correct as f64 / y_true.len() as f64);

        let mut precision_sum = 0.0;
        let mut recall_sum = 0.0;
        for class in 0..n_classes {
            let c = class as f64;
            let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
            for (t, p) in y_true.iter().zip(y_pred.iter()) {
                let is_true = (*t - c).abs() < 0.5;
                let is_pred = (*p - c).abs() < 0.5;
                match (is_true, is_pred) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            precision_sum += if tp + fp > 0 {
                tp as f64 / (tp + fp) as f64
            } else {
                0.0
            };
            recall_sum += if tp + fn_ > 0 {
                tp as f64 / (tp + fn_) as f64
            } else {
                0.0
            };
        }

        let k = n_classes.max(1) as f64;
        let precision = precision_sum / k;
        let recall = recall_sum / k;
        metrics.precision = Some(precision);
        metrics.recall = Some(recall);
        metrics.f1 = Some(if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        });

        if n_classes == 2 {
            if let Some(scores) = y_score {
                metrics.auc = roc_auc(y_true, scores);
            }
        }

        metrics
    }
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Rank-based AUC estimate (Mann-Whitney), with average ranks for tied
/// scores. Returns `None` when only one class is present.
fn roc_auc(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Option<f64> {
    let n = y_true.len();
    if n == 0 || y_score.len() != n {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        y_score[a]
            .partial_cmp(&y_score[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Assign average ranks across runs of equal scores
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t > 0.5)
        .map(|(_, &r)| r)
        .sum();

    let auc = (rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64;
    Some(auc)
}
