//! Gaussian Naive Bayes classifier for continuous features

use crate::error::{DatasageError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Gaussian Naive Bayes Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Mean of each feature for each class
    means: HashMap<i64, Vec<f64>>,
    /// Variance of each feature for each class
    variances: HashMap<i64, Vec<f64>>,
    /// Prior probability of each class
    priors: HashMap<i64, f64>,
    /// List of classes
    classes: Vec<i64>,
    /// Smoothing parameter for variance
    var_smoothing: f64,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            means: HashMap::new(),
            variances: HashMap::new(),
            priors: HashMap::new(),
            classes: Vec::new(),
            var_smoothing: 1e-9,
        }
    }

    /// Set variance smoothing parameter
    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    /// Fit the classifier
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 {
            return Err(DatasageError::TrainingError(
                "cannot fit naive bayes on an empty training set".to_string(),
            ));
        }

        let mut class_counts: HashMap<i64, usize> = HashMap::new();
        for &label in y.iter() {
            *class_counts.entry(label as i64).or_insert(0) += 1;
        }

        self.classes = class_counts.keys().cloned().collect();
        self.classes.sort();

        for (&class, &count) in &class_counts {
            self.priors.insert(class, count as f64 / n_samples as f64);
        }

        for &class in &self.classes {
            let class_indices: Vec<usize> = y
                .iter()
                .enumerate()
                .filter(|(_, &label)| label as i64 == class)
                .map(|(i, _)| i)
                .collect();

            let n_class = class_indices.len();

            // Single-pass Welford's algorithm for mean and variance
            let mut feature_means = vec![0.0; n_features];
            let mut feature_m2 = vec![0.0; n_features];
            let mut count = 0usize;
            for &idx in &class_indices {
                count += 1;
                let row = x.row(idx);
                for (j, &val) in row.iter().enumerate() {
                    let delta = val - feature_means[j];
                    feature_means[j] += delta / count as f64;
                    let delta2 = val - feature_means[j];
                    feature_m2[j] += delta * delta2;
                }
            }
            let feature_vars: Vec<f64> = feature_m2
                .iter()
                .map(|&m2| (m2 / n_class as f64) + self.var_smoothing)
                .collect();

            self.means.insert(class, feature_means);
            self.variances.insert(class, feature_vars);
        }

        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let log_probs = self.predict_log_proba(x)?;

        Ok(log_probs
            .rows()
            .into_iter()
            .map(|row| {
                let max_idx = row
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                self.classes[max_idx] as f64
            })
            .collect())
    }

    /// Predict normalized log probabilities, one column per class
    pub fn predict_log_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.classes.is_empty() {
            return Err(DatasageError::ModelNotFitted);
        }

        let n_samples = x.nrows();
        let n_classes = self.classes.len();

        let mut log_probs = Array2::zeros((n_samples, n_classes));

        for (i, row) in x.rows().into_iter().enumerate() {
            for (j, &class) in self.classes.iter().enumerate() {
                let log_prior = self.priors[&class].ln();
                let log_likelihood = self.log_likelihood(&row.to_owned(), class);
                log_probs[[i, j]] = log_prior + log_likelihood;
            }
        }

        // Normalize (log-sum-exp trick)
        for mut row in log_probs.rows_mut() {
            let max_val = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let log_sum: f64 = row.iter().map(|&v| (v - max_val).exp()).sum::<f64>().ln();
            for val in row.iter_mut() {
                *val = *val - max_val - log_sum;
            }
        }

        Ok(log_probs)
    }

    /// Probability of the class labelled `1`, for binary AUC scoring
    pub fn positive_proba(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        let Some(pos_idx) = self.classes.iter().position(|&c| c == 1) else {
            return Ok(None);
        };
        let log_probs = self.predict_log_proba(x)?;
        Ok(Some(log_probs.column(pos_idx).mapv(|v| v.exp())))
    }

    fn log_likelihood(&self, x: &Array1<f64>, class: i64) -> f64 {
        let means = &self.means[&class];
        let vars = &self.variances[&class];

        x.iter()
            .zip(means.iter())
            .zip(vars.iter())
            .map(|((&xi, &mean), &var)| {
                // Log of Gaussian PDF
                -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln())
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_predict_two_clusters() {
        let x = array![[1.0], [1.1], [0.9], [5.0], [5.1], [4.9]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = GaussianNaiveBayes::new();
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_positive_proba_separates_clusters() {
        let x = array![[1.0], [1.2], [5.0], [5.2]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut model = GaussianNaiveBayes::new();
        model.fit(&x, &y).unwrap();

        let proba = model.positive_proba(&x).unwrap().unwrap();
        assert!(proba[0] < 0.5);
        assert!(proba[3] > 0.5);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = GaussianNaiveBayes::new();
        assert!(model.predict(&array![[1.0]]).is_err());
    }
}
