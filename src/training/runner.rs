//! Automated model comparison
//!
//! Trains every candidate classifier on a seeded stratified split, ranks
//! them into a comparison table, refits the winner on the full data, and
//! persists it as the run's model artifact.

use crate::error::{DatasageError, Result};
use super::config::AutomlConfig;
use super::knn::KnnClassifier;
use super::linear_models::LogisticRegression;
use super::models::ModelMetrics;
use super::naive_bayes::GaussianNaiveBayes;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Enum holding trained model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    LogisticRegression(LogisticRegression),
    GaussianNaiveBayes(GaussianNaiveBayes),
    KnnClassifier(KnnClassifier),
}

impl TrainedModel {
    /// Human-readable model name used in comparison rows
    pub fn name(&self) -> &'static str {
        match self {
            TrainedModel::LogisticRegression(_) => "Logistic Regression",
            TrainedModel::GaussianNaiveBayes(_) => "Gaussian Naive Bayes",
            TrainedModel::KnnClassifier(_) => "K-Nearest Neighbors",
        }
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            TrainedModel::LogisticRegression(m) => m.fit(x, y),
            TrainedModel::GaussianNaiveBayes(m) => m.fit(x, y),
            TrainedModel::KnnClassifier(m) => m.fit(x, y),
        }
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::LogisticRegression(m) => m.predict(x),
            TrainedModel::GaussianNaiveBayes(m) => m.predict(x),
            TrainedModel::KnnClassifier(m) => m.predict(x),
        }
    }

    /// Positive-class scores where the model can produce them
    fn positive_scores(&self, x: &Array2<f64>) -> Option<Array1<f64>> {
        match self {
            TrainedModel::LogisticRegression(m) => m.predict_proba(x).ok(),
            TrainedModel::GaussianNaiveBayes(m) => m.positive_proba(x).ok().flatten(),
            TrainedModel::KnnClassifier(m) => m.positive_vote_share(x).ok(),
        }
    }
}

/// Load a persisted model artifact
pub fn load_model(path: &Path) -> Result<TrainedModel> {
    let json = std::fs::read_to_string(path)?;
    let model: TrainedModel = serde_json::from_str(&json)?;
    Ok(model)
}

/// One row of the comparison table; row order is the ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Model identifier
    pub model_name: String,
    /// Metric name -> value (accuracy, auc, recall, precision, f1)
    pub metrics: HashMap<String, f64>,
    /// Training time in seconds
    pub training_time_secs: f64,
}

impl ComparisonRow {
    /// Metric value by name
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Output of an automated comparison run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomlResult {
    /// Path of the persisted best-model artifact
    pub model_path: PathBuf,
    /// Candidate rows, best first
    pub comparison: Vec<ComparisonRow>,
}

/// Runs the candidate comparison for one dataset/target pair
pub struct AutomlRunner {
    config: AutomlConfig,
}

impl Default for AutomlRunner {
    fn default() -> Self {
        Self::new(AutomlConfig::default())
    }
}

impl AutomlRunner {
    /// Create a runner with the given configuration
    pub fn new(config: AutomlConfig) -> Self {
        Self { config }
    }

    /// The runner's configuration
    pub fn config(&self) -> &AutomlConfig {
        &self.config
    }

    /// Train and rank all candidates, then persist the winner.
    ///
    /// `target` must name a column of `df`. The ranking criterion (validation
    /// accuracy, descending) belongs to this runner; callers treat row 0 as
    /// authoritative and never re-derive it. Given the same configuration and
    /// data, the returned ranking is identical across runs.
    pub fn run(&self, df: &DataFrame, target: &str) -> Result<AutomlResult> {
        let columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        if !columns.iter().any(|c| c == target) {
            return Err(DatasageError::TargetNotFound {
                target: target.to_string(),
                available: columns,
            });
        }

        let (x, y, n_classes) = self.prepare_data(df, target)?;
        let (x_train, x_val, y_train, y_val) = self.stratified_split(&x, &y)?;

        let mut ranked: Vec<(ComparisonRow, TrainedModel)> = Vec::new();
        for mut candidate in candidates() {
            let name = candidate.name();
            let start = Instant::now();
            if let Err(e) = candidate.fit(&x_train, &y_train) {
                tracing::warn!(model = name, error = %e, "candidate failed to train, skipping");
                continue;
            }
            let y_pred = match candidate.predict(&x_val) {
                Ok(pred) => pred,
                Err(e) => {
                    tracing::warn!(model = name, error = %e, "candidate failed to predict, skipping");
                    continue;
                }
            };
            let scores = if n_classes == 2 {
                candidate.positive_scores(&x_val)
            } else {
                None
            };
            let mut metrics = ModelMetrics::compute_classification(
                &y_val,
                &y_pred,
                scores.as_ref(),
                n_classes,
            );
            metrics.training_time_secs = start.elapsed().as_secs_f64();
            metrics.n_features = x.ncols();
            metrics.n_samples = x.nrows();

            ranked.push((comparison_row(name, &metrics), candidate));
        }

        if ranked.is_empty() {
            return Err(DatasageError::TrainingError(
                "no candidate model trained successfully".to_string(),
            ));
        }

        ranked.sort_by(|a, b| {
            let acc_a = a.0.metric("accuracy").unwrap_or(0.0);
            let acc_b = b.0.metric("accuracy").unwrap_or(0.0);
            acc_b.partial_cmp(&acc_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        // Refit the winner on the full data before persisting it
        let mut best = ranked[0].1.clone();
        best.fit(&x, &y)
            .map_err(|e| DatasageError::TrainingError(format!("refit of best model failed: {e}")))?;

        std::fs::create_dir_all(&self.config.models_dir)?;
        let model_path = self.config.artifact_path();
        let artifact = serde_json::to_string_pretty(&best)?;
        std::fs::write(&model_path, artifact)?;

        tracing::info!(
            best = %ranked[0].0.model_name,
            candidates = ranked.len(),
            path = %model_path.display(),
            "model comparison complete"
        );

        Ok(AutomlResult {
            model_path,
            comparison: ranked.into_iter().map(|(row, _)| row).collect(),
        })
    }

    fn prepare_data(&self, df: &DataFrame, target: &str) -> Result<(Array2<f64>, Array1<f64>, usize)> {
        // Label-encode the target; distinct labels sorted for a stable index
        let target_series = df.column(target)?.as_materialized_series().clone();
        let raw_labels: Vec<String> = target_series.iter().map(|v| label_of(&v)).collect();
        let mut distinct: Vec<String> = raw_labels.clone();
        distinct.sort();
        distinct.dedup();
        let index: HashMap<&String, usize> = distinct.iter().enumerate().map(|(i, l)| (l, i)).collect();
        let y: Array1<f64> = raw_labels.iter().map(|l| index[l] as f64).collect();
        let n_classes = distinct.len();

        if n_classes < 2 {
            return Err(DatasageError::TrainingError(format!(
                "target column '{target}' has a single distinct value"
            )));
        }

        // Numeric features only; everything except the target that casts
        let mut col_data: Vec<Vec<f64>> = Vec::new();
        for name in df.get_column_names() {
            if name.as_str() == target {
                continue;
            }
            let series = df.column(name)?;
            match series.cast(&DataType::Float64) {
                Ok(series_f64) => {
                    let values: Vec<f64> = series_f64
                        .f64()
                        .map_err(|e| DatasageError::DataError(e.to_string()))?
                        .into_iter()
                        .map(|v| v.unwrap_or(0.0))
                        .collect();
                    col_data.push(values);
                }
                Err(_) => {
                    tracing::warn!(column = %name, "skipping feature column that cannot be cast to f64");
                }
            }
        }

        if col_data.is_empty() {
            return Err(DatasageError::TrainingError(
                "no usable feature columns besides the target".to_string(),
            ));
        }

        let n_rows = df.height();
        let n_cols = col_data.len();
        let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
        let x = Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]);

        Ok((x, y, n_classes))
    }

    /// Stratified split with a seeded per-class shuffle
    fn stratified_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>)> {
        let val_ratio = self.config.validation_split;
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);

        let mut class_indices: HashMap<i64, Vec<usize>> = HashMap::new();
        for (i, &label) in y.iter().enumerate() {
            class_indices.entry(label as i64).or_default().push(i);
        }

        // Classes visited in sorted order so the shuffle stream is reproducible
        let mut classes: Vec<i64> = class_indices.keys().copied().collect();
        classes.sort();

        let mut train_indices = Vec::new();
        let mut val_indices = Vec::new();
        for class in classes {
            let mut indices = class_indices.remove(&class).unwrap_or_default();
            indices.shuffle(&mut rng);
            let class_val_size = ((indices.len() as f64) * val_ratio).max(1.0) as usize;
            let class_val_size = class_val_size.min(indices.len().saturating_sub(1));
            let split_point = indices.len() - class_val_size;
            train_indices.extend_from_slice(&indices[..split_point]);
            val_indices.extend_from_slice(&indices[split_point..]);
        }

        if train_indices.is_empty() || val_indices.is_empty() {
            return Err(DatasageError::TrainingError(
                "stratified split resulted in an empty train or validation set".to_string(),
            ));
        }

        let n_cols = x.ncols();
        let x_train = Array2::from_shape_fn((train_indices.len(), n_cols), |(i, j)| {
            x[[train_indices[i], j]]
        });
        let x_val =
            Array2::from_shape_fn((val_indices.len(), n_cols), |(i, j)| x[[val_indices[i], j]]);
        let y_train = Array1::from_iter(train_indices.iter().map(|&i| y[i]));
        let y_val = Array1::from_iter(val_indices.iter().map(|&i| y[i]));

        Ok((x_train, x_val, y_train, y_val))
    }
}

fn candidates() -> Vec<TrainedModel> {
    vec![
        TrainedModel::LogisticRegression(LogisticRegression::new()),
        TrainedModel::GaussianNaiveBayes(GaussianNaiveBayes::new()),
        TrainedModel::KnnClassifier(KnnClassifier::default()),
    ]
}

fn comparison_row(name: &str, metrics: &ModelMetrics) -> ComparisonRow {
    let mut map = HashMap::new();
    if let Some(v) = metrics.accuracy {
        map.insert("accuracy".to_string(), v);
    }
    if let Some(v) = metrics.auc {
        map.insert("auc".to_string(), v);
    }
    if let Some(v) = metrics.recall {
        map.insert("recall".to_string(), v);
    }
    if let Some(v) = metrics.precision {
        map.insert("precision".to_string(), v);
    }
    if let Some(v) = metrics.f1 {
        map.insert("f1".to_string(), v);
    }
    ComparisonRow {
        model_name: name.to_string(),
        metrics: map,
        training_time_secs: metrics.training_time_secs,
    }
}

fn label_of(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => "null".to_string(),
        AnyValue::String(s) => (*s).to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}
