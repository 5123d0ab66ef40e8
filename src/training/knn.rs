//! K-Nearest Neighbors classifier

use crate::error::{DatasageError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// K-Nearest Neighbors classifier with Euclidean distance and majority voting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    /// Number of neighbors
    pub k: usize,
    /// Stored training features
    x_train: Option<Array2<f64>>,
    /// Stored training labels
    y_train: Option<Array1<f64>>,
}

impl Default for KnnClassifier {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KnnClassifier {
    /// Create a new classifier with `k` neighbors
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            x_train: None,
            y_train: None,
        }
    }

    /// Fit stores the training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(DatasageError::TrainingError(
                "cannot fit knn on an empty training set".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(DatasageError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Predict class labels by majority vote among the k nearest neighbors.
    /// Vote ties go to the smallest label so results stay deterministic.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let votes = self.neighbor_votes(x)?;
        Ok(votes
            .into_iter()
            .map(|counts| {
                counts
                    .into_iter()
                    .max_by(|(la, ca), (lb, cb)| ca.cmp(cb).then(lb.cmp(la)))
                    .map(|(label, _)| label as f64)
                    .unwrap_or(0.0)
            })
            .collect())
    }

    /// Share of neighbors voting for the class labelled `1`
    pub fn positive_vote_share(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let k = self.effective_k()?;
        let votes = self.neighbor_votes(x)?;
        Ok(votes
            .into_iter()
            .map(|counts| counts.get(&1).copied().unwrap_or(0) as f64 / k as f64)
            .collect())
    }

    fn effective_k(&self) -> Result<usize> {
        let y = self.y_train.as_ref().ok_or(DatasageError::ModelNotFitted)?;
        Ok(self.k.min(y.len()))
    }

    fn neighbor_votes(&self, x: &Array2<f64>) -> Result<Vec<HashMap<i64, usize>>> {
        let x_train = self.x_train.as_ref().ok_or(DatasageError::ModelNotFitted)?;
        let y_train = self.y_train.as_ref().ok_or(DatasageError::ModelNotFitted)?;
        let k = self.effective_k()?;

        let mut all_votes = Vec::with_capacity(x.nrows());
        for row in x.rows() {
            let mut distances: Vec<(f64, usize)> = x_train
                .rows()
                .into_iter()
                .enumerate()
                .map(|(i, train_row)| {
                    let d = row
                        .iter()
                        .zip(train_row.iter())
                        .map(|(a, b)| (a - b).powi(2))
                        .sum::<f64>();
                    (d, i)
                })
                .collect();
            distances.sort_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            });

            let mut counts: HashMap<i64, usize> = HashMap::new();
            for &(_, idx) in distances.iter().take(k) {
                *counts.entry(y_train[idx] as i64).or_insert(0) += 1;
            }
            all_votes.push(counts);
        }
        Ok(all_votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_predict_clusters() {
        let x = array![[0.0, 0.0], [0.1, 0.1], [0.2, 0.0], [5.0, 5.0], [5.1, 4.9], [4.9, 5.1]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = KnnClassifier::new(3);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&array![[0.05, 0.05], [5.05, 5.0]]).unwrap();
        assert_eq!(predictions, array![0.0, 1.0]);
    }

    #[test]
    fn test_vote_share_bounded() {
        let x = array![[0.0], [1.0], [10.0], [11.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut model = KnnClassifier::new(2);
        model.fit(&x, &y).unwrap();

        let share = model.positive_vote_share(&array![[0.5], [10.5]]).unwrap();
        assert_eq!(share[0], 0.0);
        assert_eq!(share[1], 1.0);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = KnnClassifier::new(3);
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(DatasageError::ModelNotFitted)
        ));
    }
}
