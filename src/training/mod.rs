//! Model training module
//!
//! Candidate classifiers and the automated comparison runner:
//! - Logistic regression
//! - Gaussian Naive Bayes
//! - K-Nearest Neighbors

mod config;
mod models;
mod runner;
pub mod knn;
pub mod linear_models;
pub mod naive_bayes;

pub use config::{AutomlConfig, ARTIFACT_FILE_NAME};
pub use knn::KnnClassifier;
pub use linear_models::LogisticRegression;
pub use models::ModelMetrics;
pub use naive_bayes::GaussianNaiveBayes;
pub use runner::{load_model, AutomlResult, AutomlRunner, ComparisonRow, TrainedModel};
