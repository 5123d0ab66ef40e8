//! Training configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixed base name of the persisted best-model artifact. The extension
/// signals the serialization format.
pub const ARTIFACT_FILE_NAME: &str = "best_automl_model.json";

/// Configuration for the automated model comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomlConfig {
    /// Train/validation split ratio
    pub validation_split: f64,

    /// Random seed; the same seed must reproduce the same ranking
    pub random_state: u64,

    /// Directory the best-model artifact is written to, created on demand
    pub models_dir: PathBuf,
}

impl Default for AutomlConfig {
    fn default() -> Self {
        Self {
            validation_split: 0.2,
            random_state: 123,
            models_dir: PathBuf::from("models"),
        }
    }
}

impl AutomlConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the validation split
    pub fn with_validation_split(mut self, ratio: f64) -> Self {
        self.validation_split = ratio;
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the artifact directory
    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    /// Full path of the artifact this configuration writes
    pub fn artifact_path(&self) -> PathBuf {
        self.models_dir.join(ARTIFACT_FILE_NAME)
    }
}
