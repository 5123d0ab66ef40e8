//! Error types for the datasage pipeline

use thiserror::Error;

/// Result type alias for datasage operations
pub type Result<T> = std::result::Result<T, DatasageError>;

/// Main error type for the datasage pipeline
#[derive(Error, Debug)]
pub enum DatasageError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Content unreadable: not parseable as delimited text ({csv_error}) or as a spreadsheet ({sheet_error})")]
    ContentUnreadable {
        csv_error: String,
        sheet_error: String,
    },

    #[error("Target column '{target}' not found in columns: {available:?}")]
    TargetNotFound {
        target: String,
        available: Vec<String>,
    },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Report error: {0}")]
    ReportError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl From<polars::error::PolarsError> for DatasageError {
    fn from(err: polars::error::PolarsError) -> Self {
        DatasageError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for DatasageError {
    fn from(err: serde_json::Error) -> Self {
        DatasageError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DatasageError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_target_not_found_names_columns() {
        let err = DatasageError::TargetNotFound {
            target: "label".to_string(),
            available: vec!["a".to_string(), "b".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'label'"));
        assert!(msg.contains("\"a\""));
        assert!(msg.contains("\"b\""));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DatasageError = io_err.into();
        assert!(matches!(err, DatasageError::IoError(_)));
    }
}
