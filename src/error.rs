//! Error types for the foldwise library

use thiserror::Error;

/// Result type alias for foldwise operations
pub type Result<T> = std::result::Result<T, FoldwiseError>;

/// Main error type for the foldwise library
#[derive(Error, Debug)]
pub enum FoldwiseError {
    /// Invalid scheme or method parameters (non-positive folds/repeats,
    /// ratio outside (0,1), parameters forcing an empty train or test set).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested (method, scheme) or (method, measure) pairing is not
    /// statistically valid.
    #[error("Incompatibility error: {0}")]
    Incompatibility(String),

    /// Required dataset column absent or malformed.
    #[error("Data error: {0}")]
    Data(String),

    /// Training or prediction failed inside a single fold.
    #[error("Fold {iteration} failed: {reason}")]
    Fold { iteration: usize, reason: String },

    /// The experiment was cancelled before all folds completed.
    #[error("Resampling run cancelled")]
    Cancelled,

    /// Numerical failure (degenerate variance, non-finite intermediate).
    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FoldwiseError {
    fn from(err: serde_json::Error) -> Self {
        FoldwiseError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FoldwiseError {
    fn from(err: ndarray::ShapeError) -> Self {
        FoldwiseError::Data(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FoldwiseError::Config("folds must be at least 2".to_string());
        assert_eq!(err.to_string(), "Configuration error: folds must be at least 2");
    }

    #[test]
    fn test_fold_error_display() {
        let err = FoldwiseError::Fold {
            iteration: 3,
            reason: "singular design matrix".to_string(),
        };
        assert!(err.to_string().contains("Fold 3"));
    }
}
