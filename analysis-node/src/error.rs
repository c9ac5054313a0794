use thiserror::Error;

/// Errors that can occur in the analysis node library
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset file could not be read or decoded
    #[error("Dataset error: {0}")]
    Dataset(#[from] csv::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No rows survived loading and preprocessing
    #[error("Empty dataset: no rows to analyze")]
    EmptyDataset,

    /// Too few rows for the requested cluster count
    #[error("Insufficient rows: {rows} rows cannot form {clusters} clusters")]
    InsufficientRows { rows: usize, clusters: usize },

    /// Feature encoding failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Model fitting failed
    #[error("Model fit error: {0}")]
    ModelFit(String),

    /// Internal pipeline invariant violated
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AnalysisError
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalysisError::InsufficientRows { rows: 3, clusters: 4 };
        assert_eq!(
            err.to_string(),
            "Insufficient rows: 3 rows cannot form 4 clusters"
        );
    }

    #[test]
    fn test_empty_dataset_display() {
        let err = AnalysisError::EmptyDataset;
        assert_eq!(err.to_string(), "Empty dataset: no rows to analyze");
    }
}
