use thiserror::Error;

/// Errors that can occur in the ingest node library
#[derive(Error, Debug)]
pub enum IngestError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Log retrieval backend returned a failure or unusable payload
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// HTTP transport error talking to the search backend
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset serialization error
    #[error("Dataset error: {0}")]
    Dataset(#[from] csv::Error),
}

/// Result type alias using IngestError
pub type Result<T> = std::result::Result<T, IngestError>;
