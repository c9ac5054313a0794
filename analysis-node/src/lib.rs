//! LogSift Analysis Node Library
//!
//! This library turns the intermediate access-log dataset into a
//! per-client result table: behavioral cluster ids from k-means plus
//! binary anomaly labels from an isolation forest.

pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;

// Re-export commonly used types
pub use config::AnalysisConfig;
pub use dataset::{load_dataset, RawTable};
pub use error::AnalysisError;
pub use pipeline::{AnalysisReport, AnomalyLabel, ResultRow};
