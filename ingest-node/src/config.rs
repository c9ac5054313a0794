use serde::{Deserialize, Serialize};

/// Main configuration for the ingest node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Search backend integration
    pub search: SearchConfig,
    /// Local file source, used when the search backend is disabled
    #[serde(default)]
    pub source: SourceConfig,
    /// Dataset output settings
    pub dataset: DatasetConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Search backend configuration
///
/// The backend's only contract with the pipeline is "produce a sequence
/// of raw log-line strings"; everything here shapes that one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Enable retrieval from the search backend
    pub enabled: bool,
    /// Base URL of the search backend
    pub base_url: String,
    /// Index pattern to query
    pub index: String,
    /// Free-text term the log lines must match
    pub query: String,
    /// Inclusive lower bound of the time range (RFC 3339)
    pub time_from: Option<String>,
    /// Inclusive upper bound of the time range (RFC 3339)
    pub time_to: Option<String>,
    /// Maximum number of hits to request
    pub max_hits: usize,
    /// Log file path to exclude from results
    pub exclude_log_path: Option<String>,
}

/// Local line source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to a plain-text file with one raw log line per row
    pub input_path: Option<String>,
}

/// Dataset output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Where the intermediate CSV dataset is written
    pub output_path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is unset
    pub level: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                enabled: true,
                base_url: "http://localhost:9200".to_string(),
                index: "filebeat-*".to_string(),
                query: "wp-content".to_string(),
                time_from: None,
                time_to: None,
                max_hits: 10_000,
                exclude_log_path: Some("/var/log/syslog".to_string()),
            },
            source: SourceConfig { input_path: None },
            dataset: DatasetConfig {
                output_path: "extracted_data.csv".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl IngestConfig {
    /// Load configuration from file with environment overrides
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LOGSIFT_INGEST").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.search.enabled {
            if self.search.base_url.is_empty() {
                return Err("Search base URL cannot be empty when search is enabled".to_string());
            }
            if self.search.index.is_empty() {
                return Err("Search index cannot be empty when search is enabled".to_string());
            }
            if self.search.max_hits == 0 {
                return Err("Search max_hits cannot be 0".to_string());
            }
        } else if self.source.input_path.is_none() {
            return Err("Either the search backend or a source input path is required".to_string());
        }

        if self.dataset.output_path.is_empty() {
            return Err("Dataset output path cannot be empty".to_string());
        }

        Ok(())
    }
}
