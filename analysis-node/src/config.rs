use serde::{Deserialize, Serialize};

/// Main configuration for the analysis node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Random seed for the clustering and anomaly models.
    /// `None` draws a fresh seed per run; set it for reproducible output.
    pub seed: Option<u64>,
    /// Dataset input settings
    pub dataset: DatasetConfig,
    /// Categorical feature encoding settings
    pub encoding: EncodingConfig,
    /// K-means clustering settings
    pub clustering: ClusteringConfig,
    /// Isolation-forest anomaly detection settings
    pub anomaly: AnomalyConfig,
    /// Report output settings
    pub report: ReportConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Dataset input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path to the intermediate CSV dataset written by the ingest node
    pub path: String,
    /// Client addresses removed before analysis
    pub excluded_clients: Vec<String>,
}

/// Categorical feature encoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Values seen fewer than this many times in a collapse column are
    /// replaced by the shared "others" bucket. Counted per column over
    /// the whole batch.
    pub rarity_threshold: usize,
    /// Columns subject to rarity collapsing
    pub collapse_columns: Vec<String>,
    /// Columns expanded into indicator columns
    pub one_hot_columns: Vec<String>,
    /// Fill value for a missing country code
    pub country_fill: String,
    /// Fill value for a missing HTTP version
    pub http_version_fill: String,
}

/// K-means clustering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Number of behavioral clusters (k)
    pub clusters: usize,
    /// Iteration cap when assignments do not stabilize earlier
    pub max_iterations: usize,
}

/// Isolation-forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Expected fraction of anomalous rows, sets the decision threshold
    pub contamination: f64,
    /// Number of trees in the ensemble
    pub trees: usize,
    /// Rows sampled per tree
    pub subsample: usize,
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// How many top clients to log for downstream reporting
    pub top_n: usize,
    /// Optional path for the result CSV (ip, result, anomaly)
    pub output_path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is unset
    pub level: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: None,
            dataset: DatasetConfig {
                path: "extracted_data.csv".to_string(),
                excluded_clients: vec!["127.0.0.1".to_string()],
            },
            encoding: EncodingConfig {
                rarity_threshold: 300,
                collapse_columns: vec![
                    "geoip.country_code3".to_string(),
                    "useragent.device".to_string(),
                ],
                one_hot_columns: vec![
                    "geoip.country_code3".to_string(),
                    "httpversion".to_string(),
                    "response".to_string(),
                    "useragent.device".to_string(),
                    "verb".to_string(),
                ],
                country_fill: "unknown".to_string(),
                http_version_fill: "error".to_string(),
            },
            clustering: ClusteringConfig {
                clusters: 4,
                max_iterations: 100,
            },
            anomaly: AnomalyConfig {
                contamination: 0.05,
                trees: 100,
                subsample: 256,
            },
            report: ReportConfig {
                top_n: 10,
                output_path: Some("analysis_results.csv".to_string()),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from file with environment overrides
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LOGSIFT_ANALYSIS").separator("__"))
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
        if self.dataset.path.is_empty() {
            return Err("Dataset path cannot be empty".to_string());
        }

        if self.encoding.rarity_threshold == 0 {
            return Err("Rarity threshold must be at least 1".to_string());
        }

        for column in &self.encoding.collapse_columns {
            if !self.encoding.one_hot_columns.contains(column) {
                return Err(format!(
                    "Collapse column '{}' is not a designated one-hot column",
                    column
                ));
            }
        }

        if self.clustering.clusters == 0 {
            return Err("Cluster count cannot be 0".to_string());
        }

        if self.clustering.max_iterations == 0 {
            return Err("Max iterations cannot be 0".to_string());
        }

        if !(self.anomaly.contamination > 0.0 && self.anomaly.contamination < 1.0) {
            return Err("Contamination must lie strictly between 0 and 1".to_string());
        }

        if self.anomaly.trees == 0 {
            return Err("Tree count cannot be 0".to_string());
        }

        if self.anomaly.subsample < 2 {
            return Err("Subsample size must be at least 2".to_string());
        }

        if self.report.top_n == 0 {
            return Err("Top-N cannot be 0".to_string());
        }

        Ok(())
    }
}
