use std::path::Path;

use logsift_common::LogRecord;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Dataset columns holding categorical features
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "verb",
    "httpversion",
    "response",
    "useragent.device",
    "geoip.country_code3",
];

/// The analysis-side view of the dataset after preprocessing.
///
/// Timestamp, referrer, and request URI are already dropped; client
/// identity is held out-of-band and never becomes a feature. All
/// columns share one row order, the join key for the final report.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Client address per row, preserved for the positional join
    pub client_ips: Vec<String>,
    /// HTTP method per row
    pub verbs: Vec<String>,
    /// Protocol version per row
    pub http_versions: Vec<String>,
    /// Status code per row, categorical
    pub response_codes: Vec<String>,
    /// Response size per row
    pub bytes_sent: Vec<f64>,
    /// User agent device category per row
    pub devices: Vec<String>,
    /// Country code per row
    pub country_codes: Vec<String>,
}

impl RawTable {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.client_ips.len()
    }

    /// True when no rows survived preprocessing
    pub fn is_empty(&self) -> bool {
        self.client_ips.is_empty()
    }

    /// Look up a categorical column by its dataset name
    pub fn categorical_column(&self, name: &str) -> Option<&[String]> {
        match name {
            "verb" => Some(&self.verbs),
            "httpversion" => Some(&self.http_versions),
            "response" => Some(&self.response_codes),
            "useragent.device" => Some(&self.devices),
            "geoip.country_code3" => Some(&self.country_codes),
            _ => None,
        }
    }

    /// Build the table from parsed records.
    ///
    /// Applies the preprocessing contract: excluded client addresses
    /// are dropped, missing country codes and HTTP versions are filled
    /// with their configured defaults, and row order is preserved.
    pub fn from_records(records: Vec<LogRecord>, config: &AnalysisConfig) -> Result<Self> {
        let mut table = RawTable {
            client_ips: Vec::new(),
            verbs: Vec::new(),
            http_versions: Vec::new(),
            response_codes: Vec::new(),
            bytes_sent: Vec::new(),
            devices: Vec::new(),
            country_codes: Vec::new(),
        };

        let mut excluded = 0usize;
        for record in records {
            if config.dataset.excluded_clients.contains(&record.client_ip) {
                excluded += 1;
                continue;
            }

            let country = if record.country_code.is_empty() {
                config.encoding.country_fill.clone()
            } else {
                record.country_code
            };
            let http_version = if record.http_version.is_empty() {
                config.encoding.http_version_fill.clone()
            } else {
                record.http_version
            };

            table.client_ips.push(record.client_ip);
            table.verbs.push(record.verb);
            table.http_versions.push(http_version);
            table.response_codes.push(record.response_code);
            table.bytes_sent.push(record.bytes_sent as f64);
            table.devices.push(record.user_agent_device);
            table.country_codes.push(country);
        }

        if excluded > 0 {
            debug!(excluded, "Dropped rows from excluded client addresses");
        }

        if table.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        Ok(table)
    }
}

/// Load the intermediate dataset from disk and preprocess it
pub fn load_dataset<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<RawTable> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<LogRecord>, _>>()?;

    info!(
        rows = records.len(),
        path = %path.as_ref().display(),
        "Dataset loaded"
    );

    RawTable::from_records(records, config)
}
