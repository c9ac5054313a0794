// LogSift Common - Shared types between the ingest and analysis nodes
//
// The two nodes communicate through a CSV dataset file; this crate pins
// the record shape and column schema both sides agree on.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Column order of the intermediate dataset file.
///
/// The ingest node writes exactly this header; the analysis node reads
/// records by these names. Keep in sync with the serde renames on
/// [`LogRecord`].
pub const DATASET_COLUMNS: [&str; 10] = [
    "timestamp",
    "clientip",
    "verb",
    "request",
    "httpversion",
    "response",
    "bytes",
    "referrer",
    "useragent.device",
    "geoip.country_code3",
];

/// One parsed access-log line.
///
/// Produced by the ingest node's parser from a combined-format log line
/// and persisted verbatim to the dataset file. Field names map to the
/// dataset columns via serde renames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Request timestamp with its original timezone offset
    pub timestamp: DateTime<FixedOffset>,
    /// Source address of the client
    #[serde(rename = "clientip")]
    pub client_ip: String,
    /// HTTP method (GET, POST, ...)
    pub verb: String,
    /// Request URI path and query
    #[serde(rename = "request")]
    pub request_uri: String,
    /// Protocol version from the request line (1.0, 1.1, 2.0)
    #[serde(rename = "httpversion")]
    pub http_version: String,
    /// Response status code, kept categorical (never arithmetic)
    #[serde(rename = "response")]
    pub response_code: String,
    /// Response body size in bytes
    #[serde(rename = "bytes")]
    pub bytes_sent: u64,
    /// Referrer header value, may be "-"
    pub referrer: String,
    /// User agent string used as a device category
    #[serde(rename = "useragent.device")]
    pub user_agent_device: String,
    /// 3-letter country code for the client address
    #[serde(rename = "geoip.country_code3")]
    pub country_code: String,
}
