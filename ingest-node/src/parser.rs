use chrono::DateTime;
use logsift_common::LogRecord;
use regex::Regex;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Combined access-log line shape:
/// `IP - - [timestamp] "VERB URI HTTP/version" status bytes "referrer" "useragent"`
const LINE_PATTERN: &str = concat!(
    r#"(?P<client_ip>[\d.]+) - - \[(?P<timestamp>[^\]]+)\] "#,
    r#""(?P<verb>\S+) (?P<request_uri>\S+) HTTP/(?P<http_version>[\d.]+)" "#,
    r#"(?P<response_code>\d+) (?P<bytes_sent>\d+) "(?P<referrer>[^"]*)" "(?P<user_agent>[^"]*)""#,
);

/// Timestamp grammar used inside the bracketed section
const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Country code assigned to every record. Geolocation lookup is an
/// external collaborator that is not wired into this pipeline.
const DEFAULT_COUNTRY_CODE: &str = "US";

/// Per-batch parse accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Lines converted into records
    pub parsed: u64,
    /// Lines dropped because they did not match the grammar
    pub skipped: u64,
}

/// Turns raw access-log lines into structured records
#[derive(Debug, Clone)]
pub struct LogParser {
    pattern: Regex,
}

impl LogParser {
    /// Create a parser with the combined access-log pattern compiled
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(LINE_PATTERN)
            .map_err(|e| IngestError::Config(format!("Failed to compile log pattern: {}", e)))?;

        Ok(Self { pattern })
    }

    /// Parse a single line.
    ///
    /// Returns `None` when the line does not match the expected shape or
    /// its timestamp does not follow the log timestamp grammar. Failures
    /// are per-line and never abort a batch.
    pub fn parse_line(&self, line: &str) -> Option<LogRecord> {
        let captures = self.pattern.captures(line)?;

        let timestamp_str = &captures["timestamp"];
        let timestamp = match DateTime::parse_from_str(timestamp_str, TIMESTAMP_FORMAT) {
            Ok(ts) => ts,
            Err(e) => {
                debug!(timestamp = %timestamp_str, error = %e, "Unparsable log timestamp");
                return None;
            }
        };

        let bytes_sent = captures["bytes_sent"].parse::<u64>().ok()?;

        Some(LogRecord {
            timestamp,
            client_ip: captures["client_ip"].to_string(),
            verb: captures["verb"].to_string(),
            request_uri: captures["request_uri"].to_string(),
            http_version: captures["http_version"].to_string(),
            response_code: captures["response_code"].to_string(),
            bytes_sent,
            referrer: captures["referrer"].to_string(),
            user_agent_device: captures["user_agent"].to_string(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        })
    }

    /// Parse a batch of lines, preserving input order.
    ///
    /// Unparsable lines are counted, not propagated; later pipeline
    /// stages depend on whole-batch statistics and positional joins, so
    /// the surviving records keep their relative order.
    pub fn parse_batch<'a, I>(&self, lines: I) -> (Vec<LogRecord>, ParseStats)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut records = Vec::new();
        let mut stats = ParseStats::default();

        for line in lines {
            match self.parse_line(line) {
                Some(record) => {
                    records.push(record);
                    stats.parsed += 1;
                }
                None => {
                    debug!(line = %line, "Skipping unparsable log line");
                    stats.skipped += 1;
                }
            }
        }

        (records, stats)
    }
}
