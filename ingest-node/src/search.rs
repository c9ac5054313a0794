use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::error::{IngestError, Result};

/// Client for the log search backend.
///
/// The backend's contract with the pipeline is minimal: it returns raw
/// log-line strings for a query; its own protocol stays out of the
/// pipeline proper.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    config: SearchConfig,
}

/// Search response envelope, trimmed to the fields we read
#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: HitSource,
}

#[derive(Debug, Deserialize)]
struct HitSource {
    message: String,
}

impl SearchClient {
    /// Create a new search client
    pub fn new(config: SearchConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Fetch raw log lines matching the configured query.
    ///
    /// Lines come back in backend result order, which is the input order
    /// the rest of the pipeline preserves.
    pub async fn fetch_lines(&self) -> Result<Vec<String>> {
        let url = format!(
            "{}/{}/_search",
            self.config.base_url.trim_end_matches('/'),
            self.config.index
        );
        let payload = self.build_query();

        debug!(url = %url, "Querying search backend");

        let response = self.http.post(&url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Retrieval(format!(
                "search backend returned {}: {}",
                status, body
            )));
        }

        let parsed: SearchResponse = response.json().await?;
        let lines: Vec<String> = parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| hit.source.message)
            .collect();

        info!(lines = lines.len(), "Retrieved raw log lines from search backend");
        Ok(lines)
    }

    /// Build the search query body
    fn build_query(&self) -> Value {
        let mut filter = vec![json!({
            "multi_match": {
                "type": "best_fields",
                "query": self.config.query,
                "lenient": true,
            }
        })];

        if self.config.time_from.is_some() || self.config.time_to.is_some() {
            let mut range = serde_json::Map::new();
            range.insert("format".to_string(), json!("strict_date_optional_time"));
            if let Some(from) = &self.config.time_from {
                range.insert("gte".to_string(), json!(from));
            }
            if let Some(to) = &self.config.time_to {
                range.insert("lte".to_string(), json!(to));
            }
            filter.push(json!({ "range": { "@timestamp": range } }));
        }

        let must_not = match &self.config.exclude_log_path {
            Some(path) => json!([{ "match_phrase": { "log.file.path": path } }]),
            None => json!([]),
        };

        json!({
            "track_total_hits": false,
            "size": self.config.max_hits,
            "query": {
                "bool": {
                    "must": [],
                    "filter": filter,
                    "should": [],
                    "must_not": must_not,
                }
            }
        })
    }
}
