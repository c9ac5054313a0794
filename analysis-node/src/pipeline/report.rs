use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{AnalysisError, Result};

/// Binary anomaly verdict for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyLabel {
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "anomaly")]
    Anomaly,
}

impl fmt::Display for AnomalyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyLabel::Normal => write!(f, "normal"),
            AnomalyLabel::Anomaly => write!(f, "anomaly"),
        }
    }
}

/// One row of the final result table, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Client address
    pub ip: String,
    /// Assigned cluster id
    pub result: usize,
    /// Anomaly verdict
    pub anomaly: AnomalyLabel,
}

/// Occurrence count for one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientCount {
    pub ip: String,
    pub count: usize,
}

/// Assembled output of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Batch run identifier
    pub run_id: Uuid,
    /// When the report was assembled
    pub generated_at: DateTime<Utc>,
    /// Result rows, one per surviving input record
    pub rows: Vec<ResultRow>,
}

impl AnalysisReport {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            rows,
        }
    }
}

/// Join client identity, cluster id, and anomaly label by row position.
///
/// The three inputs must be exactly parallel; a length mismatch means a
/// pipeline stage broke the row-order invariant.
pub fn assemble(
    client_ips: Vec<String>,
    clusters: Vec<usize>,
    labels: Vec<AnomalyLabel>,
) -> Result<Vec<ResultRow>> {
    if client_ips.len() != clusters.len() || client_ips.len() != labels.len() {
        return Err(AnalysisError::Internal(format!(
            "result join misaligned: {} ips, {} cluster ids, {} labels",
            client_ips.len(),
            clusters.len(),
            labels.len()
        )));
    }

    Ok(client_ips
        .into_iter()
        .zip(clusters)
        .zip(labels)
        .map(|((ip, result), anomaly)| ResultRow {
            ip,
            result,
            anomaly,
        })
        .collect())
}

/// Rows flagged as anomalous, in row order
pub fn anomalies(rows: &[ResultRow]) -> Vec<&ResultRow> {
    rows.iter()
        .filter(|row| row.anomaly == AnomalyLabel::Anomaly)
        .collect()
}

/// The `n` most frequent client addresses in the batch.
///
/// Ties break toward the client seen first; this is the only extra
/// query downstream reporting needs.
pub fn top_clients(rows: &[ResultRow], n: usize) -> Vec<ClientCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for (position, row) in rows.iter().enumerate() {
        *counts.entry(row.ip.as_str()).or_insert(0) += 1;
        first_seen.entry(row.ip.as_str()).or_insert(position);
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(first_seen[a.0].cmp(&first_seen[b.0])));

    ranked
        .into_iter()
        .take(n)
        .map(|(ip, count)| ClientCount {
            ip: ip.to_string(),
            count,
        })
        .collect()
}

/// Write the result table as CSV with the `ip,result,anomaly` schema
pub fn write_results<P: AsRef<Path>>(path: P, rows: &[ResultRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(
        rows = rows.len(),
        path = %path.as_ref().display(),
        "Result table written"
    );
    Ok(())
}
