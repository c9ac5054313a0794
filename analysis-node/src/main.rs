use anyhow::{Context, Result};
use tracing::{info, warn};

use analysis_node::config::AnalysisConfig;
use analysis_node::dataset;
use analysis_node::pipeline::{self, report};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "analysis_node=info".into()),
        )
        .with_target(false)
        .init();

    info!("Starting LogSift Analysis Node v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from file if available, otherwise use defaults
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/analysis".to_string());
    let config = match AnalysisConfig::from_file(&config_path) {
        Ok(config) => {
            info!("Configuration loaded from {}.toml", config_path);
            config
        }
        Err(e) => {
            warn!("Failed to load config file: {}, using defaults", e);
            AnalysisConfig::default()
        }
    };

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let table = dataset::load_dataset(&config.dataset.path, &config)
        .context("Failed to load dataset")?;
    info!(rows = table.len(), "Dataset ready for analysis");

    let analysis = pipeline::run(table, &config)
        .await
        .context("Analysis pipeline failed")?;

    info!(
        run_id = %analysis.run_id,
        rows = analysis.rows.len(),
        "Analysis complete"
    );

    let flagged = report::anomalies(&analysis.rows);
    info!(anomalies = flagged.len(), "Anomaly verdicts");
    for row in &flagged {
        info!(ip = %row.ip, cluster = row.result, "Anomalous client");
    }

    for client in report::top_clients(&analysis.rows, config.report.top_n) {
        info!(ip = %client.ip, count = client.count, "Top client by occurrence");
    }

    if let Some(path) = &config.report.output_path {
        report::write_results(path, &analysis.rows).context("Failed to write result table")?;
    }

    Ok(())
}
