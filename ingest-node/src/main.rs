use anyhow::{Context, Result};
use tracing::{info, warn};

use ingest_node::config::IngestConfig;
use ingest_node::dataset;
use ingest_node::parser::LogParser;
use ingest_node::search::SearchClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ingest_node=info".into()),
        )
        .with_target(false)
        .init();

    info!("Starting LogSift Ingest Node v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from file if available, otherwise use defaults
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config/ingest".to_string());
    let config = match IngestConfig::from_file(&config_path) {
        Ok(config) => {
            info!("Configuration loaded from {}.toml", config_path);
            config
        }
        Err(e) => {
            warn!("Failed to load config file: {}, using defaults", e);
            IngestConfig::default()
        }
    };

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // Collect raw lines from the configured source
    let lines = if config.search.enabled {
        let client = SearchClient::new(config.search.clone());
        client
            .fetch_lines()
            .await
            .context("Failed to retrieve log lines from search backend")?
    } else {
        let path = config
            .source
            .input_path
            .as_deref()
            .context("No input path configured")?;
        info!(path = %path, "Reading raw log lines from file");
        dataset::read_lines(path).context("Failed to read input file")?
    };

    if lines.is_empty() {
        warn!("Source produced no log lines; writing empty dataset");
    }

    // Parse the batch, keeping input order
    let parser = LogParser::new()?;
    let (records, stats) = parser.parse_batch(lines.iter().map(String::as_str));

    info!(
        parsed = stats.parsed,
        skipped = stats.skipped,
        "Parse pass complete"
    );

    dataset::write_dataset(&config.dataset.output_path, &records)
        .context("Failed to write dataset")?;

    info!(path = %config.dataset.output_path, "Ingest run complete");
    Ok(())
}
