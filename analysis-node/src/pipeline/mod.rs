pub mod encoder;
pub mod iforest;
pub mod kmeans;
pub mod report;
pub mod scaler;

pub use encoder::{EncodedTable, EncodingModel};
pub use iforest::{label_by_contamination, IsolationForest};
pub use kmeans::{KMeans, KMeansFit};
pub use report::{AnalysisReport, AnomalyLabel, ClientCount, ResultRow};
pub use scaler::{NormalizedTable, ScalingModel};

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::dataset::RawTable;
use crate::error::{AnalysisError, Result};

/// Run the full analysis pipeline over one batch.
///
/// Encoding and scaling are fitted on the batch itself; clustering and
/// anomaly scoring then read the same immutable normalized matrix
/// concurrently. Every run is stateless with respect to prior runs.
pub async fn run(table: RawTable, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let encoding = EncodingModel::fit(&table, &config.encoding)?;
    let encoded = encoding.apply(&table)?;
    debug!(
        rows = encoded.matrix.nrows(),
        features = encoded.matrix.ncols(),
        "Batch encoded"
    );

    let scaling = ScalingModel::fit(&encoded)?;
    let normalized = scaling.apply(&encoded)?;

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed, "Fitting models");

    let matrix = Arc::new(normalized.matrix);

    let clustering = {
        let matrix = Arc::clone(&matrix);
        let engine = KMeans::new(config.clustering.clusters, config.clustering.max_iterations);
        tokio::task::spawn_blocking(move || engine.fit(&matrix, seed))
    };

    let scoring = {
        let matrix = Arc::clone(&matrix);
        let trees = config.anomaly.trees;
        let subsample = config.anomaly.subsample;
        tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
            let forest = IsolationForest::fit(&matrix, trees, subsample, &mut rng)?;
            Ok::<Vec<f64>, AnalysisError>(forest.score_all(&matrix))
        })
    };

    let (clustering, scoring) = tokio::try_join!(clustering, scoring)
        .map_err(|e| AnalysisError::ModelFit(format!("model task panicked: {}", e)))?;
    let fit = clustering?;
    let scores = scoring?;

    info!(
        iterations = fit.iterations,
        clusters = config.clustering.clusters,
        "Clustering complete"
    );

    let labels = label_by_contamination(&scores, config.anomaly.contamination);
    let rows = report::assemble(table.client_ips, fit.assignments, labels)?;

    Ok(AnalysisReport::new(rows))
}
