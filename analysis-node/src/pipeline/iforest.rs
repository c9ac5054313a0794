use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{AnalysisError, Result};
use crate::pipeline::report::AnomalyLabel;

/// Euler-Mascheroni constant, for the expected-path-length estimate
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// A node in an isolation tree
#[derive(Debug, Clone)]
enum IsolationNode {
    /// Random split on one feature
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    /// Unsplit remainder; `size` feeds the path-length estimate
    Leaf { size: usize },
}

impl IsolationNode {
    fn path_length(&self, row: ArrayView1<f64>, depth: f64) -> f64 {
        match self {
            IsolationNode::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] < *threshold {
                    left.path_length(row, depth + 1.0)
                } else {
                    right.path_length(row, depth + 1.0)
                }
            }
            IsolationNode::Leaf { size } => depth + expected_path_length(*size),
        }
    }
}

/// Expected path length of an unsuccessful search in a binary search
/// tree of `n` points: `c(n) = 2 H(n-1) - 2 (n-1)/n`
fn expected_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build(data: &Array2<f64>, indices: &[usize], max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: build_node(data, indices, 0, max_depth, rng),
        }
    }

    fn path_length(&self, row: ArrayView1<f64>) -> f64 {
        self.root.path_length(row, 0.0)
    }
}

fn build_node(
    data: &Array2<f64>,
    indices: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> IsolationNode {
    if indices.len() <= 1 || depth >= max_depth {
        return IsolationNode::Leaf {
            size: indices.len(),
        };
    }

    // Split only on features that still vary within this node
    let mut candidates = Vec::new();
    for feature in 0..data.ncols() {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &row in indices {
            let value = data[[row, feature]];
            min = min.min(value);
            max = max.max(value);
        }
        if max > min {
            candidates.push((feature, min, max));
        }
    }

    if candidates.is_empty() {
        return IsolationNode::Leaf {
            size: indices.len(),
        };
    }

    let (feature, min, max) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(min..max);

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&row| data[[row, feature]] < threshold);

    IsolationNode::Internal {
        feature,
        threshold,
        left: Box::new(build_node(data, &left_rows, depth + 1, max_depth, rng)),
        right: Box::new(build_node(data, &right_rows, depth + 1, max_depth, rng)),
    }
}

/// Isolation-forest anomaly detector.
///
/// Unsupervised: fitted on the same batch it scores. Shorter average
/// isolation paths mean more anomalous rows.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    /// Effective subsample size the trees were grown on
    subsample: usize,
}

impl IsolationForest {
    /// Grow an ensemble over random subsamples of the batch
    pub fn fit(
        data: &Array2<f64>,
        trees: usize,
        subsample: usize,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let rows = data.nrows();
        if rows == 0 {
            return Err(AnalysisError::EmptyDataset);
        }

        let sample_size = subsample.min(rows);
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let mut ensemble = Vec::with_capacity(trees);
        for _ in 0..trees {
            let indices = rand::seq::index::sample(rng, rows, sample_size).into_vec();
            ensemble.push(IsolationTree::build(data, &indices, max_depth, rng));
        }

        Ok(Self {
            trees: ensemble,
            subsample: sample_size,
        })
    }

    /// Anomaly score in (0, 1): `2^(-E[h(x)] / c(subsample))`, higher
    /// means more anomalous
    pub fn score(&self, row: ArrayView1<f64>) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(row)).sum();
        let average = total / self.trees.len() as f64;
        2f64.powf(-average / expected_path_length(self.subsample).max(1.0))
    }

    /// Score every row of a batch, in row order
    pub fn score_all(&self, data: &Array2<f64>) -> Vec<f64> {
        (0..data.nrows()).map(|row| self.score(data.row(row))).collect()
    }
}

/// Label the `round(contamination * N)` highest-scoring rows as
/// anomalies; ties break toward the earlier row.
pub fn label_by_contamination(scores: &[f64], contamination: f64) -> Vec<AnomalyLabel> {
    let flagged = (contamination * scores.len() as f64).round() as usize;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut labels = vec![AnomalyLabel::Normal; scores.len()];
    for &row in order.iter().take(flagged) {
        labels[row] = AnomalyLabel::Anomaly;
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;

    /// A tight cluster near the origin plus one distant outlier
    fn cluster_with_outlier() -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(99);
        let rows = 64;
        let mut data = Array2::zeros((rows, 2));
        for row in 0..rows - 1 {
            data[[row, 0]] = rng.gen_range(0.0..0.1);
            data[[row, 1]] = rng.gen_range(0.0..0.1);
        }
        data[[rows - 1, 0]] = 1.0;
        data[[rows - 1, 1]] = 1.0;
        data
    }

    #[test]
    fn test_outlier_scores_highest() {
        let data = cluster_with_outlier();
        let mut rng = StdRng::seed_from_u64(5);
        let forest = IsolationForest::fit(&data, 100, 256, &mut rng).unwrap();

        let scores = forest.score_all(&data);
        let outlier = data.nrows() - 1;
        let max_row = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(row, _)| row)
            .unwrap();

        assert_eq!(max_row, outlier);
        assert!(scores[outlier] > 0.5, "outlier score was {}", scores[outlier]);
    }

    #[test]
    fn test_same_seed_reproduces_scores() {
        let data = cluster_with_outlier();

        let mut rng = StdRng::seed_from_u64(11);
        let first = IsolationForest::fit(&data, 50, 32, &mut rng)
            .unwrap()
            .score_all(&data);

        let mut rng = StdRng::seed_from_u64(11);
        let second = IsolationForest::fit(&data, 50, 32, &mut rng)
            .unwrap()
            .score_all(&data);

        assert_eq!(first, second);
    }

    #[test]
    fn test_contamination_sets_label_count() {
        let data = {
            let mut rng = StdRng::seed_from_u64(21);
            let mut data = Array2::zeros((1000, 3));
            for value in data.iter_mut() {
                *value = rng.gen_range(0.0..1.0);
            }
            data
        };

        let mut rng = StdRng::seed_from_u64(8);
        let forest = IsolationForest::fit(&data, 100, 256, &mut rng).unwrap();
        let labels = label_by_contamination(&forest.score_all(&data), 0.05);

        let anomalies = labels
            .iter()
            .filter(|&&l| l == AnomalyLabel::Anomaly)
            .count();
        assert_eq!(anomalies, 50);
    }

    #[test]
    fn test_empty_batch_fails() {
        let data = Array2::zeros((0, 2));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            IsolationForest::fit(&data, 10, 256, &mut rng),
            Err(AnalysisError::EmptyDataset)
        ));
    }

    #[test]
    fn test_expected_path_length_known_values() {
        assert_eq!(expected_path_length(0), 0.0);
        assert_eq!(expected_path_length(1), 0.0);
        let c256 = expected_path_length(256);
        assert!(c256 > 9.0 && c256 < 11.0, "c(256) was {c256}");
    }
}
