use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{AnalysisError, Result};

/// K-means clustering engine.
///
/// Seeding uses k-means++ from an explicit seed so identical input and
/// configuration reproduce identical assignments. Cluster ids carry no
/// meaning across runs.
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Number of clusters (k)
    pub clusters: usize,
    /// Iteration cap when assignments do not stabilize earlier
    pub max_iterations: usize,
}

/// Fitted clustering result
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster id in `[0, k)` per row, in row order
    pub assignments: Vec<usize>,
    /// Final centroid per cluster
    pub centroids: Array2<f64>,
    /// Iterations until convergence or cap
    pub iterations: usize,
}

impl KMeans {
    pub fn new(clusters: usize, max_iterations: usize) -> Self {
        Self {
            clusters,
            max_iterations,
        }
    }

    /// Partition rows into k clusters.
    ///
    /// Fails on an empty batch, or when the batch holds fewer rows than
    /// clusters (degenerate clusters are an error, not an output).
    pub fn fit(&self, data: &Array2<f64>, seed: u64) -> Result<KMeansFit> {
        let rows = data.nrows();
        if rows == 0 {
            return Err(AnalysisError::EmptyDataset);
        }
        if rows < self.clusters {
            return Err(AnalysisError::InsufficientRows {
                rows,
                clusters: self.clusters,
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = self.seed_centroids(data, &mut rng);
        let mut assignments: Vec<usize> = vec![0; rows];
        let mut iterations = 0;

        for iteration in 1..=self.max_iterations {
            iterations = iteration;

            // Assign each row to its nearest centroid
            let next: Vec<usize> = (0..rows)
                .map(|row| nearest_centroid(data.row(row), &centroids))
                .collect();

            if iteration > 1 && next == assignments {
                debug!(iterations = iteration, "K-means converged");
                assignments = next;
                break;
            }
            assignments = next;

            // Recompute centroids as member means; an emptied cluster is
            // reseeded to the row farthest from its previous centroid
            let columns = data.ncols();
            let mut sums = vec![Array1::<f64>::zeros(columns); self.clusters];
            let mut counts = vec![0usize; self.clusters];
            for (row, &cluster) in assignments.iter().enumerate() {
                sums[cluster] += &data.row(row);
                counts[cluster] += 1;
            }

            for cluster in 0..self.clusters {
                if counts[cluster] == 0 {
                    let farthest = farthest_row(data, centroids[cluster].view());
                    debug!(cluster, row = farthest, "Reseeding emptied cluster");
                    centroids[cluster] = data.row(farthest).to_owned();
                } else {
                    centroids[cluster] = &sums[cluster] / counts[cluster] as f64;
                }
            }
        }

        let mut centroid_matrix = Array2::zeros((self.clusters, data.ncols()));
        for (cluster, centroid) in centroids.iter().enumerate() {
            centroid_matrix.row_mut(cluster).assign(centroid);
        }

        Ok(KMeansFit {
            assignments,
            centroids: centroid_matrix,
            iterations,
        })
    }

    /// K-means++ seeding: the first centroid is a uniform random row,
    /// each further centroid is drawn with probability proportional to
    /// its squared distance from the nearest chosen centroid.
    fn seed_centroids(&self, data: &Array2<f64>, rng: &mut StdRng) -> Vec<Array1<f64>> {
        let rows = data.nrows();
        let mut centroids: Vec<Array1<f64>> = Vec::with_capacity(self.clusters);
        centroids.push(data.row(rng.gen_range(0..rows)).to_owned());

        while centroids.len() < self.clusters {
            let distances: Vec<f64> = (0..rows)
                .map(|row| {
                    centroids
                        .iter()
                        .map(|c| squared_distance(data.row(row), c.view()))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();

            let total: f64 = distances.iter().sum();
            let chosen = if total > 0.0 {
                let mut draw = rng.gen_range(0.0..total);
                let mut chosen = rows - 1;
                for (row, &distance) in distances.iter().enumerate() {
                    if draw < distance {
                        chosen = row;
                        break;
                    }
                    draw -= distance;
                }
                chosen
            } else {
                // Every remaining row coincides with a centroid
                rng.gen_range(0..rows)
            };

            centroids.push(data.row(chosen).to_owned());
        }

        centroids
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

fn nearest_centroid(row: ArrayView1<f64>, centroids: &[Array1<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (cluster, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(row, centroid.view());
        if distance < best_distance {
            best_distance = distance;
            best = cluster;
        }
    }
    best
}

fn farthest_row(data: &Array2<f64>, centroid: ArrayView1<f64>) -> usize {
    let mut farthest = 0;
    let mut max_distance = f64::NEG_INFINITY;
    for row in 0..data.nrows() {
        let distance = squared_distance(data.row(row), centroid);
        if distance > max_distance {
            max_distance = distance;
            farthest = row;
        }
    }
    farthest
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Four tight groups in two dimensions, two rows each
    fn four_groups() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [10.0, 0.0],
            [10.1, 0.0],
            [0.0, 10.0],
            [0.1, 10.0],
            [10.0, 10.0],
            [10.1, 10.0],
        ]
    }

    #[test]
    fn test_ids_in_range_and_no_empty_cluster() {
        let data = four_groups();
        let fit = KMeans::new(4, 100).fit(&data, 7).unwrap();

        assert_eq!(fit.assignments.len(), data.nrows());
        assert!(fit.assignments.iter().all(|&c| c < 4));

        let mut seen = [false; 4];
        for &cluster in &fit.assignments {
            seen[cluster] = true;
        }
        assert!(seen.iter().all(|&s| s), "every cluster should be non-empty");
    }

    #[test]
    fn test_groups_cluster_together() {
        let data = four_groups();
        let fit = KMeans::new(4, 100).fit(&data, 7).unwrap();

        for pair in fit.assignments.chunks(2) {
            assert_eq!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_same_seed_reproduces_assignments() {
        let data = four_groups();
        let engine = KMeans::new(4, 100);

        let first = engine.fit(&data, 42).unwrap();
        let second = engine.fit(&data, 42).unwrap();

        assert_eq!(first.assignments, second.assignments);
    }

    #[test]
    fn test_fewer_rows_than_clusters_fails() {
        let data = array![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        let err = KMeans::new(4, 100).fit(&data, 0).unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::InsufficientRows { rows: 3, clusters: 4 }
        ));
    }

    #[test]
    fn test_empty_batch_fails() {
        let data = Array2::zeros((0, 2));
        assert!(matches!(
            KMeans::new(4, 100).fit(&data, 0),
            Err(AnalysisError::EmptyDataset)
        ));
    }

    #[test]
    fn test_duplicate_rows_do_not_break_seeding() {
        // More clusters than distinct points forces the zero-distance
        // seeding path; the fit must still return valid ids
        let data = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let fit = KMeans::new(4, 100).fit(&data, 3).unwrap();

        assert!(fit.assignments.iter().all(|&c| c < 4));
    }
}
