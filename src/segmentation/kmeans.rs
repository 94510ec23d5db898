use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    pub k: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Stop once no centroid moves further than this (Euclidean).
    pub tolerance: f64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 4,
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KMeansModel {
    pub centroids: Array2<f64>,
    /// Cluster index per input row.
    pub labels: Vec<usize>,
    pub iterations: usize,
    pub converged: bool,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
}

/// Seeded k-means++ initialization followed by Lloyd iterations.
///
/// Identical input and config always produce identical labels: the RNG is
/// seeded from `config.seed`, distance ties go to the lowest cluster index,
/// and a cluster that loses all its points keeps its previous centroid.
pub fn fit(data: &Array2<f64>, config: &KMeansConfig) -> Result<KMeansModel, PipelineError> {
    let n = data.nrows();
    if config.k == 0 {
        return Err(PipelineError::Configuration("cluster count must be at least 1".into()));
    }
    if config.max_iterations == 0 {
        return Err(PipelineError::Configuration("max iterations must be at least 1".into()));
    }
    if n < config.k {
        return Err(PipelineError::InsufficientData {
            accounts: n,
            clusters: config.k,
        });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centroids = init_plus_plus(data, config.k, &mut rng);
    let mut labels = assign(data, &centroids);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        let updated = recompute_centroids(data, &labels, &centroids);
        let shift = updated
            .outer_iter()
            .zip(centroids.outer_iter())
            .map(|(a, b)| squared_distance(a, b).sqrt())
            .fold(0.0, f64::max);

        centroids = updated;
        labels = assign(data, &centroids);

        if shift <= config.tolerance {
            converged = true;
            break;
        }
    }

    let inertia = data
        .outer_iter()
        .zip(&labels)
        .map(|(row, &label)| squared_distance(row, centroids.row(label)))
        .sum();

    tracing::debug!(iterations, converged, inertia, "k-means finished");

    Ok(KMeansModel {
        centroids,
        labels,
        iterations,
        converged,
        inertia,
    })
}

/// Index of the nearest centroid; ties resolve to the lowest index.
pub fn nearest(point: ArrayView1<f64>, centroids: &Array2<f64>) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (j, c) in centroids.outer_iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best_dist {
            best_dist = d;
            best = j;
        }
    }
    best
}

fn assign(data: &Array2<f64>, centroids: &Array2<f64>) -> Vec<usize> {
    data.outer_iter().map(|row| nearest(row, centroids)).collect()
}

fn init_plus_plus(data: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    chosen.push(rng.gen_range(0..n));

    while chosen.len() < k {
        let dists: Vec<f64> = data
            .outer_iter()
            .map(|row| {
                chosen
                    .iter()
                    .map(|&c| squared_distance(row, data.row(c)))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = dists.iter().sum();

        let next = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = None;
            for (i, d) in dists.iter().enumerate() {
                cumulative += d;
                if *d > 0.0 && cumulative >= target {
                    pick = Some(i);
                    break;
                }
            }
            // Rounding can leave the target just past the final sum.
            pick.or_else(|| dists.iter().rposition(|d| *d > 0.0))
        } else {
            None
        };

        // Every remaining point duplicates a chosen one: take the first unused row.
        let next = next
            .or_else(|| (0..n).find(|i| !chosen.contains(i)))
            .unwrap_or(0);
        chosen.push(next);
    }

    data.select(Axis(0), &chosen)
}

fn recompute_centroids(
    data: &Array2<f64>,
    labels: &[usize],
    previous: &Array2<f64>,
) -> Array2<f64> {
    let k = previous.nrows();
    let mut sums = Array2::<f64>::zeros(previous.dim());
    let mut counts = vec![0usize; k];

    for (row, &label) in data.outer_iter().zip(labels) {
        let mut acc = sums.row_mut(label);
        acc += &row;
        counts[label] += 1;
    }

    for (j, count) in counts.iter().enumerate() {
        if *count == 0 {
            sums.row_mut(j).assign(&previous.row(j));
        } else {
            let mut acc = sums.row_mut(j);
            acc /= *count as f64;
        }
    }
    sums
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Sizes of each cluster, indexed by cluster.
pub fn cluster_sizes(labels: &[usize], k: usize) -> Array1<usize> {
    let mut sizes = Array1::zeros(k);
    for &label in labels {
        if label < k {
            sizes[label] += 1;
        }
    }
    sizes
}
