//! K-means partitioning of incidents into vehicle groups.
//!
//! Lloyd iterations seeded with k-means++, repeated over several restarts;
//! the restart with the lowest inertia wins. Geographic point clouds mix dense
//! urban clusters with rural outliers, so a single seeding regularly lands in
//! a poor local optimum.

use crate::error::{PipelineError, Result};
use crate::models::NormalizedPoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

type Xy = [f64; 2];

/// Configuration for the partitioner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Number of independent k-means++ seedings (at least one is run)
    pub n_init: usize,
    /// Lloyd iteration cap per restart
    pub max_iter: usize,
    /// Convergence threshold relative to the mean coordinate variance
    pub tolerance: f64,
    /// Fixed seed for reproducible runs; a random one is drawn when absent
    pub seed: Option<u64>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: None,
        }
    }
}

/// Cluster assignment for every input point.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// `labels[i]` is the cluster of the i-th input point.
    pub labels: Vec<usize>,
    /// Number of non-empty clusters; labels are exactly `0..cluster_count`.
    pub cluster_count: usize,
    /// Sum of squared distances from each point to its cluster mean.
    pub inertia: f64,
    pub seed: u64,
}

#[derive(Debug, Clone)]
struct Run {
    labels: Vec<usize>,
    inertia: f64,
    iterations: usize,
}

/// Partition points into at most `n` groups.
///
/// With M distinct points and `n <= M` every one of the `n` groups is populated.
/// Fewer distinct points than `n` yields fewer groups; the caller decides how
/// to report that.
pub fn partition(points: &[NormalizedPoint], n: usize, config: &KMeansConfig) -> Result<Partition> {
    if n == 0 {
        return Err(PipelineError::InvalidClusterCount { requested: 0 });
    }
    if let Some(point) = points
        .iter()
        .find(|point| !point.lon.is_finite() || !point.lat.is_finite())
    {
        tracing::warn!("Incident {} has a non-finite coordinate", point.id);
        return Err(PipelineError::InvalidClusterCount {
            requested: i64::try_from(n).unwrap_or(i64::MAX),
        });
    }

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    if points.is_empty() {
        return Ok(Partition {
            labels: Vec::new(),
            cluster_count: 0,
            inertia: 0.0,
            seed,
        });
    }

    let coords: Vec<Xy> = points.iter().map(|point| [point.lon, point.lat]).collect();
    let k = n.min(coords.len());
    let tolerance = config.tolerance * mean_variance(&coords);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut best: Option<Run> = None;
    for restart in 0..config.n_init.max(1) {
        let centers = kmeans_plus_plus(&coords, k, &mut rng);
        let run = lloyd(&coords, centers, config.max_iter, tolerance);
        tracing::trace!(
            "k-means restart {}: inertia {:.6} after {} iterations",
            restart,
            run.inertia,
            run.iterations
        );
        if best.as_ref().map_or(true, |current| run.inertia < current.inertia) {
            best = Some(run);
        }
    }

    let Some(best) = best else {
        return Err(PipelineError::InvalidClusterCount {
            requested: i64::try_from(n).unwrap_or(i64::MAX),
        });
    };
    let (labels, cluster_count) = compact_labels(&best.labels);
    tracing::debug!(
        "Partitioned {} points into {} groups (requested {}, inertia {:.6})",
        coords.len(),
        cluster_count,
        n,
        best.inertia
    );

    Ok(Partition {
        labels,
        cluster_count,
        inertia: best.inertia,
        seed,
    })
}

fn dist2(a: &Xy, b: &Xy) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

fn mean_variance(coords: &[Xy]) -> f64 {
    let m = coords.len() as f64;
    let mut total = 0.0;
    for dim in 0..2 {
        let mean = coords.iter().map(|c| c[dim]).sum::<f64>() / m;
        total += coords.iter().map(|c| (c[dim] - mean).powi(2)).sum::<f64>() / m;
    }
    total / 2.0
}

/// k-means++ seeding: each new center is drawn with probability proportional
/// to its squared distance from the nearest center chosen so far.
fn kmeans_plus_plus(coords: &[Xy], k: usize, rng: &mut StdRng) -> Vec<Xy> {
    let mut centers = Vec::with_capacity(k);
    let first = coords[rng.random_range(0..coords.len())];
    centers.push(first);
    let mut closest: Vec<f64> = coords.iter().map(|c| dist2(c, &first)).collect();

    while centers.len() < k {
        let total: f64 = closest.iter().sum();
        let index = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = None;
            let mut last_positive = 0;
            for (i, d) in closest.iter().enumerate() {
                if *d <= 0.0 {
                    continue;
                }
                last_positive = i;
                target -= d;
                if target < 0.0 {
                    chosen = Some(i);
                    break;
                }
            }
            chosen.unwrap_or(last_positive)
        } else {
            // Every point sits on a center already.
            rng.random_range(0..coords.len())
        };

        let center = coords[index];
        for (d, c) in closest.iter_mut().zip(coords) {
            *d = d.min(dist2(c, &center));
        }
        centers.push(center);
    }

    centers
}

fn lloyd(coords: &[Xy], mut centers: Vec<Xy>, max_iter: usize, tolerance: f64) -> Run {
    let mut labels = vec![0usize; coords.len()];
    assign(coords, &centers, &mut labels);
    reseed_empty(coords, &mut centers, &mut labels);

    let mut iterations = 0;
    for _ in 0..max_iter.max(1) {
        iterations += 1;
        let updated = update_centers(coords, &labels, &centers);
        let shift: f64 = centers
            .iter()
            .zip(&updated)
            .map(|(old, new)| dist2(old, new))
            .sum();
        centers = updated;

        let changed = assign(coords, &centers, &mut labels);
        let relocated = reseed_empty(coords, &mut centers, &mut labels);
        if relocated {
            continue;
        }
        if !changed || shift <= tolerance {
            break;
        }
    }

    let centers = update_centers(coords, &labels, &centers);
    let inertia = coords
        .iter()
        .zip(&labels)
        .map(|(c, &label)| dist2(c, &centers[label]))
        .sum();

    Run {
        labels,
        inertia,
        iterations,
    }
}

/// Assign each point to its nearest center. Returns true if any label moved.
fn assign(coords: &[Xy], centers: &[Xy], labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (c, label) in coords.iter().zip(labels.iter_mut()) {
        let mut best_cluster = 0;
        let mut best_dist = f64::INFINITY;
        for (j, center) in centers.iter().enumerate() {
            let d = dist2(c, center);
            if d < best_dist {
                best_dist = d;
                best_cluster = j;
            }
        }
        if *label != best_cluster {
            *label = best_cluster;
            changed = true;
        }
    }
    changed
}

/// Give every empty cluster the point farthest from its own center, taken
/// from a cluster that keeps at least one member. Returns true on any move.
fn reseed_empty(coords: &[Xy], centers: &mut [Xy], labels: &mut [usize]) -> bool {
    let mut counts = vec![0usize; centers.len()];
    for &label in labels.iter() {
        counts[label] += 1;
    }

    let mut relocated = false;
    for cluster in 0..centers.len() {
        if counts[cluster] > 0 {
            continue;
        }
        let candidate = coords
            .iter()
            .enumerate()
            .filter(|(i, _)| counts[labels[*i]] > 1)
            .map(|(i, c)| (i, dist2(c, &centers[labels[i]])))
            .filter(|(_, d)| *d > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let Some((index, _)) = candidate else {
            continue;
        };

        counts[labels[index]] -= 1;
        labels[index] = cluster;
        counts[cluster] = 1;
        centers[cluster] = coords[index];
        relocated = true;
    }
    relocated
}

fn update_centers(coords: &[Xy], labels: &[usize], previous: &[Xy]) -> Vec<Xy> {
    let k = previous.len();
    let mut sums = vec![[0.0, 0.0]; k];
    let mut counts = vec![0usize; k];
    for (c, &label) in coords.iter().zip(labels) {
        sums[label][0] += c[0];
        sums[label][1] += c[1];
        counts[label] += 1;
    }
    (0..k)
        .map(|j| {
            if counts[j] > 0 {
                [sums[j][0] / counts[j] as f64, sums[j][1] / counts[j] as f64]
            } else {
                previous[j]
            }
        })
        .collect()
}

/// Renumber clusters in order of first appearance, dropping unused ids.
fn compact_labels(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: Vec<Option<usize>> = Vec::new();
    let mut next = 0;
    let compacted = labels
        .iter()
        .map(|&label| {
            if label >= mapping.len() {
                mapping.resize(label + 1, None);
            }
            *mapping[label].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect();
    (compacted, next)
}
