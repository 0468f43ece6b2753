//! Cluster validity metrics.
//!
//! All metrics work on a *partition*: a list of clusters, each a list of row
//! indices into `data`. Rows that appear in no cluster (DBSCAN noise) are ignored
//! and empty clusters are skipped, so the same code scores k-means and DBSCAN
//! results. Every distance here is the true Euclidean distance.
//!
//! Degenerate inputs resolve to fixed values instead of NaN:
//!
//! | metric          | fewer than two non-empty clusters | other                                   |
//! |-----------------|-----------------------------------|-----------------------------------------|
//! | silhouette      | `0.0`                             | per-point `0.0` when `max(a, b) == 0`   |
//! | Davies–Bouldin  | `0.0`                             | pair ratio `inf` for coincident centroids with spread |
//! | Dunn            | `0.0`                             | `inf` when every cluster has zero diameter |

use crate::error::{Error, Result};
use crate::metric::euclidean;

/// The four quality scores reported for every run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Validity {
    /// Sum over all clustered points of the distance to their centroid (lower is better).
    pub wcss: f64,
    /// Mean silhouette in `[-1, 1]` (higher is better).
    pub silhouette: f64,
    /// Davies–Bouldin index (lower is better).
    pub davies_bouldin: f64,
    /// Dunn index (higher is better).
    pub dunn: f64,
}

/// Groups row indices by their assigned cluster. Always returns `k` lists.
pub fn members(assignments: &[usize], k: usize) -> Vec<Vec<usize>> {
    let mut clusters = vec![Vec::new(); k];
    for (i, &c) in assignments.iter().enumerate() {
        if c < k {
            clusters[c].push(i);
        }
    }
    clusters
}

/// Per-dimension mean of each cluster. Empty clusters yield an empty vector.
pub fn mean_centroids(data: &[Vec<f64>], clusters: &[Vec<usize>]) -> Vec<Vec<f64>> {
    let dim = data.first().map_or(0, Vec::len);
    clusters
        .iter()
        .map(|members| {
            if members.is_empty() {
                return Vec::new();
            }
            let mut sum = vec![0.0; dim];
            for &i in members {
                for (s, x) in sum.iter_mut().zip(&data[i]) {
                    *s += x;
                }
            }
            let n = members.len() as f64;
            sum.into_iter().map(|s| s / n).collect()
        })
        .collect()
}

fn check_partition(data: &[Vec<f64>], clusters: &[Vec<usize>]) -> Result<()> {
    if let Some(&bad) = clusters.iter().flatten().find(|&&i| i >= data.len()) {
        return Err(Error::invalid_config(format!(
            "cluster member {} out of range for {} points",
            bad,
            data.len()
        )));
    }
    Ok(())
}

/// Cluster label of every row, `None` for rows outside every cluster.
fn labels(n: usize, clusters: &[Vec<usize>]) -> Vec<Option<usize>> {
    let mut labels = vec![None; n];
    for (c, members) in clusters.iter().enumerate() {
        for &i in members {
            labels[i] = Some(c);
        }
    }
    labels
}

/// Sum of distances from every clustered point to its cluster's centroid.
pub fn wcss(data: &[Vec<f64>], clusters: &[Vec<usize>], centroids: &[Vec<f64>]) -> Result<f64> {
    check_partition(data, clusters)?;
    let mut total = 0.0;
    for (members, centroid) in clusters.iter().zip(centroids) {
        for &i in members {
            total += euclidean(&data[i], centroid)?;
        }
    }
    Ok(total)
}

/// Mean silhouette over all clustered points.
///
/// For point `i`: `a` is the mean distance to the other members of its cluster
/// (`0` for a singleton), `b` the smallest mean distance to any other non-empty
/// cluster, and `s = (b - a) / max(a, b)`.
pub fn silhouette_score(data: &[Vec<f64>], clusters: &[Vec<usize>]) -> Result<f64> {
    check_partition(data, clusters)?;
    let populated = clusters.iter().filter(|c| !c.is_empty()).count();
    if populated < 2 {
        return Ok(0.0);
    }
    let labels = labels(data.len(), clusters);

    let mut total = 0.0;
    let mut scored = 0_usize;
    for (i, own) in labels.iter().enumerate() {
        let Some(own) = *own else { continue };

        let mut sums = vec![0.0; clusters.len()];
        for (j, label) in labels.iter().enumerate() {
            if i == j {
                continue;
            }
            if let Some(c) = *label {
                sums[c] += euclidean(&data[i], &data[j])?;
            }
        }

        let own_size = clusters[own].len();
        let a = if own_size > 1 {
            sums[own] / (own_size - 1) as f64
        } else {
            0.0
        };
        let b = clusters
            .iter()
            .enumerate()
            .filter(|(c, members)| *c != own && !members.is_empty())
            .map(|(c, members)| sums[c] / members.len() as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        let s = if denom > 0.0 { (b - a) / denom } else { 0.0 };
        total += if s.is_nan() { 0.0 } else { s };
        scored += 1;
    }

    Ok(if scored == 0 { 0.0 } else { total / scored as f64 })
}

/// Davies–Bouldin index: mean over clusters of the worst
/// `(S_i + S_j) / d(c_i, c_j)`, where `S_i` is the mean distance of cluster
/// `i`'s members to its centroid.
pub fn davies_bouldin_index(
    data: &[Vec<f64>],
    clusters: &[Vec<usize>],
    centroids: &[Vec<f64>],
) -> Result<f64> {
    check_partition(data, clusters)?;
    let populated: Vec<usize> = (0..clusters.len().min(centroids.len()))
        .filter(|&c| !clusters[c].is_empty())
        .collect();
    if populated.len() < 2 {
        return Ok(0.0);
    }

    let mut spread = vec![0.0; clusters.len()];
    for &c in &populated {
        let mut sum = 0.0;
        for &i in &clusters[c] {
            sum += euclidean(&data[i], &centroids[c])?;
        }
        spread[c] = sum / clusters[c].len() as f64;
    }

    let mut total = 0.0;
    for &i in &populated {
        let mut worst = 0.0_f64;
        for &j in populated.iter().filter(|&&j| j != i) {
            let separation = euclidean(&centroids[i], &centroids[j])?;
            let scatter = spread[i] + spread[j];
            let ratio = if separation > 0.0 {
                scatter / separation
            } else if scatter > 0.0 {
                f64::INFINITY
            } else {
                0.0
            };
            worst = worst.max(ratio);
        }
        total += worst;
    }
    Ok(total / populated.len() as f64)
}

/// Dunn index: smallest distance between points of different clusters divided
/// by the largest distance between points of the same cluster.
pub fn dunn_index(data: &[Vec<f64>], clusters: &[Vec<usize>]) -> Result<f64> {
    check_partition(data, clusters)?;
    if clusters.iter().filter(|c| !c.is_empty()).count() < 2 {
        return Ok(0.0);
    }
    let labels = labels(data.len(), clusters);
    let clustered: Vec<(usize, usize)> = labels
        .iter()
        .enumerate()
        .filter_map(|(i, l)| l.map(|c| (i, c)))
        .collect();

    let mut min_separation = f64::INFINITY;
    let mut max_diameter = 0.0_f64;
    for (x, &(i, ci)) in clustered.iter().enumerate() {
        for &(j, cj) in &clustered[x + 1..] {
            let d = euclidean(&data[i], &data[j])?;
            if ci == cj {
                max_diameter = max_diameter.max(d);
            } else {
                min_separation = min_separation.min(d);
            }
        }
    }

    if max_diameter == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(min_separation / max_diameter)
}

/// Computes all four metrics for one partition.
pub fn evaluate(
    data: &[Vec<f64>],
    clusters: &[Vec<usize>],
    centroids: &[Vec<f64>],
) -> Result<Validity> {
    Ok(Validity {
        wcss: wcss(data, clusters, centroids)?,
        silhouette: silhouette_score(data, clusters)?,
        davies_bouldin: davies_bouldin_index(data, clusters, centroids)?,
        dunn: dunn_index(data, clusters)?,
    })
}
