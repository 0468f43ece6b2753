//! Update step: centroids move to the mean of their members.

use crate::error::{Error, Result};

/// What to do with a cluster that ends an assignment step with no members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyClusterPolicy {
    /// Keep the cluster's previous centroid and carry on.
    #[default]
    RetainPrevious,
    /// Abort the run with `Error::DegenerateCluster`.
    Fail,
}

/// New centroids plus the clusters that had no members this round.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidUpdate {
    pub centroids: Vec<Vec<f64>>,
    pub empty: Vec<usize>,
}

/// Recomputes every centroid as the per-dimension mean of its members.
///
/// `previous` supplies the number of clusters, the dimensionality and the
/// fallback centroid for empty clusters.
pub fn update_centroids(
    data: &[Vec<f64>],
    assignments: &[usize],
    previous: &[Vec<f64>],
    policy: EmptyClusterPolicy,
) -> Result<CentroidUpdate> {
    let k = previous.len();
    let dim = previous.first().map_or(0, Vec::len);
    if data.len() != assignments.len() {
        return Err(Error::LengthMismatch {
            left: data.len(),
            right: assignments.len(),
        });
    }

    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0_usize; k];
    for (point, &c) in data.iter().zip(assignments) {
        if c >= k {
            return Err(Error::invalid_config(format!(
                "assignment {} outside 0..{}",
                c, k
            )));
        }
        if point.len() != dim {
            return Err(Error::LengthMismatch {
                left: point.len(),
                right: dim,
            });
        }
        counts[c] += 1;
        for (s, x) in sums[c].iter_mut().zip(point) {
            *s += x;
        }
    }

    let mut empty = Vec::new();
    let mut centroids = Vec::with_capacity(k);
    for (j, (sum, count)) in sums.into_iter().zip(counts).enumerate() {
        if count == 0 {
            match policy {
                EmptyClusterPolicy::Fail => return Err(Error::DegenerateCluster(j)),
                EmptyClusterPolicy::RetainPrevious => {
                    log::warn!("cluster {} is empty, keeping its previous centroid", j);
                    empty.push(j);
                    centroids.push(previous[j].clone());
                }
            }
        } else {
            let n = count as f64;
            centroids.push(sum.into_iter().map(|s| s / n).collect());
        }
    }

    Ok(CentroidUpdate { centroids, empty })
}
