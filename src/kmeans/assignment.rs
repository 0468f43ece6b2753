//! Assignment step: every point goes to its nearest centroid.

use crate::error::{Error, Result};
use crate::metric::DistanceMetric;

/// True if both slices hold exactly the same bit patterns.
fn bit_identical(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

/// Index of the centroid closest to `point` under `metric`.
///
/// A point bit-identical to a centroid is assigned to the first such centroid
/// without scoring the rest. Otherwise the best score wins: the smallest
/// distance, or the largest similarity for similarity metrics. Ties keep the
/// earlier centroid.
pub fn nearest_centroid(
    point: &[f64],
    centroids: &[Vec<f64>],
    metric: &dyn DistanceMetric,
) -> Result<usize> {
    if centroids.is_empty() {
        return Err(Error::invalid_config("no centroids to assign to"));
    }
    if let Some(exact) = centroids.iter().position(|c| bit_identical(point, c)) {
        return Ok(exact);
    }

    let mut best = 0;
    let mut best_score = metric.worst();
    for (j, centroid) in centroids.iter().enumerate() {
        let score = metric.measure(point, centroid)?;
        if metric.is_closer(score, best_score) {
            best_score = score;
            best = j;
        }
    }
    Ok(best)
}

/// Assigns every row of `data` to its nearest centroid. The result has one
/// entry per row, each in `0..centroids.len()`.
pub fn assign(
    data: &[Vec<f64>],
    centroids: &[Vec<f64>],
    metric: &dyn DistanceMetric,
) -> Result<Vec<usize>> {
    data.iter()
        .map(|point| nearest_centroid(point, centroids, metric))
        .collect()
}
