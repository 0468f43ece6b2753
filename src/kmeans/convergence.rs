//! Stopping test between two consecutive sets of centroids.
//!
//! Distance metrics compare coordinates; similarity metrics compare directions,
//! since a cosine centroid can change length without moving.

use approx::AbsDiffEq;

use crate::error::{Error, Result};
use crate::metric::{cosine_similarity, DistanceMetric, Orientation};

fn check_shapes(old: &[Vec<f64>], new: &[Vec<f64>]) -> Result<()> {
    if old.len() != new.len() {
        return Err(Error::LengthMismatch {
            left: old.len(),
            right: new.len(),
        });
    }
    for (a, b) in old.iter().zip(new) {
        if a.len() != b.len() {
            return Err(Error::LengthMismatch {
                left: a.len(),
                right: b.len(),
            });
        }
    }
    Ok(())
}

/// Converged iff every coordinate of every centroid moved by at most `tolerance`.
pub fn magnitude_converged(old: &[Vec<f64>], new: &[Vec<f64>], tolerance: f64) -> Result<bool> {
    check_shapes(old, new)?;
    Ok(old
        .iter()
        .flatten()
        .zip(new.iter().flatten())
        .all(|(a, b)| a.abs_diff_eq(b, tolerance)))
}

/// Converged iff every centroid kept its direction: `|1 - cos(old, new)| <= tolerance`.
pub fn cosine_converged(old: &[Vec<f64>], new: &[Vec<f64>], tolerance: f64) -> Result<bool> {
    check_shapes(old, new)?;
    for (a, b) in old.iter().zip(new) {
        if (1.0 - cosine_similarity(a, b)?).abs() > tolerance {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Picks the convergence test that matches the metric's orientation.
pub fn has_converged(
    old: &[Vec<f64>],
    new: &[Vec<f64>],
    tolerance: f64,
    metric: &dyn DistanceMetric,
) -> Result<bool> {
    match metric.orientation() {
        Orientation::Distance => magnitude_converged(old, new, tolerance),
        Orientation::Similarity => cosine_converged(old, new, tolerance),
    }
}
