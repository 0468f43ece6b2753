//! Distance and similarity functions between weight vectors.
//!
//! The k-means engine never hard-codes a metric: it asks a [`DistanceMetric`]
//! for a score and for which of two scores is "closer". Distances are minimized,
//! similarities are maximized, and the rest of the engine (seeding, assignment,
//! convergence) follows that orientation.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Whether smaller or larger scores mean two vectors are closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Smaller is closer (`0` for identical vectors).
    Distance,
    /// Larger is closer (`1` for vectors pointing the same way).
    Similarity,
}

/// A pluggable score between two equally long weight vectors.
pub trait DistanceMetric: fmt::Debug + Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Score between `a` and `b`. Fails with `LengthMismatch` on unequal lengths.
    fn measure(&self, a: &[f64], b: &[f64]) -> Result<f64>;

    fn orientation(&self) -> Orientation {
        Orientation::Distance
    }

    /// True if `candidate` is strictly closer than `best`.
    fn is_closer(&self, candidate: f64, best: f64) -> bool {
        match self.orientation() {
            Orientation::Distance => candidate < best,
            Orientation::Similarity => candidate > best,
        }
    }

    /// Starting value for a "best so far" search; every real score beats it.
    fn worst(&self) -> f64 {
        match self.orientation() {
            Orientation::Distance => f64::INFINITY,
            Orientation::Similarity => f64::NEG_INFINITY,
        }
    }

    /// Non-negative k-means++ selection weight for a point whose score against
    /// its nearest chosen centroid is `score`. Far points weigh more.
    fn seeding_weight(&self, score: f64) -> f64 {
        match self.orientation() {
            Orientation::Distance => score.max(0.0),
            Orientation::Similarity => (1.0 - score).max(0.0),
        }
    }
}

fn check_lengths(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// `sum((a_i - b_i)^2)`
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> Result<f64> {
    check_lengths(a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum())
}

/// Textbook Euclidean distance, `sqrt(sum((a_i - b_i)^2))`.
pub fn euclidean(a: &[f64], b: &[f64]) -> Result<f64> {
    squared_euclidean(a, b).map(f64::sqrt)
}

/// `(a . b) / (|a| |b|)`.
///
/// Zero vectors have no direction, so the ratio is undefined for them. The
/// sentinel is `1.0` when both vectors are all-zero (they are identical) and
/// `0.0` when only one is (treated as orthogonal).
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64> {
    check_lengths(a, b)?;
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => Ok(1.0),
        (true, false) | (false, true) => Ok(0.0),
        (false, false) => Ok(dot / (norm_a.sqrt() * norm_b.sqrt())),
    }
}

/// Squared Euclidean distance; the default k-means metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean;

impl DistanceMetric for SquaredEuclidean {
    fn name(&self) -> &'static str {
        "squared-euclidean"
    }

    fn measure(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        squared_euclidean(a, b)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl DistanceMetric for Euclidean {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn measure(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        euclidean(a, b)
    }
}

/// Cosine similarity; clusters ballots by the shape of their support rather
/// than its size.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl DistanceMetric for Cosine {
    fn name(&self) -> &'static str {
        "cosine"
    }

    fn measure(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        cosine_similarity(a, b)
    }

    fn orientation(&self) -> Orientation {
        Orientation::Similarity
    }
}

/// Named metric selector used in configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    #[default]
    SquaredEuclidean,
    Euclidean,
    Cosine,
}

impl Metric {
    pub fn as_metric(&self) -> &'static dyn DistanceMetric {
        match self {
            Metric::SquaredEuclidean => &SquaredEuclidean,
            Metric::Euclidean => &Euclidean,
            Metric::Cosine => &Cosine,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_metric().name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "squared-euclidean" => Ok(Metric::SquaredEuclidean),
            "euclidean" => Ok(Metric::Euclidean),
            "cosine" => Ok(Metric::Cosine),
            other => Err(Error::invalid_config(format!("unknown metric '{}'", other))),
        }
    }
}
