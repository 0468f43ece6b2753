//! Initial centroid selection.
//!
//! k-means++ picks the first centroid uniformly at random and every following
//! one with probability proportional to how far a point is from its nearest
//! already-chosen centroid (see [`DistanceMetric::seeding_weight`]). The row index
//! of every chosen point is kept so a run can be audited or replayed with
//! [`Seeding::Fixed`].

use rand::seq::index;
use rand::Rng;

use crate::error::{Error, Result};
use crate::metric::DistanceMetric;

/// How a run picks its first `k` centroids.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Seeding {
    /// k-means++ weighted selection.
    #[default]
    PlusPlus,
    /// `k` distinct rows sampled uniformly.
    Random,
    /// Exactly these rows, in this order. Bypasses the random source.
    Fixed(Vec<usize>),
}

/// The chosen starting centroids and the rows they were copied from.
#[derive(Debug, Clone, PartialEq)]
pub struct Seeds {
    pub centroids: Vec<Vec<f64>>,
    pub indices: Vec<usize>,
}

impl Seeds {
    fn from_indices(data: &[Vec<f64>], indices: Vec<usize>) -> Self {
        Self {
            centroids: indices.iter().map(|&i| data[i].clone()).collect(),
            indices,
        }
    }
}

fn check_k(data: &[Vec<f64>], k: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::invalid_config("k must be at least 1"));
    }
    if k > data.len() {
        return Err(Error::invalid_config(format!(
            "k = {} exceeds the number of data points ({})",
            k,
            data.len()
        )));
    }
    Ok(())
}

/// Dispatches to the strategy named by `seeding`.
pub fn seed<R: Rng>(
    data: &[Vec<f64>],
    k: usize,
    seeding: &Seeding,
    metric: &dyn DistanceMetric,
    rng: &mut R,
) -> Result<Seeds> {
    match seeding {
        Seeding::PlusPlus => plus_plus(data, k, metric, rng),
        Seeding::Random => random_sample(data, k, rng),
        Seeding::Fixed(indices) => fixed(data, k, indices),
    }
}

/// k-means++ initialization.
///
/// # Errors
///
/// `InvalidConfiguration` if `k == 0` or `k > data.len()`; `LengthMismatch` if
/// the rows are not all the same length.
pub fn plus_plus<R: Rng>(
    data: &[Vec<f64>],
    k: usize,
    metric: &dyn DistanceMetric,
    rng: &mut R,
) -> Result<Seeds> {
    check_k(data, k)?;
    let n = data.len();

    let first = rng.gen_range(0..n);
    let mut indices = vec![first];
    let mut chosen = vec![false; n];
    chosen[first] = true;

    // score of each point against its nearest chosen centroid
    let mut nearest = data
        .iter()
        .map(|point| metric.measure(point, &data[first]))
        .collect::<Result<Vec<f64>>>()?;

    while indices.len() < k {
        let weights: Vec<f64> = nearest
            .iter()
            .zip(&chosen)
            .map(|(&score, &taken)| {
                if taken {
                    0.0
                } else {
                    metric.seeding_weight(score)
                }
            })
            .collect();

        let next = match roulette(&weights, rng.gen::<f64>()) {
            Some(i) => i,
            None => {
                // every remaining point sits on a chosen centroid
                let remaining: Vec<usize> = (0..n).filter(|&i| !chosen[i]).collect();
                remaining[rng.gen_range(0..remaining.len())]
            }
        };
        log::trace!(
            "k-means++ picked row {} as centroid {}",
            next,
            indices.len()
        );

        chosen[next] = true;
        indices.push(next);
        for (i, point) in data.iter().enumerate() {
            let score = metric.measure(point, &data[next])?;
            if metric.is_closer(score, nearest[i]) {
                nearest[i] = score;
            }
        }
    }

    Ok(Seeds::from_indices(data, indices))
}

/// Cumulative roulette selection: normalizes `weights` into probabilities and
/// returns the first index whose running total exceeds `sample` in `[0, 1)`.
/// Returns `None` when there is nothing to select from.
fn roulette(weights: &[f64], sample: f64) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w / total;
        last_positive = Some(i);
        if sample < cumulative {
            return Some(i);
        }
    }
    // rounding can leave the running total a hair under 1.0
    last_positive
}

/// `k` distinct rows drawn uniformly.
pub fn random_sample<R: Rng>(data: &[Vec<f64>], k: usize, rng: &mut R) -> Result<Seeds> {
    check_k(data, k)?;
    let indices = index::sample(rng, data.len(), k).into_vec();
    Ok(Seeds::from_indices(data, indices))
}

/// Uses the caller's rows as the starting centroids.
pub fn fixed(data: &[Vec<f64>], k: usize, indices: &[usize]) -> Result<Seeds> {
    check_k(data, k)?;
    if indices.len() != k {
        return Err(Error::invalid_config(format!(
            "{} fixed seed indices given for k = {}",
            indices.len(),
            k
        )));
    }
    if let Some(&bad) = indices.iter().find(|&&i| i >= data.len()) {
        return Err(Error::invalid_config(format!(
            "fixed seed index {} out of range for {} data points",
            bad,
            data.len()
        )));
    }
    Ok(Seeds::from_indices(data, indices.to_vec()))
}
