//! Quadratic-funding allocations, plain and cluster-discounted.
//!
//! Traditional QF gives project `p` the amount `(sum over voters of sqrt(w))^2`.
//! The cluster-discounted form multiplies every voter's contribution by a
//! coefficient derived from the size of the cluster the voter landed in, so that
//! voters who behave alike count for less than the same number of independent
//! voters. Two coefficient schemes and two combination orders give four variants:
//!
//! | scheme         | coefficient          |
//! |----------------|----------------------|
//! | `Proportional` | `size / n`           |
//! | `Complement`   | `1 - size / n`       |
//!
//! | order          | per-project amount                 |
//! |----------------|------------------------------------|
//! | `SquareAfter`  | `(sum sqrt(w * c))^2`              |
//! | `SquareBefore` | `(sum sqrt(w) * c)^2`              |
//!
//! A cluster with no members has coefficient `1.0`, and a voter whose cluster
//! has no coefficient entry is also weighted `1.0` (no discount).

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Coefficient applied where no discount applies.
pub const NO_DISCOUNT: f64 = 1.0;

/// How a cluster's size becomes its coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoefficientScheme {
    /// `size / n`
    Proportional,
    /// `1 - size / n`
    #[default]
    Complement,
}

/// Whether the coefficient is applied under or outside the square root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CombinationOrder {
    /// `sqrt(weight * coefficient)`
    #[default]
    SquareAfter,
    /// `sqrt(weight) * coefficient`
    SquareBefore,
}

/// One of the four allocation variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AllocationScheme {
    pub coefficient: CoefficientScheme,
    pub order: CombinationOrder,
}

impl AllocationScheme {
    /// Every variant, in a stable order.
    pub const ALL: [AllocationScheme; 4] = [
        AllocationScheme::new(CoefficientScheme::Proportional, CombinationOrder::SquareAfter),
        AllocationScheme::new(CoefficientScheme::Proportional, CombinationOrder::SquareBefore),
        AllocationScheme::new(CoefficientScheme::Complement, CombinationOrder::SquareAfter),
        AllocationScheme::new(CoefficientScheme::Complement, CombinationOrder::SquareBefore),
    ];

    pub const fn new(coefficient: CoefficientScheme, order: CombinationOrder) -> Self {
        Self { coefficient, order }
    }
}

impl fmt::Display for CoefficientScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoefficientScheme::Proportional => "proportional",
            CoefficientScheme::Complement => "complement",
        })
    }
}

impl FromStr for CoefficientScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "proportional" => Ok(CoefficientScheme::Proportional),
            "complement" => Ok(CoefficientScheme::Complement),
            other => Err(Error::invalid_config(format!(
                "unknown coefficient scheme '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for CombinationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CombinationOrder::SquareAfter => "square-after",
            CombinationOrder::SquareBefore => "square-before",
        })
    }
}

impl FromStr for CombinationOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "square-after" => Ok(CombinationOrder::SquareAfter),
            "square-before" => Ok(CombinationOrder::SquareBefore),
            other => Err(Error::invalid_config(format!(
                "unknown combination order '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AllocationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.coefficient, self.order)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cluster {
    pub index: usize,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficient {
    pub cluster_index: usize,
    pub value: f64,
}

/// The coefficient that ended up applied to one voter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoterCoefficient {
    pub voter_index: usize,
    pub cluster_index: usize,
    pub value: f64,
}

/// Per-project outcome of one allocation variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub scheme: AllocationScheme,
    pub coefficients: Vec<Coefficient>,
    pub voter_coefficients: Vec<VoterCoefficient>,
    pub traditional_qf: Vec<f64>,
    pub cluster_qf: Vec<f64>,
    /// `traditional_qf[p] - cluster_qf[p]`
    pub penalties: Vec<f64>,
}

/// Member count of each of the `k` clusters. Sizes sum to `assignments.len()`.
pub fn cluster_sizes(assignments: &[usize], k: usize) -> Result<Vec<Cluster>> {
    let mut clusters: Vec<Cluster> = (0..k).map(|index| Cluster { index, size: 0 }).collect();
    for &c in assignments {
        match clusters.get_mut(c) {
            Some(cluster) => cluster.size += 1,
            None => {
                return Err(Error::invalid_config(format!(
                    "assignment {} outside 0..{}",
                    c, k
                )))
            }
        }
    }
    Ok(clusters)
}

/// Coefficient for every cluster given `voters` voters in total.
pub fn coefficients(clusters: &[Cluster], voters: usize, scheme: CoefficientScheme) -> Vec<Coefficient> {
    clusters
        .iter()
        .map(|cluster| {
            let value = if cluster.size == 0 || voters == 0 {
                NO_DISCOUNT
            } else {
                let share = cluster.size as f64 / voters as f64;
                match scheme {
                    CoefficientScheme::Proportional => share,
                    CoefficientScheme::Complement => 1.0 - share,
                }
            };
            Coefficient {
                cluster_index: cluster.index,
                value,
            }
        })
        .collect()
}

/// Looks up each voter's coefficient by cluster index.
pub fn voter_coefficients(assignments: &[usize], coefficients: &[Coefficient]) -> Vec<VoterCoefficient> {
    assignments
        .iter()
        .enumerate()
        .map(|(voter_index, &cluster_index)| VoterCoefficient {
            voter_index,
            cluster_index,
            value: coefficients
                .iter()
                .find(|c| c.cluster_index == cluster_index)
                .map_or(NO_DISCOUNT, |c| c.value),
        })
        .collect()
}

/// `(sum over voters of sqrt(weight))^2` for the 0-based `project` column.
pub fn traditional_qf(weights: &[Vec<f64>], project: usize) -> f64 {
    let sum: f64 = weights
        .iter()
        .map(|w| w.get(project).copied().unwrap_or(0.0).sqrt())
        .sum();
    sum * sum
}

/// Traditional QF for every project column.
pub fn traditional_qf_all(weights: &[Vec<f64>], projects: usize) -> Vec<f64> {
    (0..projects).map(|p| traditional_qf(weights, p)).collect()
}

/// Cluster-discounted QF for the 0-based `project` column, with one coefficient
/// per voter.
pub fn cluster_qf(
    weights: &[Vec<f64>],
    voter_coefficients: &[f64],
    project: usize,
    order: CombinationOrder,
) -> f64 {
    let sum: f64 = weights
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let weight = w.get(project).copied().unwrap_or(0.0);
            let c = voter_coefficients.get(i).copied().unwrap_or(NO_DISCOUNT);
            match order {
                CombinationOrder::SquareAfter => (weight * c).sqrt(),
                CombinationOrder::SquareBefore => weight.sqrt() * c,
            }
        })
        .sum();
    sum * sum
}

/// Computes one allocation variant from a finished clustering.
pub fn allocate(
    weights: &[Vec<f64>],
    projects: usize,
    assignments: &[usize],
    k: usize,
    scheme: AllocationScheme,
) -> Result<Allocation> {
    if weights.len() != assignments.len() {
        return Err(Error::LengthMismatch {
            left: weights.len(),
            right: assignments.len(),
        });
    }
    let clusters = cluster_sizes(assignments, k)?;
    let coefficients = coefficients(&clusters, weights.len(), scheme.coefficient);
    let voter_coefficients = voter_coefficients(assignments, &coefficients);
    let per_voter: Vec<f64> = voter_coefficients.iter().map(|v| v.value).collect();

    let traditional_qf = traditional_qf_all(weights, projects);
    let cluster_qf: Vec<f64> = (0..projects)
        .map(|p| cluster_qf(weights, &per_voter, p, scheme.order))
        .collect();
    let penalties = traditional_qf
        .iter()
        .zip(&cluster_qf)
        .map(|(t, c)| t - c)
        .collect();

    Ok(Allocation {
        scheme,
        coefficients,
        voter_coefficients,
        traditional_qf,
        cluster_qf,
        penalties,
    })
}
