//! k-means over normalized ballots.
//!
//! One engine serves every metric and seeding strategy: the metric is injected as
//! a [`DistanceMetric`] and the seeding strategy as a [`Seeding`] value. A run is
//! a pure function of the ballots, the [`KMeansConfig`] and the random source,
//! and returns an immutable [`KMeansRun`].
//!
//! # Example
//!
//! ```
//! use qf_cluster::{kmeans, Ballot, KMeansConfig};
//!
//! let ballots = vec![
//!     Ballot::from_pairs(&[(1, 5.0), (2, 5.0)]),
//!     Ballot::from_pairs(&[(1, 9.0)]),
//!     Ballot::from_pairs(&[(1, 9.0)]),
//! ];
//! let config = KMeansConfig::new(2).with_fixed_seeds(vec![0, 1]);
//! let run = kmeans::run(&ballots, &config).unwrap();
//!
//! assert_eq!(run.assignments, vec![0, 1, 1]);
//! assert_eq!(run.cluster_qf().len(), 2);
//! ```

pub mod assignment;
pub mod centroid;
pub mod convergence;
pub mod seeding;

#[cfg(test)]
mod tests;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::allocation::{self, Allocation, AllocationScheme, Cluster};
use crate::ballot::{determine_project_count, to_weight_vectors, Ballot, WeightUnits};
use crate::error::{Error, Result};
use crate::metric::{DistanceMetric, Metric};
use crate::validity::{self, Validity};

pub use assignment::{assign, nearest_centroid};
pub use centroid::{update_centroids, CentroidUpdate, EmptyClusterPolicy};
pub use convergence::{cosine_converged, has_converged, magnitude_converged};
pub use seeding::{Seeding, Seeds};

/// Default iteration cap.
pub const MAX_ITERATIONS: usize = 100;
/// Default convergence tolerance.
pub const TOLERANCE: f64 = 0.1;

/// Configuration options for one k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansConfig {
    /// Number of clusters to find.
    pub k: usize,
    /// Maximum number of assign/update passes. Hitting it is not an error.
    pub max_iterations: usize,
    /// Convergence tolerance, interpreted by the metric's convergence test.
    pub tolerance: f64,
    pub metric: Metric,
    pub seeding: Seeding,
    pub empty_cluster: EmptyClusterPolicy,
    /// Allocation variant stored in [`KMeansRun::allocation`].
    pub scheme: AllocationScheme,
    pub weight_units: WeightUnits,
    /// Project count of the round. Derived from the ballots when `None`.
    pub projects: Option<usize>,
    /// Seed for the random source. Drawn from the thread RNG when `None`.
    pub seed: Option<u64>,
}

impl KMeansConfig {
    /// Create a new config with default values for everything but `k`.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: MAX_ITERATIONS,
            tolerance: TOLERANCE,
            metric: Metric::default(),
            seeding: Seeding::default(),
            empty_cluster: EmptyClusterPolicy::default(),
            scheme: AllocationScheme::default(),
            weight_units: WeightUnits::default(),
            projects: None,
            seed: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_seeding(mut self, seeding: Seeding) -> Self {
        self.seeding = seeding;
        self
    }

    /// Start from these rows instead of drawing seeds at random.
    pub fn with_fixed_seeds(self, indices: Vec<usize>) -> Self {
        self.with_seeding(Seeding::Fixed(indices))
    }

    pub fn with_empty_cluster_policy(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_cluster = policy;
        self
    }

    pub fn with_scheme(mut self, scheme: AllocationScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_weight_units(mut self, units: WeightUnits) -> Self {
        self.weight_units = units;
        self
    }

    pub fn with_projects(mut self, projects: usize) -> Self {
        self.projects = Some(projects);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks the configuration against a dataset of `n` points.
    pub fn validate(&self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(Error::invalid_config("no ballots to cluster"));
        }
        if self.k == 0 {
            return Err(Error::invalid_config("k must be at least 1"));
        }
        if self.k > n {
            return Err(Error::invalid_config(format!(
                "k = {} exceeds the number of ballots ({})",
                self.k, n
            )));
        }
        if self.max_iterations < 1 {
            return Err(Error::invalid_config("max_iterations must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::invalid_config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.projects == Some(0) {
            return Err(Error::invalid_config("projects must be at least 1"));
        }
        if let Seeding::Fixed(indices) = &self.seeding {
            if indices.len() != self.k {
                return Err(Error::invalid_config(format!(
                    "{} fixed seed indices given for k = {}",
                    indices.len(),
                    self.k
                )));
            }
            if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
                return Err(Error::invalid_config(format!(
                    "fixed seed index {} out of range for {} ballots",
                    bad, n
                )));
            }
        }
        Ok(())
    }

    /// The random source a run uses when none is supplied.
    pub fn rng(&self) -> ChaCha20Rng {
        let seed = self.seed.unwrap_or_else(|| rand::thread_rng().gen());
        ChaCha20Rng::seed_from_u64(seed)
    }
}

/// Output of the iterative part of k-means on raw weight vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub centroids: Vec<Vec<f64>>,
    /// Cluster of every row, each in `0..k`.
    pub assignments: Vec<usize>,
    /// Rows the starting centroids were copied from.
    pub initial_centroids: Vec<usize>,
    /// Assign/update passes performed.
    pub iterations: usize,
    pub converged: bool,
    /// Clusters that were empty after the final assignment.
    pub empty_clusters: Vec<usize>,
}

fn check_rectangular(data: &[Vec<f64>]) -> Result<usize> {
    let dim = data.first().map_or(0, Vec::len);
    if dim == 0 {
        return Err(Error::invalid_config(
            "data points must have at least one dimension",
        ));
    }
    if let Some(row) = data.iter().find(|row| row.len() != dim) {
        return Err(Error::LengthMismatch {
            left: row.len(),
            right: dim,
        });
    }
    Ok(dim)
}

/// Runs seeding and the assign/update loop on already normalized vectors.
///
/// The loop stops at the first pass whose centroid update passes the metric's
/// convergence test, or after `max_iterations` passes. The assignments are the
/// ones computed in the last pass; the centroids are that pass's update.
pub fn cluster<R: Rng>(
    data: &[Vec<f64>],
    config: &KMeansConfig,
    metric: &dyn DistanceMetric,
    rng: &mut R,
) -> Result<Clustering> {
    config.validate(data.len())?;
    let dim = check_rectangular(data)?;
    log::debug!(
        "k-means: k={} n={} dim={} metric={} seeding={:?}",
        config.k,
        data.len(),
        dim,
        metric.name(),
        config.seeding
    );

    let seeds = seeding::seed(data, config.k, &config.seeding, metric, rng)?;
    let mut centroids = seeds.centroids;
    let mut assignments = Vec::new();
    let mut empty_clusters = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        // 1. Assignment step: nearest centroid under the metric
        assignments = assign(data, &centroids, metric)?;

        // 2. Update step: per-dimension mean of each cluster
        let update = update_centroids(data, &assignments, &centroids, config.empty_cluster)?;

        // 3. Convergence: compare the centroids before and after the update
        converged = has_converged(&centroids, &update.centroids, config.tolerance, metric)?;
        log::trace!("k-means pass {}: converged={}", iterations, converged);
        centroids = update.centroids;
        empty_clusters = update.empty;
        if converged {
            break;
        }
    }

    if converged {
        log::debug!("k-means converged after {} passes", iterations);
    } else {
        log::warn!(
            "k-means hit the iteration cap ({}) without converging",
            config.max_iterations
        );
    }

    Ok(Clustering {
        centroids,
        assignments,
        initial_centroids: seeds.indices,
        iterations,
        converged,
        empty_clusters,
    })
}

/// Immutable result of a full k-means QF run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansRun {
    pub k: usize,
    pub projects: usize,
    /// Normalized weight vectors, one per voter.
    pub weights: Vec<Vec<f64>>,
    pub centroids: Vec<Vec<f64>>,
    pub assignments: Vec<usize>,
    pub clusters: Vec<Cluster>,
    /// Rows used as the starting centroids.
    pub initial_centroids: Vec<usize>,
    pub iterations: usize,
    pub converged: bool,
    pub empty_clusters: Vec<usize>,
    pub validity: Validity,
    /// Allocation for the configured scheme.
    pub allocation: Allocation,
}

impl KMeansRun {
    pub fn wcss(&self) -> f64 {
        self.validity.wcss
    }

    pub fn silhouette_score(&self) -> f64 {
        self.validity.silhouette
    }

    pub fn davies_bouldin_index(&self) -> f64 {
        self.validity.davies_bouldin
    }

    pub fn dunn_index(&self) -> f64 {
        self.validity.dunn
    }

    pub fn traditional_qf(&self) -> &[f64] {
        &self.allocation.traditional_qf
    }

    pub fn cluster_qf(&self) -> &[f64] {
        &self.allocation.cluster_qf
    }

    pub fn penalties(&self) -> &[f64] {
        &self.allocation.penalties
    }

    /// Recomputes the allocation for another variant on the same clustering.
    pub fn allocate(&self, scheme: AllocationScheme) -> Result<Allocation> {
        allocation::allocate(&self.weights, self.projects, &self.assignments, self.k, scheme)
    }

    /// All four allocation variants, in [`AllocationScheme::ALL`] order.
    pub fn allocate_all(&self) -> Result<Vec<Allocation>> {
        let schemes = AllocationScheme::ALL;
        #[cfg(feature = "parallel")]
        let variants = schemes.par_iter();
        #[cfg(not(feature = "parallel"))]
        let variants = schemes.iter();
        variants.map(|&scheme| self.allocate(scheme)).collect()
    }
}

/// Runs k-means QF with the configured metric and a random source built from
/// `config.seed`.
pub fn run(ballots: &[Ballot], config: &KMeansConfig) -> Result<KMeansRun> {
    let mut rng = config.rng();
    run_with_rng(ballots, config, &mut rng)
}

/// Like [`run`] with a caller-supplied random source.
pub fn run_with_rng<R: Rng>(
    ballots: &[Ballot],
    config: &KMeansConfig,
    rng: &mut R,
) -> Result<KMeansRun> {
    run_with_metric(ballots, config, config.metric.as_metric(), rng)
}

/// Like [`run_with_rng`] with a caller-supplied metric; `config.metric` is ignored.
pub fn run_with_metric<R: Rng>(
    ballots: &[Ballot],
    config: &KMeansConfig,
    metric: &dyn DistanceMetric,
    rng: &mut R,
) -> Result<KMeansRun> {
    config.validate(ballots.len())?;
    let projects = config
        .projects
        .unwrap_or_else(|| determine_project_count(ballots));
    let weights = to_weight_vectors(ballots, projects, config.weight_units)?;
    run_on_weights(weights, projects, config, metric, rng)
}

pub(crate) fn run_on_weights<R: Rng>(
    weights: Vec<Vec<f64>>,
    projects: usize,
    config: &KMeansConfig,
    metric: &dyn DistanceMetric,
    rng: &mut R,
) -> Result<KMeansRun> {
    let clustering = cluster(&weights, config, metric, rng)?;

    let members = validity::members(&clustering.assignments, config.k);
    let validity = validity::evaluate(&weights, &members, &clustering.centroids)?;
    let allocation = allocation::allocate(
        &weights,
        projects,
        &clustering.assignments,
        config.k,
        config.scheme,
    )?;
    let clusters = allocation::cluster_sizes(&clustering.assignments, config.k)?;

    Ok(KMeansRun {
        k: config.k,
        projects,
        weights,
        centroids: clustering.centroids,
        assignments: clustering.assignments,
        clusters,
        initial_centroids: clustering.initial_centroids,
        iterations: clustering.iterations,
        converged: clustering.converged,
        empty_clusters: clustering.empty_clusters,
        validity,
        allocation,
    })
}
