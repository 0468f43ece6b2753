//! Parameter sweeps over one ballot set.
//!
//! Each point of a sweep is an independent run on its own copy of the
//! normalized weights with its own random source, so with the `parallel`
//! feature the points are evaluated on the rayon pool and the results are the
//! same as a sequential sweep.

use std::ops::RangeInclusive;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::ballot::{determine_project_count, to_weight_vectors, Ballot};
use crate::dbscan::{Dbscan, DbscanConfig, DbscanRun};
use crate::error::{Error, Result};
use crate::kmeans::{self, KMeansConfig, KMeansRun};

/// Validity scores of one k-means run, for elbow and score curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KScore {
    pub k: usize,
    pub wcss: f64,
    pub silhouette: f64,
    pub davies_bouldin: f64,
    pub dunn: f64,
}

impl From<&KMeansRun> for KScore {
    fn from(run: &KMeansRun) -> Self {
        Self {
            k: run.k,
            wcss: run.wcss(),
            silhouette: run.silhouette_score(),
            davies_bouldin: run.davies_bouldin_index(),
            dunn: run.dunn_index(),
        }
    }
}

/// Seed of the run for `k` in a sweep started from `base`.
pub fn seed_for_k(base: u64, k: usize) -> u64 {
    base.wrapping_add(k as u64)
}

/// Runs k-means for every `k` in `ks`, in ascending order of `k`.
///
/// Every other setting comes from `base`. The run for `k` is seeded with
/// [`seed_for_k`], so it equals `kmeans::run` with `k` and that seed set.
pub fn sweep_k(
    ballots: &[Ballot],
    base: &KMeansConfig,
    ks: RangeInclusive<usize>,
) -> Result<Vec<KMeansRun>> {
    if ks.is_empty() || *ks.start() == 0 {
        return Err(Error::invalid_config(format!(
            "k range {}..={} must be non-empty and start at 1 or above",
            ks.start(),
            ks.end()
        )));
    }
    if ballots.is_empty() {
        return Err(Error::invalid_config("no ballots to cluster"));
    }
    let projects = base
        .projects
        .unwrap_or_else(|| determine_project_count(ballots));
    let weights = to_weight_vectors(ballots, projects, base.weight_units)?;
    let seed = base.seed.unwrap_or_else(|| rand::thread_rng().gen());
    log::debug!(
        "k sweep over {}..={} for {} ballots",
        ks.start(),
        ks.end(),
        ballots.len()
    );

    let run_k = |k: usize| {
        let mut config = base.clone();
        config.k = k;
        config.seed = Some(seed_for_k(seed, k));
        let mut rng = ChaCha20Rng::seed_from_u64(seed_for_k(seed, k));
        kmeans::run_on_weights(
            weights.clone(),
            projects,
            &config,
            config.metric.as_metric(),
            &mut rng,
        )
    };

    #[cfg(feature = "parallel")]
    let runs = ks.into_par_iter().map(run_k).collect();
    #[cfg(not(feature = "parallel"))]
    let runs = ks.map(run_k).collect();
    runs
}

/// Scores of a k sweep.
pub fn scores(runs: &[KMeansRun]) -> Vec<KScore> {
    runs.iter().map(KScore::from).collect()
}

/// Validity scores of one DBSCAN run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbscanScore {
    pub eps: f64,
    pub min_pts: usize,
    pub clusters: usize,
    pub noise: usize,
    pub silhouette: f64,
    pub davies_bouldin: f64,
    pub dunn: f64,
}

impl From<&DbscanRun> for DbscanScore {
    fn from(run: &DbscanRun) -> Self {
        Self {
            eps: run.eps,
            min_pts: run.min_pts,
            clusters: run.cluster_count(),
            noise: run.noise.len(),
            silhouette: run.silhouette_score(),
            davies_bouldin: run.davies_bouldin_index(),
            dunn: run.dunn_index(),
        }
    }
}

/// Best parameters found for one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestParams {
    pub eps: f64,
    pub min_pts: usize,
    pub score: f64,
}

/// Outcome of a DBSCAN grid search.
///
/// Only runs with at least two clusters and a finite score compete; a `None`
/// means no grid point qualified. Ties keep the earlier grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSearch {
    /// One entry per grid point, `eps`-major.
    pub evaluated: Vec<DbscanScore>,
    /// Highest silhouette.
    pub silhouette: Option<BestParams>,
    /// Highest Dunn index.
    pub dunn: Option<BestParams>,
    /// Lowest Davies–Bouldin index.
    pub davies_bouldin: Option<BestParams>,
}

fn best_by(
    scores: &[DbscanScore],
    metric: impl Fn(&DbscanScore) -> f64,
    better: impl Fn(f64, f64) -> bool,
) -> Option<BestParams> {
    let mut best: Option<BestParams> = None;
    for s in scores.iter().filter(|s| s.clusters >= 2) {
        let score = metric(s);
        if !score.is_finite() {
            continue;
        }
        if best.map_or(true, |b| better(score, b.score)) {
            best = Some(BestParams {
                eps: s.eps,
                min_pts: s.min_pts,
                score,
            });
        }
    }
    best
}

/// Runs DBSCAN on every `(eps, min_pts)` pair and picks the best pair per metric.
pub fn grid_search_dbscan(
    data: &[Vec<f64>],
    eps_values: &[f64],
    min_pts_values: &[usize],
) -> Result<GridSearch> {
    let grid: Vec<DbscanConfig> = eps_values
        .iter()
        .flat_map(|&eps| {
            min_pts_values
                .iter()
                .map(move |&min_pts| DbscanConfig::new(eps, min_pts))
        })
        .collect();
    if grid.is_empty() {
        return Err(Error::invalid_config("empty DBSCAN parameter grid"));
    }
    for config in &grid {
        config.validate()?;
    }
    log::debug!("dbscan grid search over {} points", grid.len());

    let fit = |config: &DbscanConfig| {
        Dbscan::with_config(*config)
            .fit(data)
            .map(|run| DbscanScore::from(&run))
    };
    #[cfg(feature = "parallel")]
    let evaluated: Result<Vec<DbscanScore>> = grid.par_iter().map(fit).collect();
    #[cfg(not(feature = "parallel"))]
    let evaluated: Result<Vec<DbscanScore>> = grid.iter().map(fit).collect();
    let evaluated = evaluated?;

    Ok(GridSearch {
        silhouette: best_by(&evaluated, |s| s.silhouette, |a, b| a > b),
        dunn: best_by(&evaluated, |s| s.dunn, |a, b| a > b),
        davies_bouldin: best_by(&evaluated, |s| s.davies_bouldin, |a, b| a < b),
        evaluated,
    })
}
