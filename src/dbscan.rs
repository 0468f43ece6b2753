//! Density-based clustering of ballots.
//!
//! A point whose `eps`-neighbourhood (itself included, boundary excluded) holds
//! at least `min_pts` points is a core point. Clusters grow breadth-first from
//! core points; points reachable from no core point are noise and belong to no
//! cluster. The same
//! validity metrics used for k-means are computed against the resulting
//! partition, with noise rows left out.

use std::collections::VecDeque;

use crate::ballot::{determine_project_count, to_weight_vectors, Ballot, WeightUnits};
use crate::error::{Error, Result};
use crate::metric::euclidean;
use crate::validity::{self, Validity};

/// Neighbourhood radius and density threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbscanConfig {
    pub eps: f64,
    pub min_pts: usize,
}

impl DbscanConfig {
    pub fn new(eps: f64, min_pts: usize) -> Self {
        Self { eps, min_pts }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(Error::invalid_config(format!(
                "eps must be a positive number, got {}",
                self.eps
            )));
        }
        if self.min_pts < 1 {
            return Err(Error::invalid_config("min_pts must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Unvisited,
    Noise,
    Cluster(usize),
}

/// All rows strictly closer than `eps` to row `p` under Euclidean distance,
/// `p` included.
pub fn region_query(data: &[Vec<f64>], p: usize, eps: f64) -> Result<Vec<usize>> {
    let point = data.get(p).ok_or_else(|| {
        Error::invalid_config(format!("point {} out of range for {} rows", p, data.len()))
    })?;
    let mut neighbours = Vec::new();
    for (i, other) in data.iter().enumerate() {
        if euclidean(point, other)? < eps {
            neighbours.push(i);
        }
    }
    Ok(neighbours)
}

/// Result of one DBSCAN run.
#[derive(Debug, Clone, PartialEq)]
pub struct DbscanRun {
    pub eps: f64,
    pub min_pts: usize,
    /// Members of each cluster, ascending.
    pub clusters: Vec<Vec<usize>>,
    /// Rows assigned to no cluster, ascending.
    pub noise: Vec<usize>,
    /// Cluster of every row, `None` for noise.
    pub labels: Vec<Option<usize>>,
    /// Rows that met the density threshold.
    pub core_points: Vec<usize>,
    /// Mean of each cluster's members.
    pub centroids: Vec<Vec<f64>>,
    pub validity: Validity,
}

impl DbscanRun {
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

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
}

/// DBSCAN engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dbscan {
    config: DbscanConfig,
}

impl Dbscan {
    pub fn new(eps: f64, min_pts: usize) -> Self {
        Self::with_config(DbscanConfig::new(eps, min_pts))
    }

    pub fn with_config(config: DbscanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DbscanConfig {
        &self.config
    }

    /// Clusters raw vectors.
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<DbscanRun> {
        self.config.validate()?;
        check_data(data)?;
        let DbscanConfig { eps, min_pts } = self.config;
        log::debug!("dbscan: eps={} min_pts={} n={}", eps, min_pts, data.len());

        let mut labels = vec![Label::Unvisited; data.len()];
        let mut core = vec![false; data.len()];
        let mut clusters: Vec<Vec<usize>> = Vec::new();

        for p in 0..data.len() {
            if labels[p] != Label::Unvisited {
                continue;
            }
            let neighbours = region_query(data, p, eps)?;
            if neighbours.len() < min_pts {
                labels[p] = Label::Noise;
                continue;
            }

            let id = clusters.len();
            core[p] = true;
            labels[p] = Label::Cluster(id);
            let mut members = vec![p];
            let mut queue: VecDeque<usize> = neighbours.into_iter().collect();

            while let Some(q) = queue.pop_front() {
                match labels[q] {
                    Label::Cluster(_) => {}
                    // border point first seen from a sparse neighbourhood
                    Label::Noise => {
                        labels[q] = Label::Cluster(id);
                        members.push(q);
                    }
                    Label::Unvisited => {
                        labels[q] = Label::Cluster(id);
                        members.push(q);
                        let reachable = region_query(data, q, eps)?;
                        if reachable.len() >= min_pts {
                            core[q] = true;
                            queue.extend(reachable);
                        }
                    }
                }
            }

            members.sort_unstable();
            log::trace!("dbscan cluster {}: {} members", id, members.len());
            clusters.push(members);
        }

        let noise: Vec<usize> = (0..data.len())
            .filter(|&i| labels[i] == Label::Noise)
            .collect();
        let labels: Vec<Option<usize>> = labels
            .into_iter()
            .map(|label| match label {
                Label::Cluster(id) => Some(id),
                _ => None,
            })
            .collect();
        let core_points = (0..data.len()).filter(|&i| core[i]).collect();

        let centroids = validity::mean_centroids(data, &clusters);
        let validity = validity::evaluate(data, &clusters, &centroids)?;
        log::debug!(
            "dbscan: {} clusters, {} noise points",
            clusters.len(),
            noise.len()
        );

        Ok(DbscanRun {
            eps,
            min_pts,
            clusters,
            noise,
            labels,
            core_points,
            centroids,
            validity,
        })
    }

    /// Normalizes the ballots and clusters their weight vectors.
    ///
    /// `projects` is the round's project count; it is derived from the ballots
    /// when `None`.
    pub fn fit_ballots(
        &self,
        ballots: &[Ballot],
        units: WeightUnits,
        projects: Option<usize>,
    ) -> Result<DbscanRun> {
        if ballots.is_empty() {
            return Err(Error::invalid_config("no ballots to cluster"));
        }
        let projects = projects.unwrap_or_else(|| determine_project_count(ballots));
        let weights = to_weight_vectors(ballots, projects, units)?;
        self.fit(&weights)
    }
}

fn check_data(data: &[Vec<f64>]) -> Result<()> {
    let first = data
        .first()
        .ok_or_else(|| Error::invalid_config("no points to cluster"))?;
    if first.is_empty() {
        return Err(Error::invalid_config(
            "data points must have at least one dimension",
        ));
    }
    if let Some(row) = data.iter().find(|row| row.len() != first.len()) {
        return Err(Error::LengthMismatch {
            left: row.len(),
            right: first.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 2.0],
            vec![2.0, 2.0],
            vec![2.0, 3.0],
            vec![8.0, 8.0],
            vec![8.0, 9.0],
            vec![25.0, 80.0],
        ]
    }

    #[test]
    fn test_two_clusters_and_noise() {
        let run = Dbscan::new(3.0, 2).fit(&sample()).unwrap();
        assert_eq!(run.clusters, vec![vec![0, 1, 2], vec![3, 4]]);
        assert_eq!(run.noise, vec![5]);
        assert_eq!(
            run.labels,
            vec![Some(0), Some(0), Some(0), Some(1), Some(1), None]
        );
        assert_eq!(run.cluster_count(), 2);
        assert_abs_diff_eq!(run.centroids[1][0], 8.0);
        assert_abs_diff_eq!(run.centroids[1][1], 8.5);
        assert!(run.silhouette_score() > 0.5);
        assert!(run.dunn_index() > 1.0);
        assert!(run.davies_bouldin_index() > 0.0);
    }

    #[test]
    fn test_region_query_excludes_boundary() {
        let data = vec![vec![0.0], vec![3.0], vec![3.5]];
        assert_eq!(region_query(&data, 0, 3.0).unwrap(), vec![0]);
        assert_eq!(region_query(&data, 0, 3.01).unwrap(), vec![0, 1]);
        assert_eq!(region_query(&data, 2, 0.5).unwrap(), vec![2]);
        assert_eq!(region_query(&data, 2, 0.6).unwrap(), vec![1, 2]);
        assert!(region_query(&data, 3, 1.0).is_err());
    }

    #[test]
    fn test_points_exactly_eps_apart_are_noise() {
        // 3-4-5 triangle: the pair is exactly 5.0 apart
        let data = vec![vec![0.0, 0.0], vec![3.0, 4.0]];
        let run = Dbscan::new(5.0, 2).fit(&data).unwrap();
        assert!(run.clusters.is_empty());
        assert_eq!(run.noise, vec![0, 1]);
        assert!(run.core_points.is_empty());

        let run = Dbscan::new(5.01, 2).fit(&data).unwrap();
        assert_eq!(run.clusters, vec![vec![0, 1]]);
        assert!(run.noise.is_empty());
    }

    #[test]
    fn test_border_point_claimed_after_noise() {
        // row 0 is too sparse on its own but sits next to the core row 1
        let data = vec![vec![0.0], vec![1.0], vec![2.0]];
        let run = Dbscan::new(1.5, 3).fit(&data).unwrap();
        assert_eq!(run.clusters, vec![vec![0, 1, 2]]);
        assert!(run.noise.is_empty());
        assert_eq!(run.core_points, vec![1]);
    }

    #[test]
    fn test_noise_is_disjoint_from_clusters() {
        let run = Dbscan::new(3.0, 2).fit(&sample()).unwrap();
        for n in &run.noise {
            assert!(run.clusters.iter().all(|c| !c.contains(n)));
        }
        let covered: usize = run.clusters.iter().map(Vec::len).sum::<usize>() + run.noise.len();
        assert_eq!(covered, sample().len());
    }

    #[test]
    fn test_everything_noise() {
        let run = Dbscan::new(0.5, 2).fit(&sample()).unwrap();
        assert!(run.clusters.is_empty());
        assert_eq!(run.noise, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(run.validity, Validity::default());
    }

    #[test]
    fn test_min_pts_one_leaves_no_noise() {
        let run = Dbscan::new(0.5, 1).fit(&sample()).unwrap();
        assert_eq!(run.cluster_count(), 6);
        assert!(run.noise.is_empty());
        assert_eq!(run.core_points.len(), 6);
    }

    #[test]
    fn test_invalid_configuration() {
        let data = sample();
        assert!(Dbscan::new(0.0, 2).fit(&data).is_err());
        assert!(Dbscan::new(-1.0, 2).fit(&data).is_err());
        assert!(Dbscan::new(f64::NAN, 2).fit(&data).is_err());
        assert!(Dbscan::new(1.0, 0).fit(&data).is_err());
        assert!(Dbscan::new(1.0, 2).fit(&[]).is_err());
        assert_eq!(
            Dbscan::new(1.0, 2).fit(&[vec![1.0, 2.0], vec![1.0]]),
            Err(Error::LengthMismatch { left: 1, right: 2 })
        );
    }

    #[test]
    fn test_fit_ballots() {
        let ballots = vec![
            Ballot::from_pairs(&[(1, 1.0), (2, 2.0)]),
            Ballot::from_pairs(&[(1, 2.0), (2, 2.0)]),
            Ballot::from_pairs(&[(2, 40.0)]),
        ];
        let run = Dbscan::new(1.5, 2)
            .fit_ballots(&ballots, WeightUnits::Contributions, None)
            .unwrap();
        assert_eq!(run.clusters, vec![vec![0, 1]]);
        assert_eq!(run.noise, vec![2]);
    }

    #[test]
    fn test_fit_ballots_with_explicit_project_count() {
        let ballots = vec![
            Ballot::from_pairs(&[(1, 1.0)]),
            Ballot::from_pairs(&[(1, 2.0)]),
            Ballot::from_pairs(&[(2, 40.0)]),
        ];
        let dbscan = Dbscan::new(1.5, 2);
        let derived = dbscan
            .fit_ballots(&ballots, WeightUnits::Contributions, None)
            .unwrap();
        let widened = dbscan
            .fit_ballots(&ballots, WeightUnits::Contributions, Some(5))
            .unwrap();
        assert_eq!(widened.clusters, derived.clusters);
        assert_eq!(widened.noise, derived.noise);
        assert_eq!(widened.centroids[0], vec![1.5, 0.0, 0.0, 0.0, 0.0]);

        assert!(matches!(
            dbscan.fit_ballots(&ballots, WeightUnits::Contributions, Some(1)),
            Err(Error::InvalidBallot { ballot: 2, .. })
        ));
        assert!(matches!(
            dbscan.fit_ballots(&ballots, WeightUnits::Contributions, Some(0)),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
