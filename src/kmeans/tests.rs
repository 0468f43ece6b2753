use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::allocation::{AllocationScheme, CoefficientScheme, CombinationOrder};
use crate::ballot::{Ballot, WeightUnits};
use crate::error::{Error, Result};
use crate::kmeans::{self, update_centroids, EmptyClusterPolicy, KMeansConfig, Seeding};
use crate::metric::{DistanceMetric, Metric};
use crate::synthetic::generate_ballots;

fn ballots_from_vectors(vectors: &[Vec<f64>]) -> Vec<Ballot> {
    vectors
        .iter()
        .map(|v| {
            let pairs: Vec<(usize, f64)> = v.iter().enumerate().map(|(i, &w)| (i + 1, w)).collect();
            Ballot::from_pairs(&pairs)
        })
        .collect()
}

#[test]
fn test_fixed_seed_scenario() {
    let ballots = ballots_from_vectors(&[vec![5.0, 5.0], vec![9.0, 0.0], vec![9.0, 0.0]]);
    let config = KMeansConfig::new(2).with_fixed_seeds(vec![0, 1]);
    let run = kmeans::run(&ballots, &config).unwrap();

    assert_eq!(run.initial_centroids, vec![0, 1]);
    assert_eq!(run.centroids, vec![vec![5.0, 5.0], vec![9.0, 0.0]]);
    assert_eq!(run.assignments, vec![0, 1, 1]);
    assert_eq!(run.iterations, 1);
    assert!(run.converged);
    assert_eq!(run.clusters[0].size, 1);
    assert_eq!(run.clusters[1].size, 2);
    assert_eq!(run.projects, 2);
}

#[test]
fn test_configuration_errors_surface_first() {
    let ballots = ballots_from_vectors(&[vec![1.0], vec![2.0]]);
    let cases = vec![
        KMeansConfig::new(3),
        KMeansConfig::new(0),
        KMeansConfig::new(1).with_max_iterations(0),
        KMeansConfig::new(1).with_tolerance(-1.0),
        KMeansConfig::new(1).with_tolerance(f64::NAN),
        KMeansConfig::new(2).with_fixed_seeds(vec![0]),
        KMeansConfig::new(2).with_fixed_seeds(vec![0, 2]),
    ];
    for config in cases {
        assert!(
            matches!(kmeans::run(&ballots, &config), Err(Error::InvalidConfiguration(_))),
            "{:?} should be rejected",
            config
        );
    }
    assert!(matches!(
        kmeans::run(&[], &KMeansConfig::new(1)),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn test_invalid_ballot_is_reported() {
    let ballots = vec![Ballot::from_pairs(&[(1, 1.0)]), Ballot::from_pairs(&[(2, -3.0)])];
    let config = KMeansConfig::new(1).with_seed(1);
    assert!(matches!(
        kmeans::run(&ballots, &config),
        Err(Error::InvalidBallot { ballot: 1, .. })
    ));
}

#[test]
fn test_iteration_cap_is_soft() {
    let ballots = ballots_from_vectors(&[vec![0.0], vec![1.0], vec![10.0], vec![11.0]]);
    let capped = KMeansConfig::new(2)
        .with_fixed_seeds(vec![0, 1])
        .with_max_iterations(1)
        .with_tolerance(0.0);
    let run = kmeans::run(&ballots, &capped).unwrap();
    assert_eq!(run.iterations, 1);
    assert!(!run.converged);
    assert_eq!(run.assignments, vec![0, 1, 1, 1]);

    let free = capped.with_max_iterations(100);
    let run = kmeans::run(&ballots, &free).unwrap();
    assert!(run.converged);
    assert_eq!(run.iterations, 3);
    assert_eq!(run.assignments, vec![0, 0, 1, 1]);
    assert_eq!(run.centroids, vec![vec![0.5], vec![10.5]]);
}

#[test]
fn test_every_voter_lands_in_one_cluster() {
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let ballots = generate_ballots(60, 8, 50, &mut rng).unwrap();
    for metric in [Metric::SquaredEuclidean, Metric::Euclidean, Metric::Cosine] {
        for k in [1, 3, 7] {
            let config = KMeansConfig::new(k).with_metric(metric).with_seed(k as u64);
            let run = kmeans::run(&ballots, &config).unwrap();
            assert_eq!(run.assignments.len(), ballots.len());
            assert!(run.assignments.iter().all(|&c| c < k));
            assert_eq!(run.clusters.iter().map(|c| c.size).sum::<usize>(), ballots.len());
            assert_eq!(run.initial_centroids.len(), k);
            assert!(run.iterations >= 1 && run.iterations <= config.max_iterations);
        }
    }
}

#[test]
fn test_cosine_groups_by_direction() {
    let ballots = ballots_from_vectors(&[
        vec![1.0, 0.0, 0.0],
        vec![40.0, 1.0, 0.0],
        vec![0.0, 2.0, 2.0],
        vec![0.0, 30.0, 31.0],
    ]);
    let config = KMeansConfig::new(2)
        .with_metric(Metric::Cosine)
        .with_fixed_seeds(vec![0, 2])
        .with_tolerance(1e-9);
    let run = kmeans::run(&ballots, &config).unwrap();
    assert_eq!(run.assignments, vec![0, 0, 1, 1]);
    assert!(run.converged);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let mut rng = ChaCha20Rng::seed_from_u64(2024);
    let ballots = generate_ballots(40, 6, 20, &mut rng).unwrap();
    let config = KMeansConfig::new(4).with_seed(77);
    let a = kmeans::run(&ballots, &config).unwrap();
    let b = kmeans::run(&ballots, &config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_converged_centroids_are_a_fixed_point() {
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let ballots = generate_ballots(50, 5, 30, &mut rng).unwrap();
    let config = KMeansConfig::new(3).with_seed(9).with_tolerance(1e-6);
    let run = kmeans::run(&ballots, &config).unwrap();
    assert!(run.converged);

    let again = update_centroids(
        &run.weights,
        &run.assignments,
        &run.centroids,
        EmptyClusterPolicy::RetainPrevious,
    )
    .unwrap();
    for (a, b) in run.centroids.iter().flatten().zip(again.centroids.iter().flatten()) {
        assert!((a - b).abs() <= config.tolerance);
    }
}

#[test]
fn test_empty_cluster_policies() {
    // both seeds are the same vector, so the first one takes every exact match
    let ballots = ballots_from_vectors(&[vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0, 1.0]]);
    let retain = KMeansConfig::new(2).with_fixed_seeds(vec![0, 1]);
    let run = kmeans::run(&ballots, &retain).unwrap();
    assert_eq!(run.assignments, vec![0, 0, 0]);
    assert_eq!(run.empty_clusters, vec![1]);
    assert_eq!(run.clusters[1].size, 0);
    assert_eq!(run.allocation.coefficients[1].value, 1.0);
    assert!(run.centroids.iter().flatten().all(|x| x.is_finite()));

    let fail = retain.with_empty_cluster_policy(EmptyClusterPolicy::Fail);
    assert_eq!(kmeans::run(&ballots, &fail), Err(Error::DegenerateCluster(1)));
}

#[test]
fn test_voice_credits_are_squared_once() {
    let ballots = ballots_from_vectors(&[vec![2.0, 0.0], vec![3.0, 1.0]]);
    let config = KMeansConfig::new(1)
        .with_seed(1)
        .with_weight_units(WeightUnits::VoiceCredits);
    let run = kmeans::run(&ballots, &config).unwrap();
    assert_eq!(run.weights, vec![vec![4.0, 0.0], vec![9.0, 1.0]]);
    // (sqrt(4) + sqrt(9))^2
    assert_eq!(run.traditional_qf()[0], 25.0);

    let raw = kmeans::run(&ballots, &config.clone().with_weight_units(WeightUnits::Contributions)).unwrap();
    assert_eq!(raw.weights, vec![vec![2.0, 0.0], vec![3.0, 1.0]]);
}

#[test]
fn test_all_allocation_variants() {
    let mut rng = ChaCha20Rng::seed_from_u64(31);
    let ballots = generate_ballots(30, 4, 25, &mut rng).unwrap();
    let run = kmeans::run(&ballots, &KMeansConfig::new(3).with_seed(3)).unwrap();

    let all = run.allocate_all().unwrap();
    assert_eq!(all.len(), 4);
    for (allocation, scheme) in all.iter().zip(AllocationScheme::ALL) {
        assert_eq!(allocation.scheme, scheme);
        assert_eq!(allocation.cluster_qf.len(), run.projects);
        assert_eq!(allocation.traditional_qf, run.traditional_qf());
        if scheme.coefficient == CoefficientScheme::Complement {
            for (c, t) in allocation.cluster_qf.iter().zip(&allocation.traditional_qf) {
                assert!(*c <= *t + 1e-9);
            }
        }
    }

    let default_scheme =
        AllocationScheme::new(CoefficientScheme::Complement, CombinationOrder::SquareAfter);
    assert_eq!(run.allocation, run.allocate(default_scheme).unwrap());
}

#[test]
fn test_validity_is_reported() {
    let ballots = ballots_from_vectors(&[
        vec![0.0, 0.0],
        vec![0.0, 2.0],
        vec![10.0, 0.0],
        vec![10.0, 2.0],
    ]);
    let config = KMeansConfig::new(2).with_fixed_seeds(vec![0, 2]);
    let run = kmeans::run(&ballots, &config).unwrap();
    assert_eq!(run.assignments, vec![0, 0, 1, 1]);
    assert!((run.wcss() - 4.0).abs() < 1e-12);
    assert!((run.davies_bouldin_index() - 0.2).abs() < 1e-12);
    assert!((run.dunn_index() - 5.0).abs() < 1e-12);
    assert!(run.silhouette_score() > 0.7);
}

/// Sum of absolute differences, plugged in from outside the crate's metric set.
#[derive(Debug)]
struct Manhattan;

impl DistanceMetric for Manhattan {
    fn name(&self) -> &'static str {
        "manhattan"
    }

    fn measure(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        if a.len() != b.len() {
            return Err(Error::LengthMismatch {
                left: a.len(),
                right: b.len(),
            });
        }
        Ok(a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum())
    }
}

#[test]
fn test_custom_metric_injection() {
    let ballots = ballots_from_vectors(&[vec![0.0, 0.0], vec![1.0, 1.0], vec![20.0, 20.0]]);
    let config = KMeansConfig::new(2).with_seeding(Seeding::Fixed(vec![0, 2]));
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    let run = kmeans::run_with_metric(&ballots, &config, &Manhattan, &mut rng).unwrap();
    assert_eq!(run.assignments, vec![0, 0, 1]);
}

#[test]
fn test_explicit_project_count_widens_vectors() {
    let ballots = ballots_from_vectors(&[vec![1.0], vec![4.0]]);
    let config = KMeansConfig::new(1).with_seed(0).with_projects(3);
    let run = kmeans::run(&ballots, &config).unwrap();
    assert_eq!(run.projects, 3);
    assert_eq!(run.weights[1], vec![4.0, 0.0, 0.0]);
    assert_eq!(run.traditional_qf(), &[9.0, 0.0, 0.0]);
}
