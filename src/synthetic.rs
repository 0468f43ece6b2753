//! Random ballot sets for experiments and benchmarks.
//!
//! Every voter supports the same random subset of projects with an independent
//! whole-number contribution in `1..=max_contribution`; unsupported projects get
//! an explicit zero vote. Deterministic for a seeded random source.

use rand::distributions::Uniform;
use rand::Rng;

use crate::ballot::{Ballot, Vote};
use crate::error::{Error, Result};

/// Contribution cap used by the experiment drivers.
pub const MAX_CONTRIBUTION: u32 = 50;

/// Draws `projects` project indices with replacement and keeps the distinct
/// ones, ascending and 1-based.
pub fn support_indices<R: Rng>(projects: usize, rng: &mut R) -> Vec<usize> {
    if projects == 0 {
        return Vec::new();
    }
    let pick = Uniform::new(1, projects + 1);
    let mut indices: Vec<usize> = (0..projects).map(|_| rng.sample(pick)).collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Generates `voters` ballots over `projects` projects.
pub fn generate_ballots<R: Rng>(
    voters: usize,
    projects: usize,
    max_contribution: u32,
    rng: &mut R,
) -> Result<Vec<Ballot>> {
    if projects == 0 {
        return Err(Error::invalid_config("projects must be at least 1"));
    }
    if max_contribution == 0 {
        return Err(Error::invalid_config("max_contribution must be at least 1"));
    }

    let support = support_indices(projects, rng);
    let amount = Uniform::new_inclusive(1, max_contribution);
    let ballots = (0..voters)
        .map(|_| {
            let mut supported = support.iter().peekable();
            let votes = (1..=projects)
                .map(|project| {
                    let weight = if supported.next_if_eq(&&project).is_some() {
                        f64::from(rng.sample(amount))
                    } else {
                        0.0
                    };
                    Vote::new(project, weight)
                })
                .collect();
            Ballot::new(votes)
        })
        .collect();
    log::debug!(
        "generated {} ballots over {} projects ({} supported)",
        voters,
        projects,
        support.len()
    );
    Ok(ballots)
}
