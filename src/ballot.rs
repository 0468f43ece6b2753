//! Ballots and their normalization into dense weight vectors.
//!
//! A voter's ballot only lists the projects the voter actually supported. Before
//! ballots can be compared dimension-for-dimension every ballot is zero-filled
//! over the whole project range `1..=projects`, sorted by project index and
//! flattened into a `Vec<f64>` whose slot `p - 1` holds the weight for project `p`.

use crate::error::{Error, Result};

/// A single vote: the weight a voter put behind one project.
///
/// Project indices are 1-based, matching how rounds number their projects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote {
    pub project: usize,
    pub weight: f64,
}

impl Vote {
    pub fn new(project: usize, weight: f64) -> Self {
        Self { project, weight }
    }
}

/// All votes cast by one voter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ballot {
    pub votes: Vec<Vote>,
}

impl Ballot {
    pub fn new(votes: Vec<Vote>) -> Self {
        Self { votes }
    }

    /// Builds a ballot from `(project, weight)` pairs.
    pub fn from_pairs(pairs: &[(usize, f64)]) -> Self {
        Self {
            votes: pairs.iter().map(|&(p, w)| Vote::new(p, w)).collect(),
        }
    }

    /// Weights in vote order. Only meaningful once the ballot is zero-filled.
    pub fn weights(&self) -> Vec<f64> {
        self.votes.iter().map(|v| v.weight).collect()
    }
}

impl From<Vec<Vote>> for Ballot {
    fn from(votes: Vec<Vote>) -> Self {
        Self::new(votes)
    }
}

/// The unit the ballot weights were recorded in.
///
/// QF works on contributions: `qf = (sum of sqrt(contribution))^2`. Rounds that
/// record voice credits (the square root of a contribution) have to be squared
/// back into contributions exactly once before clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightUnits {
    /// Weights are raw contributions and are used as-is.
    #[default]
    Contributions,
    /// Weights are voice credits; each weight `w` becomes `w * w`.
    VoiceCredits,
}

impl WeightUnits {
    /// Converts one recorded weight into a contribution.
    pub fn to_contribution(self, weight: f64) -> f64 {
        match self {
            WeightUnits::Contributions => weight,
            WeightUnits::VoiceCredits => weight * weight,
        }
    }
}

/// Returns the largest project index seen across all ballots.
///
/// Only needed when the round does not state its project count up front.
pub fn determine_project_count(ballots: &[Ballot]) -> usize {
    ballots
        .iter()
        .flat_map(|b| b.votes.iter())
        .map(|v| v.project)
        .max()
        .unwrap_or(0)
}

/// Inserts a zero-weight vote for every project in `1..=projects` the ballot
/// does not mention and returns the votes sorted ascending by project index.
///
/// # Errors
///
/// `InvalidBallot` (reported against ballot 0) if a vote names project 0 or a
/// project above `projects`, names the same project twice, or carries a negative
/// or non-finite weight.
pub fn zero_fill(ballot: &Ballot, projects: usize) -> Result<Ballot> {
    zero_fill_at(0, ballot, projects)
}

fn zero_fill_at(index: usize, ballot: &Ballot, projects: usize) -> Result<Ballot> {
    let invalid = |reason: String| Error::InvalidBallot {
        ballot: index,
        reason,
    };

    let mut slots: Vec<Option<Vote>> = vec![None; projects];
    for vote in &ballot.votes {
        if vote.project == 0 || vote.project > projects {
            return Err(invalid(format!(
                "project index {} outside 1..={}",
                vote.project, projects
            )));
        }
        if !vote.weight.is_finite() || vote.weight < 0.0 {
            return Err(invalid(format!(
                "weight {} for project {} is not a non-negative number",
                vote.weight, vote.project
            )));
        }
        let slot = &mut slots[vote.project - 1];
        if slot.is_some() {
            return Err(invalid(format!("duplicate vote for project {}", vote.project)));
        }
        *slot = Some(*vote);
    }

    let votes = slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| slot.unwrap_or_else(|| Vote::new(i + 1, 0.0)))
        .collect();
    Ok(Ballot { votes })
}

/// Zero-fills every ballot and converts it into a weight vector of length
/// `projects`, converting weights with `units` exactly once.
///
/// The input ballots are left untouched; each call works on its own copy.
pub fn to_weight_vectors(
    ballots: &[Ballot],
    projects: usize,
    units: WeightUnits,
) -> Result<Vec<Vec<f64>>> {
    if projects == 0 {
        return Err(Error::invalid_config("ballots reference no projects"));
    }
    ballots
        .iter()
        .enumerate()
        .map(|(i, ballot)| {
            let filled = zero_fill_at(i, ballot, projects)?;
            Ok(filled
                .votes
                .iter()
                .map(|v| units.to_contribution(v.weight))
                .collect())
        })
        .collect()
}
