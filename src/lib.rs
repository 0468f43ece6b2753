//! Cluster-discounted quadratic funding.
//!
//! Ballots are clustered (k-means or DBSCAN) and each voter's contribution is
//! discounted by a coefficient derived from the size of their cluster, so that
//! large blocs of near-identical ballots cannot dominate the matching pool.

pub mod allocation;
pub mod ballot;
pub mod dbscan;
pub mod error;
pub mod kmeans;
pub mod metric;
pub mod sweep;
pub mod synthetic;
pub mod validity;

pub use allocation::{Allocation, AllocationScheme, CoefficientScheme, CombinationOrder};
pub use ballot::{Ballot, Vote, WeightUnits};
pub use dbscan::{Dbscan, DbscanConfig, DbscanRun};
pub use error::{Error, Result};
pub use kmeans::{EmptyClusterPolicy, KMeansConfig, KMeansRun, Seeding};
pub use metric::{DistanceMetric, Metric};
pub use validity::Validity;
