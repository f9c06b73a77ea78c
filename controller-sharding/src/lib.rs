//! Cluster sharding for horizontally scaled application controllers.
//!
//! Every controller replica builds its own [`cache::ClusterSharding`] from the
//! same watch events. Because the distribution algorithms are deterministic over
//! the same inputs, all replicas agree on which shard owns which cluster without
//! talking to each other.

pub mod cache;
pub mod config;
pub mod consistent;
pub mod distribution;
pub mod error;
pub mod filter;
pub mod hash;
pub mod infer;
pub mod metrics_consts;
pub mod shard_mapping;
pub mod snapshot;
pub mod types;

pub use cache::{ClusterSharding, ClusterShardingCache};
pub use distribution::{DistributionFunction, ShardingAlgorithm};
pub use error::{Error, Result};
pub use types::{Application, Cluster};
