mod consistent_hashing;
mod legacy;
mod no_sharding;
mod round_robin;

pub use consistent_hashing::ConsistentHashingDistribution;
pub use legacy::LegacyDistribution;
pub use no_sharding::NoShardingDistribution;
pub use round_robin::RoundRobinDistribution;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Error;
use crate::metrics_consts::INVALID_SHARD_OVERRIDE_COUNTER;
use crate::snapshot::Snapshot;
use crate::types::Cluster;

/// Trait for cluster placement algorithms.
///
/// The cache calls `distribute` on every recompute with a snapshot of all
/// known clusters and applications. Implementations must be pure: the result
/// may depend on the snapshot and on the implementation's own configuration,
/// nothing else. Explicit shard overrides are applied by the caller, see
/// [`resolve_shard`].
pub trait DistributionFunction: Send + Sync {
    /// Registry name of the algorithm.
    fn name(&self) -> &'static str;

    /// Shard for a single cluster, or `None` if the algorithm cannot place it
    /// (e.g. a rank based algorithm asked about a cluster missing from the
    /// snapshot).
    fn shard_for(&self, cluster: &Cluster, snapshot: &Snapshot<'_>) -> Option<u32>;

    /// Shard for every cluster in the snapshot, keyed by server.
    ///
    /// Algorithms that need a whole-membership pass (sorting, building a ring)
    /// override this to do that work once instead of once per cluster.
    fn distribute(&self, snapshot: &Snapshot<'_>) -> HashMap<String, u32> {
        snapshot
            .clusters()
            .into_iter()
            .filter_map(|cluster| {
                self.shard_for(cluster, snapshot)
                    .map(|shard| (cluster.server.clone(), shard))
            })
            .collect()
    }
}

/// Algorithms selectable by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShardingAlgorithm {
    #[default]
    Legacy,
    RoundRobin,
    ConsistentHashing,
}

impl ShardingAlgorithm {
    pub const ALL: [ShardingAlgorithm; 3] = [
        ShardingAlgorithm::Legacy,
        ShardingAlgorithm::RoundRobin,
        ShardingAlgorithm::ConsistentHashing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShardingAlgorithm::Legacy => "legacy",
            ShardingAlgorithm::RoundRobin => "round-robin",
            ShardingAlgorithm::ConsistentHashing => "consistent-hashing",
        }
    }

    /// Lenient lookup: unknown names log a warning and fall back to the default.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            let fallback = Self::default();
            warn!(
                algorithm = name,
                fallback = fallback.as_str(),
                "distribution type is not supported, using the default"
            );
            fallback
        })
    }

    /// Build the distribution function for `replicas`. A single replica (or
    /// none) always gets [`NoShardingDistribution`].
    pub fn distribution_function(self, replicas: u32) -> Arc<dyn DistributionFunction> {
        if replicas <= 1 {
            return Arc::new(NoShardingDistribution);
        }
        match self {
            ShardingAlgorithm::Legacy => Arc::new(LegacyDistribution::new(replicas)),
            ShardingAlgorithm::RoundRobin => Arc::new(RoundRobinDistribution::new(replicas)),
            ShardingAlgorithm::ConsistentHashing => {
                Arc::new(ConsistentHashingDistribution::new(replicas))
            }
        }
    }
}

impl FromStr for ShardingAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str() == s)
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

impl fmt::Display for ShardingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look up the distribution function registered under `name`.
pub fn get_distribution_function(name: &str, replicas: u32) -> Arc<dyn DistributionFunction> {
    debug!(algorithm = name, replicas, "selecting distribution function");
    ShardingAlgorithm::from_name(name).distribution_function(replicas)
}

/// Final shard for a cluster.
///
/// - no cluster (the in-cluster destination), or at most one replica: shard 0;
/// - an explicit shard lower than `replicas` wins over any algorithm;
/// - an explicit shard out of range degrades to shard 0, never to the
///   algorithm's answer;
/// - otherwise the algorithm decides, and a cluster it cannot place gets 0.
pub fn resolve_shard<F>(cluster: Option<&Cluster>, replicas: u32, algorithm: F) -> u32
where
    F: FnOnce(&Cluster) -> Option<u32>,
{
    let Some(cluster) = cluster else {
        return 0;
    };
    if replicas <= 1 {
        return 0;
    }

    match cluster.shard {
        Some(requested) if requested < replicas => requested,
        Some(requested) => {
            metrics::counter!(INVALID_SHARD_OVERRIDE_COUNTER).increment(1);
            warn!(
                server = %cluster.server,
                requested,
                replicas,
                "specified cluster shard is greater than the number of available shards, using shard 0"
            );
            0
        }
        None => algorithm(cluster).unwrap_or_else(|| {
            warn!(
                server = %cluster.server,
                id = %cluster.id,
                "cluster could not be placed by the distribution function, using shard 0"
            );
            0
        }),
    }
}
