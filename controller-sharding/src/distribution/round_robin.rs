use std::collections::HashMap;

use super::DistributionFunction;
use crate::snapshot::Snapshot;
use crate::types::Cluster;

/// Rank placement: the cluster's position in id order, modulo replicas.
///
/// Spreads clusters evenly (shard sizes differ by at most one). A cluster
/// inserted or removed shifts only the clusters ranked after it.
#[derive(Debug, Clone, Copy)]
pub struct RoundRobinDistribution {
    replicas: u32,
}

impl RoundRobinDistribution {
    pub fn new(replicas: u32) -> Self {
        Self { replicas }
    }

    fn shard_at(&self, rank: usize) -> u32 {
        (rank % self.replicas.max(1) as usize) as u32
    }
}

impl DistributionFunction for RoundRobinDistribution {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn shard_for(&self, cluster: &Cluster, snapshot: &Snapshot<'_>) -> Option<u32> {
        if !snapshot.contains(cluster) {
            return None;
        }
        snapshot
            .sorted_clusters()
            .iter()
            .position(|known| known.server == cluster.server)
            .map(|rank| self.shard_at(rank))
    }

    fn distribute(&self, snapshot: &Snapshot<'_>) -> HashMap<String, u32> {
        snapshot
            .sorted_clusters()
            .into_iter()
            .enumerate()
            .map(|(rank, cluster)| (cluster.server.clone(), self.shard_at(rank)))
            .collect()
    }
}
