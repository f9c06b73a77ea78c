use std::collections::HashMap;

use super::DistributionFunction;
use crate::consistent::BoundedLoadRing;
use crate::snapshot::Snapshot;
use crate::types::Cluster;

/// Consistent hashing with bounded loads, weighted by application count.
///
/// Clusters are walked in rank order. Each one is placed on the first shard
/// clockwise from `id` that is not overloaded, and that shard's load then
/// grows by the number of applications targeting the cluster.
#[derive(Debug, Clone, Copy)]
pub struct ConsistentHashingDistribution {
    replicas: u32,
}

impl ConsistentHashingDistribution {
    pub fn new(replicas: u32) -> Self {
        Self { replicas }
    }

    fn place_all(&self, snapshot: &Snapshot<'_>) -> HashMap<String, u32> {
        let app_counts = snapshot.app_distribution();
        let mut ring = BoundedLoadRing::new(self.replicas);
        let mut placement = HashMap::with_capacity(snapshot.cluster_count());

        for cluster in snapshot.sorted_clusters() {
            let Some(shard) = ring.get_least(&cluster.id) else {
                continue;
            };
            ring.add_load(shard, app_counts.get(&cluster.server).copied().unwrap_or(0));
            placement.insert(cluster.server.clone(), shard);
        }
        placement
    }
}

impl DistributionFunction for ConsistentHashingDistribution {
    fn name(&self) -> &'static str {
        "consistent-hashing"
    }

    fn shard_for(&self, cluster: &Cluster, snapshot: &Snapshot<'_>) -> Option<u32> {
        if !snapshot.contains(cluster) {
            return None;
        }
        self.place_all(snapshot).get(&cluster.server).copied()
    }

    fn distribute(&self, snapshot: &Snapshot<'_>) -> HashMap<String, u32> {
        self.place_all(snapshot)
    }
}
