use std::collections::HashMap;

use super::DistributionFunction;
use crate::snapshot::Snapshot;
use crate::types::Cluster;

/// Everything lives on shard 0. Used whenever there is at most one replica.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShardingDistribution;

impl DistributionFunction for NoShardingDistribution {
    fn name(&self) -> &'static str {
        "no-sharding"
    }

    fn shard_for(&self, _cluster: &Cluster, _snapshot: &Snapshot<'_>) -> Option<u32> {
        Some(0)
    }

    fn distribute(&self, snapshot: &Snapshot<'_>) -> HashMap<String, u32> {
        snapshot
            .clusters()
            .into_iter()
            .map(|cluster| (cluster.server.clone(), 0))
            .collect()
    }
}
