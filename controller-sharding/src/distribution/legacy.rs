use super::DistributionFunction;
use crate::hash::get_shard_by_id;
use crate::snapshot::Snapshot;
use crate::types::Cluster;

/// Stateless placement: `fnv1a_32(id) % replicas`.
///
/// Needs no view of the other clusters, so adding or removing a cluster never
/// moves any other one. The price is an uneven spread for small fleets.
#[derive(Debug, Clone, Copy)]
pub struct LegacyDistribution {
    replicas: u32,
}

impl LegacyDistribution {
    pub fn new(replicas: u32) -> Self {
        Self { replicas }
    }
}

impl DistributionFunction for LegacyDistribution {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn shard_for(&self, cluster: &Cluster, _snapshot: &Snapshot<'_>) -> Option<u32> {
        Some(get_shard_by_id(&cluster.id, self.replicas))
    }
}
