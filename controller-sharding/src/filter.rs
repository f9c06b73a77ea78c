use crate::distribution::resolve_shard;
use crate::hash::get_shard_by_id;
use crate::types::Cluster;

/// Predicate telling whether a cluster belongs to `shard`, for callers that
/// need a yes/no answer without a cache (e.g. filtering a watch).
///
/// Placement is the legacy hash of the cluster id, after explicit overrides.
/// `None` is treated as the in-cluster destination and resolves to shard 0.
pub fn get_cluster_filter(
    replicas: u32,
    shard: u32,
) -> impl Fn(Option<&Cluster>) -> bool + Send + Sync + Clone {
    move |cluster: Option<&Cluster>| {
        let assigned = resolve_shard(cluster, replicas, |c| {
            Some(get_shard_by_id(&c.id, replicas))
        });
        assigned == shard
    }
}
