/// Counter for full shard recomputations, labelled by algorithm
pub const SHARD_RECOMPUTE_COUNTER: &str = "controller_sharding_recompute_total";

/// Counter for cluster updates that changed nothing relevant to placement
pub const SKIPPED_RECOMPUTE_COUNTER: &str = "controller_sharding_recompute_skipped_total";

/// Gauge for the number of clusters assigned to each shard, labelled by shard
pub const CLUSTERS_PER_SHARD_GAUGE: &str = "controller_sharding_clusters";

/// Gauge for the number of clusters managed by this replica
pub const MANAGED_CLUSTERS_GAUGE: &str = "controller_sharding_managed_clusters";

/// Counter for ownership checks against a cluster with no computed shard
pub const UNKNOWN_CLUSTER_LOOKUP_COUNTER: &str = "controller_sharding_unknown_cluster_total";

/// Counter for explicit shard overrides that exceed the replica count
pub const INVALID_SHARD_OVERRIDE_COUNTER: &str = "controller_sharding_invalid_override_total";
