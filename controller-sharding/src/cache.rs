//! The sharding cache: one per controller replica.
//!
//! The watch layer feeds cluster and application events in, the reconciliation
//! loop asks [`ClusterShardingCache::is_managed_cluster`] before touching an
//! application. Every mutation that can move a cluster recomputes the whole
//! assignment under the write lock, so readers always see an assignment that
//! matches the current membership.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::distribution::{
    get_distribution_function, resolve_shard, DistributionFunction, ShardingAlgorithm,
};
use crate::metrics_consts::{
    CLUSTERS_PER_SHARD_GAUGE, MANAGED_CLUSTERS_GAUGE, SHARD_RECOMPUTE_COUNTER,
    SKIPPED_RECOMPUTE_COUNTER, UNKNOWN_CLUSTER_LOOKUP_COUNTER,
};
use crate::snapshot::{count_apps_by_server, Snapshot};
use crate::types::{has_sharding_updates, Application, Cluster};

/// Operations the watch layer and the reconciliation loop need from a
/// sharding cache.
///
/// All methods take `&self` and are safe to call from any thread.
pub trait ClusterShardingCache: Send + Sync {
    /// Replace all clusters and applications and recompute every shard.
    fn init(&self, clusters: Vec<Cluster>, apps: Vec<Application>);

    /// Insert or replace a cluster, keyed by server.
    fn add(&self, cluster: Cluster);

    /// Apply an update event. A changed server is a rename: the old entry is
    /// dropped before the new one is stored.
    fn update(&self, old: &Cluster, new: Cluster);

    /// Forget the cluster registered under `server`.
    fn delete(&self, server: &str);

    fn add_app(&self, app: Application);

    /// Insert or replace an application. Replacing an existing one does not
    /// recompute, even if its destination changed.
    fn update_app(&self, app: Application);

    fn delete_app(&self, app: &Application);

    /// Whether this replica owns `cluster`. `None` stands for the in-cluster
    /// destination and is owned by every replica.
    fn is_managed_cluster(&self, cluster: Option<&Cluster>) -> bool;

    /// Copy of the current `server -> shard` assignment.
    fn get_distribution(&self) -> HashMap<String, u32>;

    /// Number of applications targeting each known cluster, keyed by server.
    fn get_app_distribution(&self) -> HashMap<String, u64>;

    /// Change the shard this replica owns. Returns true if it changed.
    fn update_shard(&self, shard: u32) -> bool;
}

#[derive(Debug, Default)]
struct ShardingState {
    shard: u32,
    shards: HashMap<String, u32>,
    clusters: HashMap<String, Cluster>,
    apps: HashMap<String, Application>,
}

impl ShardingState {
    fn recompute(&mut self, replicas: u32, distribution: &dyn DistributionFunction) {
        let Self {
            shards,
            clusters,
            apps,
            ..
        } = &mut *self;

        let computed = distribution.distribute(&Snapshot::new(clusters, apps));

        for cluster in clusters.values() {
            let assigned = resolve_shard(Some(cluster), replicas, |c| {
                computed.get(&c.server).copied()
            });
            match shards.insert(cluster.server.clone(), assigned) {
                None => info!(
                    server = %cluster.server,
                    name = %cluster.name,
                    shard = assigned,
                    "cluster assigned to shard"
                ),
                Some(previous) if previous != assigned => info!(
                    server = %cluster.server,
                    name = %cluster.name,
                    previous,
                    shard = assigned,
                    "cluster moved to another shard"
                ),
                Some(_) => debug!(
                    server = %cluster.server,
                    shard = assigned,
                    "cluster shard unchanged"
                ),
            }
        }

        metrics::counter!(SHARD_RECOMPUTE_COUNTER, "algorithm" => distribution.name()).increment(1);
        let mut per_shard: HashMap<u32, usize> = HashMap::new();
        for assigned in shards.values() {
            *per_shard.entry(*assigned).or_default() += 1;
        }
        for shard in 0..replicas.max(1) {
            let count = per_shard.get(&shard).copied().unwrap_or(0);
            metrics::gauge!(CLUSTERS_PER_SHARD_GAUGE, "shard" => shard.to_string())
                .set(count as f64);
        }
        self.record_managed();
    }

    fn record_managed(&self) {
        let managed = self
            .shards
            .values()
            .filter(|assigned| **assigned == self.shard)
            .count();
        metrics::gauge!(MANAGED_CLUSTERS_GAUGE).set(managed as f64);
    }
}

/// In-memory [`ClusterShardingCache`] guarded by a single lock.
pub struct ClusterSharding {
    replicas: u32,
    distribution: Arc<dyn DistributionFunction>,
    state: RwLock<ShardingState>,
}

impl ClusterSharding {
    /// Cache for the replica owning `shard` out of `replicas`, placing clusters
    /// with the algorithm registered as `algorithm`. Unknown names fall back to
    /// the legacy algorithm.
    pub fn new(shard: u32, replicas: u32, algorithm: &str) -> Self {
        Self::with_distribution(
            shard,
            replicas,
            get_distribution_function(algorithm, replicas),
        )
    }

    pub fn with_algorithm(shard: u32, replicas: u32, algorithm: ShardingAlgorithm) -> Self {
        Self::with_distribution(shard, replicas, algorithm.distribution_function(replicas))
    }

    pub fn with_distribution(
        shard: u32,
        replicas: u32,
        distribution: Arc<dyn DistributionFunction>,
    ) -> Self {
        info!(
            shard,
            replicas,
            algorithm = distribution.name(),
            "created cluster sharding cache"
        );
        Self {
            replicas,
            distribution,
            state: RwLock::new(ShardingState {
                shard,
                ..ShardingState::default()
            }),
        }
    }

    pub fn shard(&self) -> u32 {
        self.read().shard
    }

    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.distribution.name()
    }

    fn read(&self) -> RwLockReadGuard<'_, ShardingState> {
        self.state.read().unwrap_or_else(|poison| poison.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShardingState> {
        self.state.write().unwrap_or_else(|poison| poison.into_inner())
    }

    fn recompute(&self, state: &mut ShardingState) {
        state.recompute(self.replicas, self.distribution.as_ref());
    }

    fn skip_recompute(&self, server: &str) {
        metrics::counter!(SKIPPED_RECOMPUTE_COUNTER).increment(1);
        debug!(server, "no sharding relevant change, skipping recompute");
    }
}

impl ClusterShardingCache for ClusterSharding {
    fn init(&self, clusters: Vec<Cluster>, apps: Vec<Application>) {
        let mut state = self.write();
        state.clusters = clusters
            .into_iter()
            .map(|cluster| (cluster.server.clone(), cluster))
            .collect();
        state.apps = apps.into_iter().map(|app| (app.name.clone(), app)).collect();
        let ShardingState {
            shards, clusters, ..
        } = &mut *state;
        shards.retain(|server, _| clusters.contains_key(server));
        info!(
            clusters = state.clusters.len(),
            apps = state.apps.len(),
            "initializing cluster sharding"
        );
        self.recompute(&mut state);
    }

    fn add(&self, cluster: Cluster) {
        let mut state = self.write();
        let needs_recompute = match state.clusters.get(&cluster.server) {
            None => true,
            Some(existing) => has_sharding_updates(Some(existing), Some(&cluster)),
        };
        let server = cluster.server.clone();
        state.clusters.insert(server.clone(), cluster);

        if needs_recompute {
            self.recompute(&mut state);
        } else {
            self.skip_recompute(&server);
        }
    }

    fn update(&self, old: &Cluster, new: Cluster) {
        let mut state = self.write();
        if old.server != new.server {
            debug!(from = %old.server, to = %new.server, "cluster server changed");
            state.clusters.remove(&old.server);
            state.shards.remove(&old.server);
        }
        let needs_recompute = match state.clusters.get(&new.server) {
            None => true,
            Some(stored) => {
                has_sharding_updates(Some(stored), Some(&new))
                    || has_sharding_updates(Some(old), Some(&new))
            }
        };
        let server = new.server.clone();
        state.clusters.insert(server.clone(), new);

        if needs_recompute {
            self.recompute(&mut state);
        } else {
            self.skip_recompute(&server);
        }
    }

    fn delete(&self, server: &str) {
        let mut state = self.write();
        if state.clusters.remove(server).is_none() {
            debug!(server, "deleted cluster was not known");
            return;
        }
        state.shards.remove(server);
        info!(server, "cluster removed from sharding");
        self.recompute(&mut state);
    }

    fn add_app(&self, app: Application) {
        let mut state = self.write();
        if state.apps.insert(app.name.clone(), app).is_none() {
            self.recompute(&mut state);
        }
    }

    fn update_app(&self, app: Application) {
        self.add_app(app);
    }

    fn delete_app(&self, app: &Application) {
        let mut state = self.write();
        if state.apps.remove(&app.name).is_some() {
            self.recompute(&mut state);
        }
    }

    fn is_managed_cluster(&self, cluster: Option<&Cluster>) -> bool {
        let Some(cluster) = cluster else {
            return true;
        };
        let state = self.read();
        let assigned = match state.shards.get(&cluster.server) {
            Some(assigned) => *assigned,
            None => {
                metrics::counter!(UNKNOWN_CLUSTER_LOOKUP_COUNTER).increment(1);
                warn!(
                    server = %cluster.server,
                    "cluster has no computed shard, assuming shard 0"
                );
                0
            }
        };
        assigned == state.shard
    }

    fn get_distribution(&self) -> HashMap<String, u32> {
        self.read().shards.clone()
    }

    fn get_app_distribution(&self) -> HashMap<String, u64> {
        let (servers, destinations): (Vec<String>, Vec<String>) = {
            let state = self.read();
            (
                state.clusters.keys().cloned().collect(),
                state
                    .apps
                    .values()
                    .map(|app| app.destination_server.clone())
                    .collect(),
            )
        };
        count_apps_by_server(
            servers.iter().map(String::as_str),
            destinations.iter().map(String::as_str),
        )
    }

    fn update_shard(&self, shard: u32) -> bool {
        let mut state = self.write();
        if state.shard == shard {
            return false;
        }
        info!(previous = state.shard, shard, "controller shard changed");
        state.shard = shard;
        state.record_managed();
        true
    }
}
