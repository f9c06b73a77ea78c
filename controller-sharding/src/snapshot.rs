//! Point-in-time views over the clusters and applications known to a cache.
//!
//! A [`Snapshot`] only borrows the maps it reads. Inside the cache it is built
//! from the write guard held by the recompute, so a distribution algorithm
//! reading it can neither observe a torn state nor reach back into the cache
//! and take the lock a second time.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{Application, Cluster};

#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    clusters: &'a HashMap<String, Cluster>,
    apps: &'a HashMap<String, Application>,
}

impl<'a> Snapshot<'a> {
    /// `clusters` is keyed by server, `apps` by name.
    pub fn new(
        clusters: &'a HashMap<String, Cluster>,
        apps: &'a HashMap<String, Application>,
    ) -> Self {
        Self { clusters, apps }
    }

    pub fn clusters(&self) -> Vec<&'a Cluster> {
        self.clusters.values().collect()
    }

    pub fn apps(&self) -> Vec<&'a Application> {
        self.apps.values().collect()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// True if this exact cluster (same server and id) is part of the snapshot.
    pub fn contains(&self, cluster: &Cluster) -> bool {
        self.clusters
            .get(&cluster.server)
            .is_some_and(|known| known.id == cluster.id)
    }

    /// All clusters in rank order, see [`compare_clusters`].
    pub fn sorted_clusters(&self) -> Vec<&'a Cluster> {
        let mut clusters = self.clusters();
        clusters.sort_by(|a, b| compare_clusters(a, b));
        clusters
    }

    /// Number of applications targeting each known cluster, keyed by server.
    pub fn app_distribution(&self) -> HashMap<String, u64> {
        count_apps_by_server(
            self.clusters.keys().map(String::as_str),
            self.apps.values().map(|app| app.destination_server.as_str()),
        )
    }
}

/// Counts destinations per server. Every server in `servers` is present in the
/// result, destinations that match no server are dropped.
pub fn count_apps_by_server<'s>(
    servers: impl IntoIterator<Item = &'s str>,
    destinations: impl IntoIterator<Item = &'s str>,
) -> HashMap<String, u64> {
    let mut counts: HashMap<String, u64> = servers
        .into_iter()
        .map(|server| (server.to_string(), 0))
        .collect();
    for destination in destinations {
        if let Some(count) = counts.get_mut(destination) {
            *count += 1;
        }
    }
    counts
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum IdKey<'a> {
    Numeric(i64),
    Text(&'a str),
}

impl<'a> IdKey<'a> {
    fn of(id: &'a str) -> Self {
        id.parse().map_or(Self::Text(id), Self::Numeric)
    }
}

/// Total order used to rank clusters: numeric ids first, in numeric order,
/// then all other ids lexicographically. Ties fall back to the raw id and
/// then the server so that no two distinct clusters compare equal.
pub fn compare_clusters(a: &Cluster, b: &Cluster) -> Ordering {
    IdKey::of(&a.id)
        .cmp(&IdKey::of(&b.id))
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.server.cmp(&b.server))
}
