#![allow(dead_code)]

use std::collections::HashMap;

use controller_sharding::{Application, Cluster};

pub fn server(id: &str) -> String {
    format!("https://kubernetes.default.svc?{id}")
}

pub fn cluster(id: &str) -> Cluster {
    Cluster::new(id, server(id)).with_name(format!("cluster-{id}"))
}

/// Clusters with ids `1..=count`.
pub fn numbered_clusters(count: usize) -> Vec<Cluster> {
    (1..=count).map(|i| cluster(&i.to_string())).collect()
}

/// One application per cluster.
pub fn one_app_each(clusters: &[Cluster]) -> Vec<Application> {
    clusters
        .iter()
        .map(|c| Application::new(format!("app-{}", c.id), c.server.clone()))
        .collect()
}

/// Number of clusters on each shard `0..replicas`.
pub fn shard_counts(distribution: &HashMap<String, u32>, replicas: u32) -> Vec<usize> {
    let mut counts = vec![0; replicas as usize];
    for shard in distribution.values() {
        counts[*shard as usize] += 1;
    }
    counts
}

/// Shards of `ids`, in the order given.
pub fn shards_of(distribution: &HashMap<String, u32>, ids: &[&str]) -> Vec<u32> {
    ids.iter().map(|id| distribution[&server(id)]).collect()
}
