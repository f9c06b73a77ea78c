use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use controller_sharding::config::Config;
use controller_sharding::infer::infer_shard;
use controller_sharding::{Application, Cluster, ClusterShardingCache};

/// Clusters and applications as read from stdin.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Inventory {
    #[serde(default)]
    clusters: Vec<Cluster>,
    #[serde(default)]
    applications: Vec<Application>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    shard: u32,
    replicas: u32,
    algorithm: &'static str,
    distribution: BTreeMap<String, u32>,
    app_distribution: BTreeMap<String, u64>,
    managed_clusters: Vec<String>,
}

fn main() -> Result<()> {
    let log_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .with_filter(EnvFilter::from_default_env())
        .boxed();

    tracing_subscriber::registry().with(log_layer).init();

    let config = Config::init_with_defaults()
        .context("Failed to load configuration from environment variables")?;
    info!("Configuration loaded: {:?}", config);

    let shard = config
        .resolve_shard(infer_shard)
        .context("Failed to determine the shard of this controller")?;

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read inventory from stdin")?;
    let inventory: Inventory =
        serde_json::from_str(&input).context("Failed to parse inventory JSON")?;

    let cache = config.build_cache(shard);
    let managed_candidates = inventory.clusters.clone();
    cache.init(inventory.clusters, inventory.applications);

    let mut managed_clusters: Vec<String> = managed_candidates
        .iter()
        .filter(|cluster| cache.is_managed_cluster(Some(*cluster)))
        .map(|cluster| cluster.server.clone())
        .collect();
    managed_clusters.sort();

    let report = Report {
        shard,
        replicas: cache.replicas(),
        algorithm: cache.algorithm_name(),
        distribution: cache.get_distribution().into_iter().collect(),
        app_distribution: cache.get_app_distribution().into_iter().collect(),
        managed_clusters,
    };
    info!(
        shard,
        managed = report.managed_clusters.len(),
        total = report.distribution.len(),
        "computed cluster distribution"
    );

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report).context("Failed to write report")?;
    writeln!(stdout).context("Failed to write report")?;
    Ok(())
}
