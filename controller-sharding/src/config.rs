use std::time::Duration;

use envconfig::Envconfig;
use tracing::{info, warn};

use crate::cache::ClusterSharding;
use crate::distribution::ShardingAlgorithm;
use crate::error::Result;

pub const DEFAULT_HEARTBEAT_SECS: u32 = 10;
pub const MIN_HEARTBEAT_SECS: u32 = 10;
pub const MAX_HEARTBEAT_SECS: u32 = 60;

/// Missed heartbeats after which a shard owner is considered gone.
pub const HEARTBEAT_TIMEOUT_MULTIPLIER: u32 = 3;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    /// Number of controller replicas. 0 or 1 disables sharding.
    #[envconfig(from = "ARGOCD_CONTROLLER_REPLICAS", default = "0")]
    pub replicas: u32,

    /// Shard owned by this replica, -1 to infer it from the hostname.
    #[envconfig(from = "ARGOCD_CONTROLLER_SHARD", default = "-1")]
    pub shard: i64,

    #[envconfig(from = "ARGOCD_CONTROLLER_SHARDING_ALGORITHM", default = "legacy")]
    pub sharding_algorithm: String,

    #[envconfig(from = "ARGOCD_CONTROLLER_HEARTBEAT_TIME", default = "10")]
    pub heartbeat_time_secs: u32,
}

impl Config {
    pub fn init_with_defaults() -> Result<Self> {
        Ok(Config::init_from_env()?)
    }

    /// The configured shard, or `None` when it is left to inference.
    pub fn explicit_shard(&self) -> Option<u32> {
        u32::try_from(self.shard).ok()
    }

    pub fn algorithm(&self) -> ShardingAlgorithm {
        ShardingAlgorithm::from_name(&self.sharding_algorithm)
    }

    /// Heartbeat period for the shard mapping, in seconds. Values outside
    /// `10..=60` are replaced by the default.
    pub fn heartbeat_secs(&self) -> u32 {
        if (MIN_HEARTBEAT_SECS..=MAX_HEARTBEAT_SECS).contains(&self.heartbeat_time_secs) {
            self.heartbeat_time_secs
        } else {
            warn!(
                configured = self.heartbeat_time_secs,
                default = DEFAULT_HEARTBEAT_SECS,
                "heartbeat time must be between {MIN_HEARTBEAT_SECS} and {MAX_HEARTBEAT_SECS} seconds, using the default"
            );
            DEFAULT_HEARTBEAT_SECS
        }
    }

    pub fn heartbeat_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.heartbeat_secs()))
    }

    pub fn heartbeat_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(
            self.heartbeat_secs() * HEARTBEAT_TIMEOUT_MULTIPLIER,
        ))
    }

    /// Shard owned by this replica.
    ///
    /// Without sharding this is always 0. Otherwise the configured shard is
    /// used, falling back to `infer`. A shard that is not below the replica
    /// count is replaced by 0.
    pub fn resolve_shard<F>(&self, infer: F) -> Result<u32>
    where
        F: FnOnce() -> Result<u32>,
    {
        if self.replicas <= 1 {
            info!("processing all cluster shards");
            return Ok(0);
        }

        let shard = match self.explicit_shard() {
            Some(shard) => shard,
            None => infer()?,
        };
        if shard >= self.replicas {
            warn!(
                shard,
                replicas = self.replicas,
                "calculated shard is not lower than the number of replicas, using shard 0"
            );
            return Ok(0);
        }
        info!(shard, replicas = self.replicas, "processing clusters from shard");
        Ok(shard)
    }

    pub fn build_cache(&self, shard: u32) -> ClusterSharding {
        ClusterSharding::with_algorithm(shard, self.replicas, self.algorithm())
    }
}
