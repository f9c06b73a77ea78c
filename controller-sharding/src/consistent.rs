//! Consistent hashing with bounded loads.
//!
//! Each shard owns [`REPLICATION_FACTOR`] virtual points on a 64-bit ring. A
//! key is served by the first shard clockwise from its hash whose load stays
//! within [`LOAD_BOUND`] times the average, so a heavy shard spills keys onto
//! its neighbours instead of growing without limit.
//!
//! Reference: Mirrokni, Thorup & Zadimoghaddam, "Consistent Hashing with
//! Bounded Loads", https://arxiv.org/abs/1608.01350

use crate::hash::ring_hash;

pub const REPLICATION_FACTOR: u32 = 1000;
pub const LOAD_BOUND: f64 = 1.25;

#[derive(Debug, Clone)]
pub struct BoundedLoadRing {
    /// (ring position, shard), sorted by position.
    points: Vec<(u64, u32)>,
    loads: Vec<u64>,
    total_load: u64,
}

impl BoundedLoadRing {
    pub fn new(shards: u32) -> Self {
        let mut points = Vec::with_capacity(shards as usize * REPLICATION_FACTOR as usize);
        for shard in 0..shards {
            for i in 0..REPLICATION_FACTOR {
                points.push((ring_hash(&format!("{shard}{i}")), shard));
            }
        }
        points.sort_unstable();

        Self {
            points,
            loads: vec![0; shards as usize],
            total_load: 0,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.loads.len()
    }

    pub fn load(&self, shard: u32) -> u64 {
        self.loads.get(shard as usize).copied().unwrap_or(0)
    }

    pub fn total_load(&self) -> u64 {
        self.total_load
    }

    /// Add `load` to `shard`. Unknown shards are ignored.
    pub fn add_load(&mut self, shard: u32, load: u64) {
        if let Some(current) = self.loads.get_mut(shard as usize) {
            *current += load;
            self.total_load += load;
        }
    }

    /// Find the shard for `key`: the first one clockwise from the key's hash
    /// that can take one more unit of load without exceeding the bound.
    ///
    /// A full lap without a match falls back to the least loaded shard, so the
    /// walk always terminates. Returns `None` only for an empty ring.
    pub fn get_least(&self, key: &str) -> Option<u32> {
        if self.points.is_empty() {
            return None;
        }

        let position = ring_hash(key);
        let start = self.points.partition_point(|(point, _)| *point < position);
        let len = self.points.len();

        (0..len)
            .map(|step| self.points[(start + step) % len].1)
            .find(|shard| self.load_ok(*shard))
            .or_else(|| self.least_loaded())
    }

    fn max_load(&self) -> f64 {
        let shards = self.loads.len().max(1) as u64;
        let average = ((self.total_load + 1) / shards).max(1);
        average as f64 * LOAD_BOUND
    }

    fn load_ok(&self, shard: u32) -> bool {
        (self.load(shard) + 1) as f64 <= self.max_load()
    }

    fn least_loaded(&self) -> Option<u32> {
        (0..self.loads.len())
            .min_by_key(|shard| (self.loads[*shard], *shard))
            .map(|shard| shard as u32)
    }
}
