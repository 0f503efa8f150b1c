//! Cache Statistics Module
//!
//! Tracks cache effectiveness across both tiers.

use serde::Serialize;

// == Cache Stats ==
/// Counters maintained by the cache manager.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads answered by the volatile tier
    pub memory_hits: u64,
    /// Reads answered by the durable tier
    pub durable_hits: u64,
    /// Reads that found nothing usable
    pub misses: u64,
    /// Entries evicted from the volatile tier due to capacity
    pub evictions: u64,
    /// Successful writes to both tiers
    pub writes: u64,
    /// Volatile writes rolled back after a failed durable write
    pub rollbacks: u64,
    /// Current number of entries in the volatile tier
    pub memory_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total hits across both tiers.
    pub fn hits(&self) -> u64 {
        self.memory_hits + self.durable_hits
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    pub fn record_memory_hit(&mut self) {
        self.memory_hits += 1;
    }

    pub fn record_durable_hit(&mut self) {
        self.durable_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_rollback(&mut self) {
        self.rollbacks += 1;
    }
}
