//! Cache Manager Module
//!
//! Orchestrates the volatile and durable tiers behind one interface.
//!
//! Reads check memory first, then the durable tier, backfilling memory on a
//! durable hit. Writes go to memory first and are rolled back if the durable
//! write fails. Every public operation is total: internal faults are logged
//! and surface as a miss or a no-op.

use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::keys::{self, user_prefix};
use crate::cache::store::DurableStore;
use crate::cache::{CacheEntry, CacheStats, DurableTier, MemoryTier};
use crate::error::{CacheError, Result};
use crate::single_flight::InitGate;

// == Cache Settings ==
/// Live-reconfigurable cache settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// When false, reads miss and writes are skipped; stored data is kept
    pub enabled: bool,
    /// TTL applied when `set` is called without one
    pub default_ttl: Duration,
    /// Capacity of the volatile tier
    pub max_size: usize,
    /// Number of entries seeded into memory during initialization
    pub warm_load_limit: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: Duration::from_secs(24 * 60 * 60),
            max_size: 100,
            warm_load_limit: 20,
        }
    }
}

// == Prune Report ==
/// Number of expired entries removed from each tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub memory: usize,
    pub durable: usize,
}

// == Cache Manager ==
/// Two-tier cache handle. Cloning is cheap and every clone shares state.
///
/// Construct one per process and pass it to consumers.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

struct Inner {
    settings: StdRwLock<CacheSettings>,
    memory: RwLock<MemoryTier<Value>>,
    durable: DurableTier,
    stats: StdRwLock<CacheStats>,
    init: InitGate<CacheError>,
}

impl CacheManager {
    // == Constructor ==
    pub fn new(store: Arc<dyn DurableStore>, settings: CacheSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                memory: RwLock::new(MemoryTier::new(settings.max_size)),
                settings: StdRwLock::new(settings),
                durable: DurableTier::new(store),
                stats: StdRwLock::new(CacheStats::new()),
                init: InitGate::new("cache-manager"),
            }),
        }
    }

    // == Initialize ==
    /// Verifies the durable store, prunes expired entries and warm-loads the
    /// most frequently used ones into memory.
    ///
    /// Concurrent calls share one attempt. Only an unreachable store fails
    /// initialization; pruning and warm-load faults are logged.
    pub async fn initialize(&self) -> Result<()> {
        let manager = self.clone();
        self.inner
            .init
            .run(move || async move { manager.startup().await })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.init.is_initialized()
    }

    async fn startup(&self) -> Result<()> {
        self.inner.durable.ping().await.map_err(|err| match err {
            CacheError::StorageUnavailable(msg) => CacheError::StorageUnavailable(msg),
            other => CacheError::StorageUnavailable(other.to_string()),
        })?;

        let pruned = self.prune_cache().await;
        let limit = self.settings().warm_load_limit;
        let loaded = self.load_frequent_entries(limit).await;

        info!(
            pruned_memory = pruned.memory,
            pruned_durable = pruned.durable,
            warm_loaded = loaded,
            "Cache initialized"
        );
        Ok(())
    }

    // == Configure ==
    /// Applies new settings. Disabling never purges stored data.
    pub async fn configure(&self, enabled: bool, default_ttl: Duration, max_size: usize) {
        {
            let mut settings = self
                .inner
                .settings
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            settings.enabled = enabled;
            settings.default_ttl = default_ttl;
            settings.max_size = max_size;
        }

        let evicted = self.inner.memory.write().await.set_max_size(max_size);
        self.record(|stats| stats.record_evictions(evicted.len()));

        info!(
            enabled,
            default_ttl_ms = default_ttl.as_millis() as u64,
            max_size,
            "Cache reconfigured"
        );
    }

    /// Returns a snapshot of the current settings.
    pub fn settings(&self) -> CacheSettings {
        self.inner
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // == Generate Key ==
    /// Derives the cache key for a request.
    pub fn generate_key<R: Serialize + ?Sized>(&self, request: &R) -> String {
        keys::derive_key(request)
    }

    // == Get ==
    /// Returns the cached value for `key`, or `None` on a miss.
    ///
    /// Disabled caches, initialization failures, storage faults and payloads
    /// that no longer parse as `T` all count as misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.settings().enabled {
            return None;
        }

        if let Err(err) = self.initialize().await {
            warn!(op = "get", key = %key, error = %err, "Cache not initialized, treating as miss");
            self.record(CacheStats::record_miss);
            return None;
        }

        let value = match self.lookup(key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                self.record(CacheStats::record_miss);
                return None;
            }
            Err(err) => {
                warn!(op = "get", key = %key, error = %err, "Cache read failed, treating as miss");
                self.record(CacheStats::record_miss);
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(op = "get", key = %key, error = %err, "Dropping entry that no longer parses");
                self.delete(key).await;
                None
            }
        }
    }

    async fn lookup(&self, key: &str) -> Result<Option<Value>> {
        {
            let mut memory = self.inner.memory.write().await;
            if let Some(entry) = memory.get(key) {
                if !entry.is_expired() {
                    debug!(key = %key, "Memory hit");
                    self.record(CacheStats::record_memory_hit);
                    self.write_through_hit(key);
                    return Ok(Some(entry.data));
                }
                debug!(key = %key, "Memory entry expired");
                memory.delete(key);
            }
        }

        let Some(entry) = self.inner.durable.get(key).await? else {
            return Ok(None);
        };

        debug!(key = %key, "Durable hit");
        self.record(CacheStats::record_durable_hit);
        let data = entry.data.clone();
        self.backfill(entry).await;
        Ok(Some(data))
    }

    /// Counts a memory hit against the durable row in the background, so
    /// warm-load ranks entries by every read.
    fn write_through_hit(&self, key: &str) {
        let durable = self.inner.durable.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            if let Err(err) = durable.record_hit(&key).await {
                debug!(key = %key, error = %err, "Failed to record memory hit durably");
            }
        });
    }

    async fn backfill(&self, entry: CacheEntry<Value>) {
        if entry.is_expired() {
            return;
        }
        let evicted = self.inner.memory.write().await.insert(entry);
        self.record(|stats| stats.record_evictions(evicted.len()));
    }

    // == Set ==
    /// Stores `data` under `key` in both tiers.
    ///
    /// Null payloads (including `None` and `()`) are refused. If the durable
    /// write fails the memory write is rolled back.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        let settings = self.settings();
        if !settings.enabled {
            debug!(key = %key, "Cache disabled, skipping write");
            return;
        }

        let value = match serde_json::to_value(data) {
            Ok(Value::Null) => {
                warn!(op = "set", key = %key, "Refusing to cache a null value");
                return;
            }
            Ok(value) => value,
            Err(err) => {
                warn!(op = "set", key = %key, error = %err, "Payload cannot be serialized");
                return;
            }
        };

        if let Err(err) = self.initialize().await {
            warn!(op = "set", key = %key, error = %err, "Cache not initialized, skipping write");
            return;
        }

        let entry = CacheEntry::new(key, value, ttl.unwrap_or(settings.default_ttl));

        let evicted = self.inner.memory.write().await.insert(entry.clone());
        self.record(|stats| stats.record_evictions(evicted.len()));

        match self.inner.durable.set(&entry).await {
            Ok(()) => self.record(CacheStats::record_write),
            Err(err) => {
                self.inner.memory.write().await.delete(key);
                self.record(CacheStats::record_rollback);
                let err = CacheError::Consistency(err.to_string());
                warn!(op = "set", key = %key, error = %err, "Durable write failed, rolled back memory write");
            }
        }
    }

    // == Delete ==
    /// Removes `key` from both tiers, returning whether either held it.
    pub async fn delete(&self, key: &str) -> bool {
        let in_memory = self.inner.memory.write().await.delete(key);
        let in_durable = self.inner.durable.delete(key).await.unwrap_or_else(|err| {
            warn!(op = "delete", key = %key, error = %err, "Durable delete failed");
            false
        });
        in_memory || in_durable
    }

    // == Delete By Pattern ==
    /// Removes every key containing `pattern` from both tiers.
    ///
    /// Returns the larger of the two per-tier counts.
    pub async fn delete_by_pattern(&self, pattern: &str) -> usize {
        let memory_count = self.inner.memory.write().await.delete_by_pattern(pattern);
        let durable_count = self
            .inner
            .durable
            .delete_by_pattern(pattern)
            .await
            .unwrap_or_else(|err| {
                warn!(op = "delete_by_pattern", pattern = %pattern, error = %err, "Durable pattern delete failed");
                0
            });

        debug!(pattern = %pattern, memory_count, durable_count, "Deleted by pattern");
        memory_count.max(durable_count)
    }

    // == Delete For User ==
    /// Removes every entry in the namespace of `user_id` from both tiers.
    pub async fn delete_for_user(&self, user_id: &str) -> usize {
        let keys = self
            .inner
            .durable
            .get_keys_for_user(user_id)
            .await
            .unwrap_or_else(|err| {
                warn!(op = "delete_for_user", user_id = %user_id, error = %err, "Failed to list user keys");
                Vec::new()
            });

        let mut durable_count = 0;
        let mut memory_count = 0;
        for key in &keys {
            match self.inner.durable.delete(key).await {
                Ok(true) => durable_count += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(op = "delete_for_user", key = %key, error = %err, "Durable delete failed")
                }
            }
            if self.inner.memory.write().await.delete(key) {
                memory_count += 1;
            }
        }
        memory_count += self
            .inner
            .memory
            .write()
            .await
            .delete_by_pattern(&user_prefix(user_id));

        info!(user_id = %user_id, durable_count, memory_count, "Invalidated user entries");
        memory_count.max(durable_count)
    }

    // == Clear ==
    /// Removes every entry from both tiers.
    pub async fn clear(&self) {
        self.inner.memory.write().await.clear();
        if let Err(err) = self.inner.durable.clear().await {
            warn!(op = "clear", error = %err, "Durable clear failed");
        }
        info!("Cache cleared");
    }

    // == Prune ==
    /// Removes expired entries from both tiers.
    ///
    /// A failure in the durable tier does not prevent pruning memory.
    pub async fn prune_cache(&self) -> PruneReport {
        let memory = self.inner.memory.write().await.delete_expired();
        let durable = self.inner.durable.delete_expired().await.unwrap_or_else(|err| {
            warn!(op = "prune", error = %err, "Durable prune failed");
            0
        });

        let report = PruneReport { memory, durable };
        debug!(memory, durable, "Pruned expired entries");
        report
    }

    // == Warm Load ==
    /// Seeds memory with the `limit` most frequently hit durable entries.
    ///
    /// Expired entries are skipped. Returns how many entries were seeded; a
    /// failure seeds nothing and is only logged.
    pub async fn load_frequent_entries(&self, limit: usize) -> usize {
        if limit == 0 {
            return 0;
        }

        let entries = match self.inner.durable.get_most_frequently_used(limit).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(op = "warm_load", error = %err, "Warm-load failed");
                return 0;
            }
        };

        let mut memory = self.inner.memory.write().await;
        let mut inserted = Vec::new();
        // Least used first so the most used end up most recently touched.
        for entry in entries.into_iter().rev() {
            if entry.is_expired() {
                continue;
            }
            inserted.push(entry.key.clone());
            let evicted = memory.insert(entry);
            self.record(|stats| stats.record_evictions(evicted.len()));
        }
        let seeded = inserted.iter().filter(|key| memory.contains(key)).count();

        debug!(seeded, "Warm-loaded frequent entries");
        seeded
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub async fn stats(&self) -> CacheStats {
        let memory_entries = self.inner.memory.read().await.len();
        let mut stats = self
            .inner
            .stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        stats.memory_entries = memory_entries;
        stats
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        let mut stats = self
            .inner
            .stats
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        update(&mut stats);
    }
}
