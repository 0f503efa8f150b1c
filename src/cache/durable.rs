//! Durable Tier Module
//!
//! The authoritative tier. Wraps a [`DurableStore`], serializes payloads to
//! JSON strings on write, parses them back on read and tracks hit counts.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::keys::user_prefix;
use crate::cache::store::{DurableStore, StoredRow};
use crate::cache::CacheEntry;
use crate::error::Result;

// == Durable Tier ==
/// Persistent cache tier holding JSON payloads.
#[derive(Clone)]
pub struct DurableTier {
    store: Arc<dyn DurableStore>,
}

impl DurableTier {
    // == Constructor ==
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    /// Verifies the underlying store is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    // == Get ==
    /// Reads a live entry and records the hit.
    ///
    /// Expired rows and rows whose payload cannot be parsed are deleted and
    /// reported as absent. The hit is applied atomically to the row stored at
    /// that moment, and that row is what gets returned: a row deleted or
    /// replaced while this read was in flight stays deleted or replaced. A
    /// failure to persist the hit is logged and does not affect the result.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry<Value>>> {
        let Some(row) = self.store.get(key).await? else {
            return Ok(None);
        };

        let Some(mut entry) = self.live_entry(key, row).await else {
            return Ok(None);
        };

        match self.store.record_hit(key, current_timestamp_ms()).await {
            Ok(Some(current)) => Ok(self.live_entry(key, current).await),
            Ok(None) => {
                debug!(key = %key, "Durable entry removed during read");
                Ok(None)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to persist hit count");
                entry.record_hit();
                Ok(Some(entry))
            }
        }
    }

    /// Records a hit served by another tier against the durable row.
    ///
    /// Returns false if the row no longer exists.
    pub async fn record_hit(&self, key: &str) -> Result<bool> {
        Ok(self
            .store
            .record_hit(key, current_timestamp_ms())
            .await?
            .is_some())
    }

    // == Set ==
    /// Persists an entry, replacing any previous row for the key.
    pub async fn set(&self, entry: &CacheEntry<Value>) -> Result<()> {
        self.store.set(&entry_to_row(entry)?).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.store.delete(key).await
    }

    pub async fn delete_by_pattern(&self, pattern: &str) -> Result<usize> {
        self.store.delete_by_pattern(pattern).await
    }

    pub async fn delete_expired(&self) -> Result<usize> {
        self.store.delete_expired(current_timestamp_ms()).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }

    // == User Keys ==
    /// Returns every key in the namespace of `user_id`.
    pub async fn get_keys_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        self.store.keys_with_prefix(&user_prefix(user_id)).await
    }

    // == Most Frequently Used ==
    /// Returns up to `limit` entries ordered by hit count, highest first.
    ///
    /// Rows that cannot be parsed are skipped. Expiry is not checked.
    pub async fn get_most_frequently_used(&self, limit: usize) -> Result<Vec<CacheEntry<Value>>> {
        let rows = self.store.most_frequently_used(limit).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let key = row.key.clone();
                row_to_entry(row)
                    .map_err(|err| warn!(key = %key, error = %err, "Skipping unparseable entry"))
                    .ok()
            })
            .collect())
    }

    /// Parses a row, dropping it if it has expired or cannot be parsed.
    async fn live_entry(&self, key: &str, row: StoredRow) -> Option<CacheEntry<Value>> {
        if row.expires_at <= current_timestamp_ms() {
            debug!(key = %key, "Durable entry expired");
            self.drop_row(key).await;
            return None;
        }

        match row_to_entry(row) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(key = %key, error = %err, "Dropping unparseable durable entry");
                self.drop_row(key).await;
                None
            }
        }
    }

    async fn drop_row(&self, key: &str) {
        if let Err(err) = self.store.delete(key).await {
            warn!(key = %key, error = %err, "Failed to delete durable entry");
        }
    }
}

fn entry_to_row(entry: &CacheEntry<Value>) -> Result<StoredRow> {
    Ok(StoredRow {
        key: entry.key.clone(),
        data: serde_json::to_string(&entry.data)?,
        timestamp: entry.created_at,
        expires_at: entry.expires_at,
        ttl: entry.ttl_ms,
        hit_count: entry.hit_count,
        last_accessed: entry.last_accessed,
    })
}

fn row_to_entry(row: StoredRow) -> Result<CacheEntry<Value>> {
    let data: Value = serde_json::from_str(&row.data)?;

    Ok(CacheEntry {
        key: row.key,
        data,
        created_at: row.timestamp,
        ttl_ms: row.ttl,
        expires_at: row.timestamp.saturating_add(row.ttl),
        hit_count: row.hit_count,
        last_accessed: row.last_accessed,
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SledStore;
    use serde_json::json;
    use std::time::Duration;

    fn tier() -> (DurableTier, Arc<SledStore>) {
        let store = Arc::new(SledStore::temporary().unwrap());
        (DurableTier::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (tier, _) = tier();
        let entry = CacheEntry::new("k", json!({"v": 1}), Duration::from_secs(60));
        tier.set(&entry).await.unwrap();

        let read = tier.get("k").await.unwrap().unwrap();
        assert_eq!(read.data, json!({"v": 1}));
        assert_eq!(read.expires_at, entry.expires_at);
    }

    #[tokio::test]
    async fn test_get_increments_hit_count() {
        let (tier, store) = tier();
        let entry = CacheEntry::new("k", json!(1), Duration::from_secs(60));
        tier.set(&entry).await.unwrap();

        tier.get("k").await.unwrap();
        let second = tier.get("k").await.unwrap().unwrap();

        assert_eq!(second.hit_count, 2);
        assert_eq!(store.get("k").await.unwrap().unwrap().hit_count, 2);
    }

    #[tokio::test]
    async fn test_record_hit_only_touches_existing_rows() {
        let (tier, store) = tier();
        tier.set(&CacheEntry::new("k", json!(1), Duration::from_secs(60)))
            .await
            .unwrap();

        assert!(tier.record_hit("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap().unwrap().hit_count, 1);

        tier.delete("k").await.unwrap();
        assert!(!tier.record_hit("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_and_removed() {
        let (tier, store) = tier();
        let entry = CacheEntry::new("k", json!(1), Duration::from_millis(20));
        tier.set(&entry).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(tier.get("k").await.unwrap().is_none());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_poisoned_payload_is_dropped() {
        let (tier, store) = tier();
        store
            .set(&StoredRow {
                key: "bad".into(),
                data: "{not json".into(),
                timestamp: current_timestamp_ms(),
                expires_at: u64::MAX,
                ttl: u64::MAX,
                hit_count: 0,
                last_accessed: 0,
            })
            .await
            .unwrap();

        assert!(tier.get("bad").await.unwrap().is_none());
        assert!(store.get("bad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_keys_for_user() {
        let (tier, _) = tier();
        let ttl = Duration::from_secs(60);
        tier.set(&CacheEntry::new("user:7:a", json!(1), ttl)).await.unwrap();
        tier.set(&CacheEntry::new("user:7:b", json!(2), ttl)).await.unwrap();
        tier.set(&CacheEntry::new("user:70:c", json!(3), ttl)).await.unwrap();

        let mut keys = tier.get_keys_for_user("7").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["user:7:a".to_string(), "user:7:b".to_string()]);
    }

    #[tokio::test]
    async fn test_most_frequently_used_order() {
        let (tier, _) = tier();
        let ttl = Duration::from_secs(60);
        for (key, hits) in [("a", 1u64), ("b", 5), ("c", 3)] {
            let mut entry = CacheEntry::new(key, json!(key), ttl);
            entry.hit_count = hits;
            tier.set(&entry).await.unwrap();
        }

        let top = tier.get_most_frequently_used(2).await.unwrap();
        let keys: Vec<&str> = top.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }
}
