//! Durable Store Module
//!
//! The storage contract the durable tier is built on, and its sled-backed
//! implementation. Rows hold the payload already serialized to a string.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CacheError, Result};

// == Stored Row ==
/// One persisted cache row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRow {
    pub key: String,
    /// Serialized payload
    pub data: String,
    /// Creation timestamp (Unix milliseconds)
    pub timestamp: u64,
    pub expires_at: u64,
    /// Time to live in milliseconds
    pub ttl: u64,
    pub hit_count: u64,
    pub last_accessed: u64,
}

// == Durable Store Port ==
/// Storage backend for the durable tier.
///
/// Implementations must survive process restarts; `set` is an upsert and must
/// not return before the row is durable.
#[async_trait]
pub trait DurableStore: Send + Sync + 'static {
    /// Verifies the store is reachable.
    async fn ping(&self) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<StoredRow>>;

    async fn set(&self, row: &StoredRow) -> Result<()>;

    /// Bumps `hit_count` and sets `last_accessed` on the row currently stored
    /// under `key`, atomically.
    ///
    /// Returns the updated row, or `None` if the key is absent. Never creates a
    /// row and never touches the payload.
    async fn record_hit(&self, key: &str, now_ms: u64) -> Result<Option<StoredRow>>;

    /// Removes a row, returning whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Removes every row whose key contains `pattern`.
    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize>;

    /// Removes every row with `expires_at <= now_ms`.
    async fn delete_expired(&self, now_ms: u64) -> Result<usize>;

    /// Returns every key starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Returns up to `limit` rows ordered by hit count, highest first.
    async fn most_frequently_used(&self, limit: usize) -> Result<Vec<StoredRow>>;

    async fn clear(&self) -> Result<()>;
}

// == Sled Store ==
/// `DurableStore` backed by an embedded sled database.
///
/// Every mutation is flushed before returning. Blocking sled calls run on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Opens (or creates) the database at `path`.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::StorageUnavailable(format!("Failed to create directory: {}", e))
            })?;
        }

        let db = sled::open(path).map_err(|e| {
            CacheError::StorageUnavailable(format!("Failed to open sled database: {}", e))
        })?;

        Ok(Self { db })
    }

    /// Opens a throwaway database that is deleted when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open().map_err(|e| {
            CacheError::StorageUnavailable(format!("Failed to open sled database: {}", e))
        })?;

        Ok(Self { db })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&sled::Db) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| CacheError::Internal(format!("Storage task failed: {}", e)))?
    }
}

fn decode_row(bytes: &[u8]) -> Result<StoredRow> {
    Ok(serde_json::from_slice(bytes)?)
}

fn remove_keys(db: &sled::Db, keys: &[sled::IVec]) -> Result<usize> {
    for key in keys {
        db.remove(key)?;
    }
    if !keys.is_empty() {
        db.flush()?;
    }
    Ok(keys.len())
}

#[async_trait]
impl DurableStore for SledStore {
    async fn ping(&self) -> Result<()> {
        self.blocking(|db| {
            db.size_on_disk()
                .map(|_| ())
                .map_err(|e| CacheError::StorageUnavailable(e.to_string()))
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<StoredRow>> {
        let key = key.to_string();
        self.blocking(move |db| match db.get(key.as_bytes())? {
            Some(bytes) => decode_row(&bytes).map(Some),
            None => Ok(None),
        })
        .await
    }

    async fn set(&self, row: &StoredRow) -> Result<()> {
        let key = row.key.clone();
        let value = serde_json::to_vec(row)?;
        self.blocking(move |db| {
            db.insert(key.as_bytes(), value)?;
            db.flush()?;
            Ok(())
        })
        .await
    }

    async fn record_hit(&self, key: &str, now_ms: u64) -> Result<Option<StoredRow>> {
        let key = key.to_string();
        self.blocking(move |db| {
            let updated = db.update_and_fetch(key.as_bytes(), |current| {
                let bytes = current?;
                // Unreadable rows are left as they are; the read path drops them.
                let Ok(mut row) = decode_row(bytes) else {
                    return Some(bytes.to_vec());
                };
                row.hit_count = row.hit_count.saturating_add(1);
                row.last_accessed = now_ms;
                Some(serde_json::to_vec(&row).unwrap_or_else(|_| bytes.to_vec()))
            })?;

            match updated {
                Some(bytes) => {
                    db.flush()?;
                    decode_row(&bytes).map(Some)
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.blocking(move |db| {
            let removed = db.remove(key.as_bytes())?.is_some();
            if removed {
                db.flush()?;
            }
            Ok(removed)
        })
        .await
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = pattern.to_string();
        self.blocking(move |db| {
            let mut doomed = Vec::new();
            for item in db.iter().keys() {
                let key = item?;
                if String::from_utf8_lossy(&key).contains(pattern.as_str()) {
                    doomed.push(key);
                }
            }
            remove_keys(db, &doomed)
        })
        .await
    }

    async fn delete_expired(&self, now_ms: u64) -> Result<usize> {
        self.blocking(move |db| {
            let mut doomed = Vec::new();
            for item in db.iter() {
                let (key, value) = item?;
                match decode_row(&value) {
                    Ok(row) if row.expires_at <= now_ms => doomed.push(key),
                    Ok(_) => {}
                    Err(err) => {
                        warn!(
                            key = %String::from_utf8_lossy(&key),
                            error = %err,
                            "Dropping unreadable row during expiry sweep"
                        );
                        doomed.push(key);
                    }
                }
            }
            remove_keys(db, &doomed)
        })
        .await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        self.blocking(move |db| {
            let mut keys = Vec::new();
            for item in db.scan_prefix(prefix.as_bytes()).keys() {
                keys.push(String::from_utf8_lossy(&item?).into_owned());
            }
            Ok(keys)
        })
        .await
    }

    async fn most_frequently_used(&self, limit: usize) -> Result<Vec<StoredRow>> {
        self.blocking(move |db| {
            let mut rows = Vec::new();
            for item in db.iter().values() {
                match decode_row(&item?) {
                    Ok(row) => rows.push(row),
                    Err(err) => warn!(error = %err, "Skipping unreadable row"),
                }
            }
            rows.sort_by(|a, b| b.hit_count.cmp(&a.hit_count));
            rows.truncate(limit);
            Ok(rows)
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.blocking(|db| {
            db.clear()?;
            db.flush()?;
            Ok(())
        })
        .await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, hit_count: u64, expires_at: u64) -> StoredRow {
        StoredRow {
            key: key.to_string(),
            data: r#"{"v":1}"#.to_string(),
            timestamp: 1_000,
            expires_at,
            ttl: expires_at.saturating_sub(1_000),
            hit_count,
            last_accessed: 1_000,
        }
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = SledStore::temporary().unwrap();
        store.ping().await.unwrap();

        store.set(&row("a", 0, u64::MAX)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(row("a", 0, u64::MAX)));

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_is_upsert() {
        let store = SledStore::temporary().unwrap();
        store.set(&row("a", 0, u64::MAX)).await.unwrap();
        store.set(&row("a", 5, u64::MAX)).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().unwrap().hit_count, 5);
    }

    #[tokio::test]
    async fn test_delete_by_pattern_matches_substring() {
        let store = SledStore::temporary().unwrap();
        store.set(&row("user:42:a", 0, u64::MAX)).await.unwrap();
        store.set(&row("user:42:b", 0, u64::MAX)).await.unwrap();
        store.set(&row("user:420:c", 0, u64::MAX)).await.unwrap();
        store.set(&row("other", 0, u64::MAX)).await.unwrap();

        assert_eq!(store.delete_by_pattern("user:42:").await.unwrap(), 2);
        assert!(store.get("user:420:c").await.unwrap().is_some());
        assert!(store.get("other").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let store = SledStore::temporary().unwrap();
        store.set(&row("old", 0, 2_000)).await.unwrap();
        store.set(&row("new", 0, 10_000)).await.unwrap();

        assert_eq!(store.delete_expired(5_000).await.unwrap(), 1);
        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let store = SledStore::temporary().unwrap();
        store.set(&row("user:1:a", 0, u64::MAX)).await.unwrap();
        store.set(&row("user:1:b", 0, u64::MAX)).await.unwrap();
        store.set(&row("user:2:c", 0, u64::MAX)).await.unwrap();

        let mut keys = store.keys_with_prefix("user:1:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["user:1:a".to_string(), "user:1:b".to_string()]);
    }

    #[tokio::test]
    async fn test_most_frequently_used() {
        let store = SledStore::temporary().unwrap();
        store.set(&row("low", 1, u64::MAX)).await.unwrap();
        store.set(&row("high", 9, u64::MAX)).await.unwrap();
        store.set(&row("mid", 4, u64::MAX)).await.unwrap();

        let rows = store.most_frequently_used(2).await.unwrap();
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["high", "mid"]);
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sled");

        {
            let store = SledStore::open(&path).unwrap();
            store.set(&row("persisted", 3, u64::MAX)).await.unwrap();
        }

        let store = SledStore::open(&path).unwrap();
        let restored = store.get("persisted").await.unwrap().unwrap();
        assert_eq!(restored.hit_count, 3);
    }

    #[tokio::test]
    async fn test_record_hit_updates_counters_only() {
        let store = SledStore::temporary().unwrap();
        store.set(&row("a", 2, u64::MAX)).await.unwrap();

        let updated = store.record_hit("a", 5_000).await.unwrap().unwrap();

        assert_eq!(updated.hit_count, 3);
        assert_eq!(updated.last_accessed, 5_000);
        assert_eq!(updated.data, row("a", 2, u64::MAX).data);
        assert_eq!(store.get("a").await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_record_hit_never_creates_rows() {
        let store = SledStore::temporary().unwrap();

        assert_eq!(store.record_hit("gone", 5_000).await.unwrap(), None);
        assert_eq!(store.get("gone").await.unwrap(), None);
    }

    #[test]
    fn test_open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.sled");

        let store = SledStore::open(&path).unwrap();

        tokio_test::assert_ok!(tokio_test::block_on(store.ping()));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = SledStore::temporary().unwrap();
        store.set(&row("a", 0, u64::MAX)).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.get("a").await.unwrap().is_none());
    }
}
