//! Test doubles for the durable store.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::store::{DurableStore, SledStore, StoredRow};
use crate::error::{CacheError, Result};

/// Sled-backed store whose operations can be made to fail on demand.
pub struct FlakyStore {
    inner: SledStore,
    pub fail_ping: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_scans: AtomicBool,
    pub pings: AtomicUsize,
    /// Pause inserted after every `get` has read its row
    pub get_delay_ms: AtomicU64,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::wrap(SledStore::temporary().unwrap())
    }

    pub fn wrap(inner: SledStore) -> Self {
        Self {
            inner,
            fail_ping: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_scans: AtomicBool::new(false),
            pings: AtomicUsize::new(0),
            get_delay_ms: AtomicU64::new(0),
        }
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(CacheError::Storage(format!("{} failed", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DurableStore for FlakyStore {
    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(CacheError::StorageUnavailable("store offline".into()));
        }
        self.inner.ping().await
    }

    async fn get(&self, key: &str) -> Result<Option<StoredRow>> {
        let row = self.inner.get(key).await?;
        let delay = self.get_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(row)
    }

    async fn set(&self, row: &StoredRow) -> Result<()> {
        Self::check(&self.fail_writes, "set")?;
        self.inner.set(row).await
    }

    async fn record_hit(&self, key: &str, now_ms: u64) -> Result<Option<StoredRow>> {
        Self::check(&self.fail_writes, "record_hit")?;
        self.inner.record_hit(key, now_ms).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize> {
        Self::check(&self.fail_scans, "delete_by_pattern")?;
        self.inner.delete_by_pattern(pattern).await
    }

    async fn delete_expired(&self, now_ms: u64) -> Result<usize> {
        Self::check(&self.fail_scans, "delete_expired")?;
        self.inner.delete_expired(now_ms).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Self::check(&self.fail_scans, "keys_with_prefix")?;
        self.inner.keys_with_prefix(prefix).await
    }

    async fn most_frequently_used(&self, limit: usize) -> Result<Vec<StoredRow>> {
        Self::check(&self.fail_scans, "most_frequently_used")?;
        self.inner.most_frequently_used(limit).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}
