//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access metadata.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single cached payload with its expiry and access metadata.
///
/// All timestamps are Unix milliseconds. `expires_at` is always
/// `created_at + ttl_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Globally unique cache key
    pub key: String,
    /// The cached payload
    pub data: T,
    /// Creation timestamp
    pub created_at: u64,
    /// Time to live in milliseconds
    pub ttl_ms: u64,
    /// Expiration timestamp
    pub expires_at: u64,
    /// Number of successful reads
    pub hit_count: u64,
    /// Timestamp of the last successful read (or creation)
    pub last_accessed: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a fresh entry that expires `ttl` from now.
    pub fn new(key: impl Into<String>, data: T, ttl: Duration) -> Self {
        let now = current_timestamp_ms();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);

        Self {
            key: key.into(),
            data,
            created_at: now,
            ttl_ms,
            expires_at: now.saturating_add(ttl_ms),
            hit_count: 0,
            last_accessed: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Checks expiry against a caller-supplied timestamp.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Remaining TTL ==
    /// Returns the time left before expiry, zero once expired.
    pub fn remaining_ttl(&self) -> Duration {
        Duration::from_millis(self.expires_at.saturating_sub(current_timestamp_ms()))
    }

    // == Record Hit ==
    /// Bumps the hit counter and last-accessed time after a successful read.
    pub fn record_hit(&mut self) {
        self.hit_count = self.hit_count.saturating_add(1);
        self.last_accessed = current_timestamp_ms();
    }

    /// Maps the payload while keeping all metadata.
    pub fn map_data<U>(self, f: impl FnOnce(T) -> U) -> CacheEntry<U> {
        CacheEntry {
            key: self.key,
            data: f(self.data),
            created_at: self.created_at,
            ttl_ms: self.ttl_ms,
            expires_at: self.expires_at,
            hit_count: self.hit_count,
            last_accessed: self.last_accessed,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
