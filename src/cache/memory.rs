//! Memory Tier Module
//!
//! The volatile tier: a bounded in-process map with LRU eviction.
//!
//! `get` does not enforce TTL; the manager decides what to do with an expired
//! entry. Only `delete_expired` and `delete_by_pattern` scan the whole map.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, LruTracker};

// == Memory Tier ==
/// Bounded key to entry map with least-recently-used eviction.
#[derive(Debug)]
pub struct MemoryTier<V> {
    /// Key-entry storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Maximum number of entries allowed
    max_size: usize,
}

impl<V: Clone> MemoryTier<V> {
    // == Constructor ==
    /// Creates an empty tier holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            max_size,
        }
    }

    // == Set Max Size ==
    /// Changes the capacity, evicting LRU entries if the tier is now over it.
    ///
    /// Returns the keys that were evicted.
    pub fn set_max_size(&mut self, max_size: usize) -> Vec<String> {
        self.max_size = max_size;
        self.evict_overflow()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    // == Get ==
    /// Returns a copy of the entry and marks it most recently used.
    ///
    /// Expired entries are returned as-is.
    pub fn get(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.get_mut(key)?;
        entry.record_hit();
        let entry = entry.clone();
        self.lru.touch(key);
        Some(entry)
    }

    /// Returns the entry without touching recency or hit metadata.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Set ==
    /// Inserts or overwrites an entry expiring `ttl` from now.
    ///
    /// Returns the keys evicted to stay within capacity.
    pub fn set(&mut self, key: &str, data: V, ttl: Duration) -> Vec<String> {
        self.insert(CacheEntry::new(key, data, ttl))
    }

    // == Insert ==
    /// Inserts a prebuilt entry, keeping its timestamps and hit count.
    ///
    /// Used to backfill from the durable tier so the entry keeps its original
    /// expiry. Returns the keys evicted to stay within capacity.
    pub fn insert(&mut self, entry: CacheEntry<V>) -> Vec<String> {
        self.lru.touch(&entry.key);
        self.entries.insert(entry.key.clone(), entry);
        self.evict_overflow()
    }

    // == Delete ==
    /// Removes an entry, returning whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }

    // == Delete Expired ==
    /// Removes every entry past its expiry and returns how many were removed.
    pub fn delete_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        self.remove_where(|_, entry| entry.is_expired_at(now))
    }

    // == Delete By Pattern ==
    /// Removes every entry whose key contains `pattern`.
    pub fn delete_by_pattern(&mut self, pattern: &str) -> usize {
        self.remove_where(|key, _| key.contains(pattern))
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn remove_where(&mut self, predicate: impl Fn(&str, &CacheEntry<V>) -> bool) -> usize {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| predicate(key, entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.entries.remove(key);
            self.lru.remove(key);
        }
        doomed.len()
    }

    fn evict_overflow(&mut self) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.max_size {
            match self.lru.evict_oldest() {
                Some(key) => {
                    self.entries.remove(&key);
                    evicted.push(key);
                }
                None => break,
            }
        }
        evicted
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const TTL: Duration = Duration::from_secs(300);

    #[test]
    fn test_set_and_get() {
        let mut tier = MemoryTier::new(10);
        tier.set("key1", "value1".to_string(), TTL);

        let entry = tier.get("key1").unwrap();
        assert_eq!(entry.data, "value1");
        assert_eq!(entry.hit_count, 1);
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let mut tier: MemoryTier<String> = MemoryTier::new(10);
        assert!(tier.get("nonexistent").is_none());
    }

    #[test]
    fn test_overwrite() {
        let mut tier = MemoryTier::new(10);
        tier.set("key1", 1, TTL);
        tier.set("key1", 2, TTL);

        assert_eq!(tier.get("key1").unwrap().data, 2);
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_get_does_not_enforce_ttl() {
        let mut tier = MemoryTier::new(10);
        tier.set("key1", 1, Duration::from_millis(20));
        sleep(Duration::from_millis(40));

        let entry = tier.get("key1").unwrap();
        assert!(entry.is_expired());
    }

    #[test]
    fn test_lru_eviction() {
        let mut tier = MemoryTier::new(3);
        tier.set("key1", 1, TTL);
        tier.set("key2", 2, TTL);
        tier.set("key3", 3, TTL);

        let evicted = tier.set("key4", 4, TTL);

        assert_eq!(evicted, vec!["key1".to_string()]);
        assert_eq!(tier.len(), 3);
        assert!(!tier.contains("key1"));
    }

    #[test]
    fn test_lru_touch_on_get() {
        let mut tier = MemoryTier::new(3);
        tier.set("key1", 1, TTL);
        tier.set("key2", 2, TTL);
        tier.set("key3", 3, TTL);

        tier.get("key1");
        tier.set("key4", 4, TTL);

        assert!(tier.contains("key1"));
        assert!(!tier.contains("key2"));
    }

    #[test]
    fn test_insert_keeps_metadata() {
        let mut tier = MemoryTier::new(10);
        let mut entry = CacheEntry::new("key1", 1, TTL);
        entry.hit_count = 7;
        let expires_at = entry.expires_at;

        tier.insert(entry);

        let stored = tier.peek("key1").unwrap();
        assert_eq!(stored.hit_count, 7);
        assert_eq!(stored.expires_at, expires_at);
    }

    #[test]
    fn test_shrinking_capacity_evicts() {
        let mut tier = MemoryTier::new(5);
        for i in 0..5 {
            tier.set(&format!("key{}", i), i, TTL);
        }

        let evicted = tier.set_max_size(2);

        assert_eq!(evicted.len(), 3);
        assert_eq!(tier.len(), 2);
        assert!(tier.contains("key3"));
        assert!(tier.contains("key4"));
    }

    #[test]
    fn test_delete() {
        let mut tier = MemoryTier::new(10);
        tier.set("key1", 1, TTL);

        assert!(tier.delete("key1"));
        assert!(!tier.delete("key1"));
        assert!(tier.is_empty());
    }

    #[test]
    fn test_delete_expired() {
        let mut tier = MemoryTier::new(10);
        tier.set("short", 1, Duration::from_millis(20));
        tier.set("long", 2, TTL);
        sleep(Duration::from_millis(40));

        assert_eq!(tier.delete_expired(), 1);
        assert!(tier.contains("long"));
        assert!(!tier.contains("short"));
    }

    #[test]
    fn test_delete_by_pattern() {
        let mut tier = MemoryTier::new(10);
        tier.set("user:42:aaa", 1, TTL);
        tier.set("user:42:bbb", 2, TTL);
        tier.set("user:7:ccc", 3, TTL);
        tier.set("plain", 4, TTL);

        assert_eq!(tier.delete_by_pattern("user:42"), 2);
        assert_eq!(tier.len(), 2);
        assert!(tier.contains("user:7:ccc"));
    }

    #[test]
    fn test_clear() {
        let mut tier = MemoryTier::new(10);
        tier.set("a", 1, TTL);
        tier.set("b", 2, TTL);
        tier.clear();

        assert!(tier.is_empty());
        tier.set("c", 3, TTL);
        assert_eq!(tier.len(), 1);
    }
}
