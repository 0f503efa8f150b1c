//! Cache Module
//!
//! Two-tier response cache: a bounded in-memory tier in front of an
//! authoritative durable tier, with deterministic key derivation.

mod durable;
mod entry;
pub mod keys;
mod lru;
mod manager;
mod memory;
mod stats;
mod store;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export public types
pub use durable::DurableTier;
pub use entry::{current_timestamp_ms, CacheEntry};
pub use keys::derive_key;
pub use lru::LruTracker;
pub use manager::{CacheManager, CacheSettings, PruneReport};
pub use memory::MemoryTier;
pub use stats::CacheStats;
pub use store::{DurableStore, SledStore, StoredRow};
