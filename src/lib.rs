//! Advisory Cache - a two-tier response cache in front of a remote advisor
//!
//! Provides deterministic request keys, a bounded in-memory tier backed by a
//! durable sled tier, and single-flight initialization.

pub mod advisor;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod single_flight;
pub mod tasks;

pub use advisor::{Advisor, AdvisoryService, RemoteAdvisor, ServiceSettings};
pub use api::AppState;
pub use cache::{CacheManager, CacheSettings, SledStore};
pub use config::Config;
pub use tasks::spawn_prune_task;
