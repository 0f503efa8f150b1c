//! Response DTOs for the advisory service
//!
//! Defines the advisor's result payload and the HTTP response bodies.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, PruneReport};

// == Advisory Response ==
/// Result produced by the remote advisor. This is the cached payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryResponse {
    /// Free-text answer or summary
    pub message: String,
    #[serde(default)]
    pub recommendations: Vec<RecommendationItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    pub name: String,
    #[serde(default)]
    pub reason: String,
    /// Match score in [0, 1]
    #[serde(default)]
    pub score: f64,
}

/// Response body for POST /advise
#[derive(Debug, Clone, Serialize)]
pub struct AdviseResponse {
    /// Whether the answer came from the cache
    pub cached: bool,
    pub result: AdvisoryResponse,
}

/// Response body for the invalidation endpoints
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Number of entries removed
    pub removed: usize,
    pub message: String,
}

impl InvalidateResponse {
    pub fn new(removed: usize, target: impl std::fmt::Display) -> Self {
        Self {
            removed,
            message: format!("Removed {} cached entries for {}", removed, target),
        }
    }
}

/// Response body for POST /cache/prune
#[derive(Debug, Clone, Serialize)]
pub struct PruneResponse {
    pub memory: usize,
    pub durable: usize,
}

impl From<PruneReport> for PruneResponse {
    fn from(report: PruneReport) -> Self {
        Self {
            memory: report.memory,
            durable: report.durable,
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub memory_hits: u64,
    pub durable_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub writes: u64,
    pub rollbacks: u64,
    pub memory_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub enabled: bool,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, enabled: bool) -> Self {
        Self {
            memory_hits: stats.memory_hits,
            durable_hits: stats.durable_hits,
            misses: stats.misses,
            evictions: stats.evictions,
            writes: stats.writes,
            rollbacks: stats.rollbacks,
            memory_entries: stats.memory_entries,
            hit_rate: stats.hit_rate(),
            enabled,
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" once the service has initialized, "starting" before
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(initialized: bool) -> Self {
        Self {
            status: if initialized { "healthy" } else { "starting" }.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
