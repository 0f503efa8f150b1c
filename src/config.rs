//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::advisor::ServiceSettings;
use crate::cache::CacheSettings;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the response cache is used at all
    pub cache_enabled: bool,
    /// Default TTL in seconds for cached answers
    pub default_ttl: u64,
    /// Maximum number of entries in the in-memory tier
    pub max_size: usize,
    /// Number of frequently used entries loaded into memory at startup
    pub warm_load_limit: usize,
    /// Interval in seconds between scheduled prunes (0 disables the schedule)
    pub prune_interval: u64,
    /// Location of the durable cache database
    pub db_path: PathBuf,
    /// TTL in seconds for cached chat replies
    pub chat_ttl: u64,
    /// Remote advisory endpoint
    pub advisor_url: String,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENABLED` - Enable the cache (default: true)
    /// - `CACHE_DEFAULT_TTL_SECS` - Default TTL in seconds (default: 86400)
    /// - `CACHE_MAX_SIZE` - Memory tier capacity (default: 100)
    /// - `CACHE_WARM_LOAD_LIMIT` - Entries warm-loaded at startup (default: 20)
    /// - `CACHE_PRUNE_INTERVAL_SECS` - Prune frequency in seconds (default: 3600)
    /// - `CACHE_DB_PATH` - Durable store path (default: ./data/advisory-cache)
    /// - `CHAT_TTL_SECS` - TTL for chat replies (default: 3600)
    /// - `ADVISOR_URL` - Remote advisor endpoint (default: http://127.0.0.1:8080/advise)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            cache_enabled: env_or("CACHE_ENABLED", defaults.cache_enabled),
            default_ttl: env_or("CACHE_DEFAULT_TTL_SECS", defaults.default_ttl),
            max_size: env_or("CACHE_MAX_SIZE", defaults.max_size),
            warm_load_limit: env_or("CACHE_WARM_LOAD_LIMIT", defaults.warm_load_limit),
            prune_interval: env_or("CACHE_PRUNE_INTERVAL_SECS", defaults.prune_interval),
            db_path: env::var("CACHE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            chat_ttl: env_or("CHAT_TTL_SECS", defaults.chat_ttl),
            advisor_url: env::var("ADVISOR_URL").unwrap_or(defaults.advisor_url),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Settings for the cache manager.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            enabled: self.cache_enabled,
            default_ttl: Duration::from_secs(self.default_ttl),
            max_size: self.max_size,
            warm_load_limit: self.warm_load_limit,
        }
    }

    /// Settings for the advisory service.
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            recommendation_ttl: Duration::from_secs(self.default_ttl),
            chat_ttl: Duration::from_secs(self.chat_ttl),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            default_ttl: 86_400,
            max_size: 100,
            warm_load_limit: 20,
            prune_interval: 3_600,
            db_path: PathBuf::from("./data/advisory-cache"),
            chat_ttl: 3_600,
            advisor_url: "http://127.0.0.1:8080/advise".to_string(),
            server_port: 3000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
