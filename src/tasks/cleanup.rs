//! Prune Task
//!
//! Background task that periodically removes expired cache entries from both
//! tiers.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Spawns a background task that runs `prune_cache` every `interval`.
///
/// The first run happens one interval after spawning; initialization already
/// prunes at startup.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let prune_handle = spawn_prune_task(cache.clone(), Duration::from_secs(3600));
/// // Later, during shutdown:
/// prune_handle.abort();
/// ```
pub fn spawn_prune_task(cache: CacheManager, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            "Starting cache prune task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let report = cache.prune_cache().await;

            if report.memory > 0 || report.durable > 0 {
                info!(
                    memory = report.memory,
                    durable = report.durable,
                    "Cache prune: removed expired entries"
                );
            } else {
                debug!("Cache prune: no expired entries found");
            }
        }
    })
}
