//! Advisory Service
//!
//! Derives a cache key from each request, answers from the cache when it can
//! and otherwise calls the advisor and stores the result.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::Advisor;
use crate::cache::{CacheManager, CacheStats, PruneReport};
use crate::error::ServiceError;
use crate::models::{AdvisoryRequest, AdvisoryResponse};
use crate::single_flight::InitGate;

// == Service Settings ==
/// Per-request-kind cache lifetimes.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub recommendation_ttl: Duration,
    pub chat_ttl: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            recommendation_ttl: Duration::from_secs(24 * 60 * 60),
            chat_ttl: Duration::from_secs(60 * 60),
        }
    }
}

// == Advisory Service ==
/// Cache-fronted advisory service. Cloning is cheap.
#[derive(Clone)]
pub struct AdvisoryService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    cache: CacheManager,
    advisor: Arc<dyn Advisor>,
    settings: ServiceSettings,
    init: InitGate<ServiceError>,
}

impl AdvisoryService {
    pub fn new(cache: CacheManager, advisor: Arc<dyn Advisor>, settings: ServiceSettings) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                cache,
                advisor,
                settings,
                init: InitGate::new("advisory-service"),
            }),
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.inner.cache
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.init.is_initialized()
    }

    // == Initialize ==
    /// Initializes the cache and prepares the advisor.
    ///
    /// Concurrent calls share a single attempt; a failed attempt is retried by
    /// the next caller.
    pub async fn initialize(&self) -> Result<(), ServiceError> {
        let cache = self.inner.cache.clone();
        let advisor = self.inner.advisor.clone();

        self.inner
            .init
            .run(move || async move {
                cache.initialize().await?;
                advisor.prepare().await
            })
            .await
    }

    // == Advise ==
    /// Answers a request, from the cache when possible.
    ///
    /// Returns the answer and whether it was served from the cache. If the
    /// service cannot initialize, the advisor is called uncached.
    pub async fn advise(
        &self,
        request: &AdvisoryRequest,
    ) -> Result<(AdvisoryResponse, bool), ServiceError> {
        if let Some(error_msg) = request.validate() {
            return Err(ServiceError::InvalidRequest(error_msg));
        }

        if let Err(err) = self.initialize().await {
            warn!(error = %err, "Advisory service not initialized, answering uncached");
        }

        let cache = &self.inner.cache;
        let key = cache.generate_key(request);

        if let Some(cached) = cache.get::<AdvisoryResponse>(&key).await {
            debug!(key = %key, "Serving cached advice");
            return Ok((cached, true));
        }

        let result = self.inner.advisor.compute(request).await?;
        cache.set(&key, &result, Some(self.ttl_for(request))).await;

        Ok((result, false))
    }

    fn ttl_for(&self, request: &AdvisoryRequest) -> Duration {
        match request {
            AdvisoryRequest::Recommendations(_) => self.inner.settings.recommendation_ttl,
            AdvisoryRequest::Chat(_) => self.inner.settings.chat_ttl,
        }
    }

    // == Invalidation ==
    /// Drops every cached answer for a user.
    pub async fn invalidate_user(&self, user_id: &str) -> usize {
        self.inner.cache.delete_for_user(user_id).await
    }

    /// Drops every cached answer whose key contains `pattern`.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        self.inner.cache.delete_by_pattern(pattern).await
    }

    pub async fn clear(&self) {
        self.inner.cache.clear().await
    }

    pub async fn prune(&self) -> PruneReport {
        self.inner.cache.prune_cache().await
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.cache.stats().await
    }
}
