//! Health monitoring with simple caching.
//!
//! Grounded on the donor's `HealthCache`/`HealthService` pair: a cheap cached
//! read for hot paths (the liveness probe) and a `get_or_update` that
//! refreshes the cache at most once per TTL, avoiding repeated checks of the
//! scheduler loop and process registry on every probe.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sepex_core::ServiceHealth;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::service::process_registry::ProcessRegistry;

const TRACING_TARGET: &str = "sepex_server::service::health";

const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct HealthCacheEntry {
    health: RwLock<ServiceHealth>,
    last_check: RwLock<Instant>,
    cache_duration: Duration,
}

impl HealthCacheEntry {
    fn new(cache_duration: Duration) -> Self {
        Self {
            health: RwLock::new(ServiceHealth::unhealthy("not yet checked")),
            last_check: RwLock::new(Instant::now() - cache_duration),
            cache_duration,
        }
    }

    async fn get_or_update<F, Fut>(&self, check_fn: F) -> ServiceHealth
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ServiceHealth>,
    {
        let now = Instant::now();
        let last_check = *self.last_check.read().await;
        if now.duration_since(last_check) < self.cache_duration {
            return self.health.read().await.clone();
        }

        let health = check_fn().await;
        *self.health.write().await = health.clone();
        *self.last_check.write().await = now;
        health
    }

    async fn get_cached(&self) -> ServiceHealth {
        self.health.read().await.clone()
    }

    async fn invalidate(&self) {
        *self.last_check.write().await = Instant::now() - self.cache_duration;
    }
}

/// Health monitoring for the running scheduler, cached to keep `/healthz`
/// cheap under polling.
#[derive(Debug, Clone)]
pub struct HealthCache {
    cache: Arc<HealthCacheEntry>,
}

impl HealthCache {
    pub fn new() -> Self {
        Self::with_cache_duration(DEFAULT_CACHE_DURATION)
    }

    pub fn with_cache_duration(cache_duration: Duration) -> Self {
        tracing::info!(
            target: TRACING_TARGET,
            cache_duration_secs = cache_duration.as_secs(),
            "health cache initialized"
        );

        Self {
            cache: Arc::new(HealthCacheEntry::new(cache_duration)),
        }
    }

    /// Reports overall health: the scheduler loop must still be running and
    /// at least one process must be registered. A scheduler that has shut
    /// down is unhealthy; an empty registry is degraded (the server answers
    /// requests but can accept no executions).
    pub async fn is_healthy(
        &self,
        scheduler_shutdown: &CancellationToken,
        registry: &ProcessRegistry,
    ) -> ServiceHealth {
        self.cache
            .get_or_update(|| self.check(scheduler_shutdown, registry))
            .await
    }

    pub async fn get_cached_health(&self) -> ServiceHealth {
        self.cache.get_cached().await
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
        tracing::debug!(target: TRACING_TARGET, "health cache invalidated");
    }

    #[tracing::instrument(skip_all, target = TRACING_TARGET)]
    async fn check(&self, scheduler_shutdown: &CancellationToken, registry: &ProcessRegistry) -> ServiceHealth {
        let start = Instant::now();

        if scheduler_shutdown.is_cancelled() {
            tracing::warn!(target: TRACING_TARGET, "scheduler loop has shut down");
            return ServiceHealth::unhealthy("scheduler loop is not running")
                .with_response_time(start.elapsed());
        }

        if registry.is_empty() {
            tracing::warn!(target: TRACING_TARGET, "no processes registered");
            return ServiceHealth::degraded("no processes registered").with_response_time(start.elapsed());
        }

        ServiceHealth::healthy()
            .with_response_time(start.elapsed())
            .with_metric(
                "registered_processes",
                serde_json::Value::from(registry.len()),
            )
    }
}

impl Default for HealthCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[tokio::test]
    async fn unhealthy_when_scheduler_shut_down() {
        let health = HealthCache::with_cache_duration(Duration::from_millis(1));
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let registry = ProcessRegistry::new(HashMap::new());

        let report = health.is_healthy(&shutdown, &registry).await;
        assert_eq!(report.status, sepex_core::ServiceStatus::Unhealthy);
    }

    #[tokio::test]
    async fn degraded_when_registry_empty() {
        let health = HealthCache::with_cache_duration(Duration::from_millis(1));
        let shutdown = CancellationToken::new();
        let registry = ProcessRegistry::new(HashMap::new());

        let report = health.is_healthy(&shutdown, &registry).await;
        assert_eq!(report.status, sepex_core::ServiceStatus::Degraded);
    }

    #[tokio::test]
    async fn cached_result_is_reused_within_ttl() {
        let health = HealthCache::with_cache_duration(Duration::from_secs(60));
        let shutdown = CancellationToken::new();
        let registry = ProcessRegistry::new(HashMap::new());

        let first = health.is_healthy(&shutdown, &registry).await;
        shutdown.cancel();
        let second = health.is_healthy(&shutdown, &registry).await;
        assert_eq!(first.status, second.status);
    }

    #[tokio::test]
    async fn invalidate_forces_fresh_check() {
        let health = HealthCache::with_cache_duration(Duration::from_secs(60));
        let shutdown = CancellationToken::new();
        let registry = ProcessRegistry::new(HashMap::new());

        health.is_healthy(&shutdown, &registry).await;
        shutdown.cancel();
        health.invalidate().await;
        let report = health.is_healthy(&shutdown, &registry).await;
        assert_eq!(report.status, sepex_core::ServiceStatus::Unhealthy);
    }
}
