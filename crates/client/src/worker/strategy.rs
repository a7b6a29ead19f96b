//! Cache-first and network-first strategies.
//!
//! Both always produce a response: network and cache failures fall through
//! to the offline fallback, and cache writes are best-effort.

use serde::{Deserialize, Serialize};
use shellcache_core::{Request, Response};

use super::fallback::OfflineFallback;
use super::storage::CacheStorage;
use crate::classify::Classifier;
use crate::fetch::Network;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Network,
    Fallback,
}

/// Outcome of one strategy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyResult {
    pub source: Source,
    pub response: Response,
}

impl StrategyResult {
    fn new(source: Source, response: Response) -> Self {
        Self { source, response }
    }
}

/// Borrowed dependencies of a strategy run.
pub struct StrategyContext<'a> {
    pub storage: &'a dyn CacheStorage,
    pub network: &'a dyn Network,
    pub classifier: &'a Classifier,
    pub fallback: &'a OfflineFallback,
}

/// Cache lookup where an unreadable cache counts as a miss.
pub(crate) async fn lookup(storage: &dyn CacheStorage, url: &str) -> Option<Response> {
    match storage.match_any(url).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(url, error = %e, "cache lookup failed; treating as miss");
            None
        }
    }
}

async fn store(storage: &dyn CacheStorage, partition: &str, url: &str, response: &Response) {
    if let Err(e) = storage.put(partition, url, response).await {
        tracing::warn!(url, partition, error = %e, "cache write failed; serving uncached response");
    }
}

/// Serve from cache; on a miss fetch, cache successful responses in
/// `partition`, and return the network response.
pub async fn cache_first(ctx: &StrategyContext<'_>, request: &Request, partition: &str) -> StrategyResult {
    if let Some(cached) = lookup(ctx.storage, &request.url).await {
        tracing::debug!("cache hit for {}", request.url);
        return StrategyResult::new(Source::Cache, cached);
    }

    match ctx.network.fetch(request).await {
        Ok(response) => {
            if response.ok() {
                store(ctx.storage, partition, &request.url, &response).await;
            }
            StrategyResult::new(Source::Network, response)
        }
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "cache-first fetch failed");
            let response = ctx.fallback.respond(ctx.storage, ctx.classifier, request).await;
            StrategyResult::new(Source::Fallback, response)
        }
    }
}

/// Fetch first, caching successful responses in `partition`; when the
/// network fails, serve from cache, then the offline fallback.
pub async fn network_first(ctx: &StrategyContext<'_>, request: &Request, partition: &str) -> StrategyResult {
    match ctx.network.fetch(request).await {
        Ok(response) => {
            if response.ok() {
                store(ctx.storage, partition, &request.url, &response).await;
            }
            StrategyResult::new(Source::Network, response)
        }
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "network failed, trying cache");
            if let Some(cached) = lookup(ctx.storage, &request.url).await {
                return StrategyResult::new(Source::Cache, cached);
            }
            let response = ctx.fallback.respond(ctx.storage, ctx.classifier, request).await;
            StrategyResult::new(Source::Fallback, response)
        }
    }
}
