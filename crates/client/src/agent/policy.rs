//! Fetch strategies, one per [`RequestClass`](super::RequestClass).
//!
//! Network failures never escape a policy: each one turns them into a cache
//! fallback or a synthetic 503.

use std::sync::Arc;

use reqwest::Method;
use shellcache_core::{CacheStorage, Request, Response};
use tokio::sync::oneshot;

use super::AgentConfig;
use super::tasks::BackgroundTasks;
use crate::fetch::{Network, normalize_trailing_slash, same_origin};

/// Body of the 503 served when a page or asset is unavailable offline.
pub const OFFLINE_BODY: &str = "Offline";

/// Body of the 503 served when a video cannot be fetched.
pub const VIDEO_OFFLINE_BODY: &str = "Video offline";

/// Executes the three strategies against the current cache store.
#[derive(Clone)]
pub struct PolicyEngine {
    config: Arc<AgentConfig>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    tasks: BackgroundTasks,
}

impl PolicyEngine {
    pub fn new(
        config: Arc<AgentConfig>, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, tasks: BackgroundTasks,
    ) -> Self {
        Self { config, storage, network, tasks }
    }

    /// Network first. A fresh load of the app root refreshes the cached
    /// shell in the background; offline loads get the cached shell.
    pub async fn navigation(&self, request: Request) -> Response {
        match self.network.fetch(&request).await {
            Ok(fresh) => {
                if normalize_trailing_slash(request.url.path()) == self.config.app_root && self.fits(&fresh) {
                    let storage = self.storage.clone();
                    let version = self.config.cache_version.clone();
                    let key = Request::get(self.config.shell_index.clone());
                    let copy = fresh.clone();
                    self.tasks.spawn("shell-refresh", async move { storage.put(&version, &key, &copy).await });
                }
                fresh
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "navigation fetch failed, serving app shell");
                let key = Request::get(self.config.shell_index.clone());
                self.lookup(&key).await.unwrap_or_else(|| Response::offline(OFFLINE_BODY))
            }
        }
    }

    /// Network only. Media never enters the cache.
    pub async fn video(&self, request: Request) -> Response {
        match self.network.fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "video fetch failed");
                Response::offline(VIDEO_OFFLINE_BODY)
            }
        }
    }

    /// Stale-while-revalidate.
    ///
    /// The revalidating fetch starts alongside the cache lookup and runs to
    /// completion in the background. A cache hit is returned at once; a miss
    /// waits for the network. Any fetch failure counts as "no response".
    pub async fn stale_while_revalidate(&self, request: Request) -> Response {
        let (tx, rx) = oneshot::channel();

        let network = self.network.clone();
        let storage = self.storage.clone();
        let version = self.config.cache_version.clone();
        let origin = self.config.origin.clone();
        let max_entry_bytes = self.config.max_entry_bytes;
        let pending = request.clone();
        self.tasks.spawn("revalidate", async move {
            let fresh = match network.fetch(&pending).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(url = %pending.url, error = %e, "revalidation fetch failed");
                    let _ = tx.send(None);
                    return Ok(());
                }
            };

            let cacheable = pending.method == Method::GET
                && same_origin(&pending.url, &origin)
                && fresh.is_ok()
                && fresh.body.len() <= max_entry_bytes;
            let copy = cacheable.then(|| fresh.clone());
            // The caller may have been answered from cache already.
            let _ = tx.send(Some(fresh));

            match copy {
                Some(copy) => storage.put(&version, &pending, &copy).await,
                None => Ok(()),
            }
        });

        if let Some(cached) = self.lookup(&request).await {
            tracing::debug!(url = %request.url, "cache hit");
            return cached;
        }

        tracing::debug!(url = %request.url, "cache miss, waiting for network");
        match rx.await {
            Ok(Some(fresh)) => fresh,
            _ => self.lookup(&request).await.unwrap_or_else(|| Response::offline(OFFLINE_BODY)),
        }
    }

    fn fits(&self, response: &Response) -> bool {
        let fits = response.body.len() <= self.config.max_entry_bytes;
        if !fits {
            tracing::debug!(
                bytes = response.body.len(),
                limit = self.config.max_entry_bytes,
                "response too large to cache"
            );
        }
        fits
    }

    /// Look up `request` in the current store. Lookup errors count as misses.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.storage.match_request(&self.config.cache_version, request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }
}
