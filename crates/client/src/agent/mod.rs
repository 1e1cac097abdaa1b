//! The offline caching agent.
//!
//! The host drives an [`OfflineAgent`] through three entry points:
//!
//! - [`on_install`](OfflineAgent::on_install): precache the app shell into the current store
//! - [`on_activate`](OfflineAgent::on_activate): delete every store from older versions
//! - [`handle`](OfflineAgent::handle): answer one intercepted request
//!
//! `handle` classifies the request and hands it to the matching policy:
//!
//! | class      | policy                                  |
//! |------------|-----------------------------------------|
//! | Navigation | network first, cached app shell offline |
//! | Video      | network only, never cached              |
//! | Static     | stale-while-revalidate                  |

pub mod classify;
pub mod lifecycle;
pub mod policy;
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde::Serialize;
use shellcache_core::{AppConfig, CacheStorage, Error, Request, Response};
use tokio::sync::RwLock;
use url::Url;

use crate::fetch::{Network, normalize_trailing_slash, resolve};

pub use classify::{RequestClass, classify};
pub use lifecycle::{ActivateReport, InstallReport};
pub use policy::{OFFLINE_BODY, PolicyEngine, VIDEO_OFFLINE_BODY};
pub use tasks::BackgroundTasks;

/// Per-deployment settings, fixed for the agent's lifetime.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Name of the store this build reads and writes.
    pub cache_version: String,
    pub origin: Url,
    /// App root path with exactly one trailing slash.
    pub app_root: String,
    /// Key under which the app shell document is cached.
    pub shell_index: Url,
    /// App shell URLs precached on install, in order.
    pub manifest: Vec<Url>,
    /// Responses with a larger body are served but never stored.
    pub max_entry_bytes: usize,
}

impl AgentConfig {
    /// Resolve the configured paths against the origin.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        let resolve_entry =
            |entry: &str| resolve(&origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")));

        let shell_index = resolve_entry(&config.shell_index)?;
        let manifest = config
            .app_shell
            .iter()
            .map(|entry| resolve_entry(entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            cache_version: config.cache_version.clone(),
            origin,
            app_root: normalize_trailing_slash(&config.app_root),
            shell_index,
            manifest,
            max_entry_bytes: config.max_bytes,
        })
    }
}

/// Where the agent is in its install/activate lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Constructed, not yet installed.
    Parsed,
    Installing,
    /// Precached and eligible to activate.
    Installed,
    Activating,
    /// Owns the current store; older stores are gone.
    Activated,
    /// Install failed; this agent never activates.
    Redundant,
}

/// Offline agent bound to one cache version.
pub struct OfflineAgent {
    config: Arc<AgentConfig>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    policies: PolicyEngine,
    tasks: BackgroundTasks,
    state: RwLock<LifecycleState>,
}

impl OfflineAgent {
    pub fn new(config: AgentConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        let config = Arc::new(config);
        let tasks = BackgroundTasks::new();
        let policies = PolicyEngine::new(config.clone(), storage.clone(), network.clone(), tasks.clone());
        Self { config, storage, network, policies, tasks, state: RwLock::new(LifecycleState::Parsed) }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Background writes spawned by the policies.
    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Install event: precache the app shell.
    ///
    /// On failure nothing is stored and the agent becomes redundant, unless it
    /// is already active, in which case it keeps serving from its store.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        let previous = self.transition(LifecycleState::Installing, |s| {
            !matches!(s, LifecycleState::Installing | LifecycleState::Activating)
        })
        .await?;

        let result = lifecycle::install(
            self.storage.as_ref(),
            self.network.as_ref(),
            &self.config.cache_version,
            &self.config.manifest,
            self.config.max_entry_bytes,
        )
        .await;

        if let Err(e) = &result {
            tracing::warn!(cache_version = %self.config.cache_version, error = %e, "install failed");
        }
        *self.state.write().await = match (&result, previous) {
            (_, LifecycleState::Activated) => LifecycleState::Activated,
            (Ok(_), _) => LifecycleState::Installed,
            (Err(_), _) => LifecycleState::Redundant,
        };

        result
    }

    /// Activate event: drop every store that is not the current version.
    ///
    /// Only an installed (or already active) agent can activate.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        let previous = self.transition(LifecycleState::Activating, |s| {
            matches!(s, LifecycleState::Installed | LifecycleState::Activated)
        })
        .await?;

        let result = lifecycle::activate(self.storage.as_ref(), &self.config.cache_version).await;

        *self.state.write().await = if result.is_ok() { LifecycleState::Activated } else { previous };

        result
    }

    /// Answer an intercepted request. Never fails: offline outcomes are 503s.
    pub async fn handle(&self, request: Request) -> Response {
        let class = classify(&request);
        tracing::debug!(method = %request.method, url = %request.url, ?class, "intercepted request");

        match class {
            RequestClass::Navigation => self.policies.navigation(request).await,
            RequestClass::Video => self.policies.video(request).await,
            RequestClass::Static => self.policies.stale_while_revalidate(request).await,
        }
    }

    /// Move to `next` if `allowed(current)`, returning the state left behind.
    async fn transition(
        &self, next: LifecycleState, allowed: impl Fn(LifecycleState) -> bool,
    ) -> Result<LifecycleState, Error> {
        let mut state = self.state.write().await;
        let current = *state;
        if !allowed(current) {
            return Err(Error::InvalidState(format!("cannot move from {current:?} to {next:?}")));
        }
        *state = next;
        Ok(current)
    }
}
