//! Install and activate: creating, filling and retiring cache stores.

use futures_util::future::{join_all, try_join_all};
use serde::Serialize;
use shellcache_core::{CacheStorage, Error, Request};
use url::Url;

use crate::fetch::Network;

/// Result of a successful install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub cache_version: String,
    /// Manifest URLs now held by the store, in manifest order.
    pub precached: Vec<String>,
    /// The new version does not wait for old clients to go away.
    pub skip_waiting: bool,
}

/// Result of an activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    pub cache_version: String,
    /// Stale stores that were removed.
    pub deleted: Vec<String>,
    /// Stale stores whose deletion failed; they are retried on the next activation.
    pub failed: Vec<String>,
    /// The agent takes over already-open clients immediately.
    pub claim_clients: bool,
}

/// Precache the app shell into the store named `version`.
///
/// All manifest URLs are fetched concurrently. If any fetch fails, returns a
/// non-2xx status or has a body over `max_entry_bytes`, nothing is written
/// and the error names that URL.
pub async fn install(
    storage: &dyn CacheStorage, network: &dyn Network, version: &str, manifest: &[Url], max_entry_bytes: usize,
) -> Result<InstallReport, Error> {
    storage.open(version).await?;

    let fetches = manifest.iter().map(|url| async move {
        let request = Request::get(url.clone());
        let response = network.fetch(&request).await.map_err(|e| Error::PrecacheFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !response.is_ok() {
            return Err(Error::PrecacheFailed {
                url: url.to_string(),
                reason: format!("status {}", response.status.as_u16()),
            });
        }
        if response.body.len() > max_entry_bytes {
            let too_large =
                Error::FetchTooLarge(format!("{} bytes exceeds {}", response.body.len(), max_entry_bytes));
            return Err(Error::PrecacheFailed { url: url.to_string(), reason: too_large.to_string() });
        }
        Ok::<_, Error>((request, response))
    });

    let entries = try_join_all(fetches).await?;
    storage.put_all(version, &entries).await?;

    tracing::info!(cache_version = version, precached = entries.len(), "app shell precached");

    Ok(InstallReport {
        cache_version: version.to_string(),
        precached: manifest.iter().map(Url::to_string).collect(),
        skip_waiting: true,
    })
}

/// Delete every store except `version`.
///
/// Deletions run concurrently and independently: a failure is logged and
/// reported but does not stop the others.
pub async fn activate(storage: &dyn CacheStorage, version: &str) -> Result<ActivateReport, Error> {
    let stale: Vec<String> = storage
        .keys()
        .await?
        .into_iter()
        .filter(|name| name != version)
        .collect();

    let outcomes = join_all(stale.iter().map(|name| async move { (name, storage.delete(name).await) })).await;

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(_) => deleted.push(name.clone()),
            Err(e) => {
                tracing::warn!(store = %name, error = %e, "failed to delete stale cache store");
                failed.push(name.clone());
            }
        }
    }

    tracing::info!(cache_version = version, deleted = deleted.len(), failed = failed.len(), "activated");

    Ok(ActivateReport { cache_version: version.to_string(), deleted, failed, claim_clients: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{FailingDeletes, FakeNetwork};
    use shellcache_core::{CacheDb, MemoryCacheStorage};

    const LIMIT: usize = 1024 * 1024;

    fn manifest() -> Vec<Url> {
        ["/b-frame/", "/b-frame/index.html", "/b-frame/manifest.webmanifest"]
            .iter()
            .map(|p| Url::parse("https://app.test").unwrap().join(p).unwrap())
            .collect()
    }

    fn shell_network() -> FakeNetwork {
        let network = FakeNetwork::new();
        network.route("https://app.test/b-frame/", 200, "<html>root</html>");
        network.route("https://app.test/b-frame/index.html", 200, "<html>index</html>");
        network.route("https://app.test/b-frame/manifest.webmanifest", 200, "{\"name\":\"B-Frame\"}");
        network
    }

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let storage = CacheDb::open_in_memory().await.unwrap();
        let network = shell_network();

        let report = install(&storage, &network, "b-frame-v3.0", &manifest(), LIMIT).await.unwrap();
        assert!(report.skip_waiting);
        assert_eq!(report.precached.len(), 3);

        for url in manifest() {
            let hit = storage.match_request("b-frame-v3.0", &Request::get(url.clone())).await.unwrap();
            assert!(hit.is_some(), "{url} missing after install");
        }
    }

    #[tokio::test]
    async fn test_install_twice_is_idempotent() {
        let storage = CacheDb::open_in_memory().await.unwrap();
        let network = shell_network();

        install(&storage, &network, "v1", &manifest(), LIMIT).await.unwrap();
        install(&storage, &network, "v1", &manifest(), LIMIT).await.unwrap();

        let expected: Vec<String> = manifest().iter().map(Url::to_string).collect();
        assert_eq!(storage.requests("v1").await.unwrap(), expected);

        let index = storage
            .match_request("v1", &Request::get(manifest()[1].clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(index.text(), "<html>index</html>");
    }

    #[tokio::test]
    async fn test_install_fails_on_network_error_and_writes_nothing() {
        let storage = MemoryCacheStorage::new();
        let network = shell_network();
        network.fail("https://app.test/b-frame/manifest.webmanifest");

        let result = install(&storage, &network, "v1", &manifest(), LIMIT).await;
        match result {
            Err(Error::PrecacheFailed { url, .. }) => assert!(url.ends_with("manifest.webmanifest")),
            other => panic!("expected precache failure, got {other:?}"),
        }
        assert!(storage.requests("v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let storage = MemoryCacheStorage::new();
        let network = shell_network();
        network.route("https://app.test/b-frame/index.html", 404, "not found");

        let result = install(&storage, &network, "v1", &manifest(), LIMIT).await;
        assert!(matches!(result, Err(Error::PrecacheFailed { reason, .. }) if reason == "status 404"));
        assert!(storage.requests("v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_fails_on_oversized_shell_entry() {
        let storage = MemoryCacheStorage::new();
        let network = shell_network();

        let result = install(&storage, &network, "v1", &manifest(), 8).await;
        match result {
            Err(Error::PrecacheFailed { reason, .. }) => assert!(reason.starts_with("FETCH_TOO_LARGE")),
            other => panic!("expected precache failure, got {other:?}"),
        }
        assert!(storage.requests("v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_store() {
        let storage = MemoryCacheStorage::new();
        let network = shell_network();
        install(&storage, &network, "v2", &manifest(), LIMIT).await.unwrap();

        network.set_offline(true);
        assert!(install(&storage, &network, "v3", &manifest(), LIMIT).await.is_err());

        assert_eq!(storage.requests("v2").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_activate_removes_stale_stores() {
        let storage = CacheDb::open_in_memory().await.unwrap();
        storage.open("v2").await.unwrap();
        storage.open("v3").await.unwrap();

        let report = activate(&storage, "v3").await.unwrap();
        assert_eq!(report.deleted, vec!["v2"]);
        assert!(report.failed.is_empty());
        assert!(report.claim_clients);
        assert_eq!(storage.keys().await.unwrap(), vec!["v3"]);
    }

    #[tokio::test]
    async fn test_activate_leaves_exactly_current_store() {
        let storage = MemoryCacheStorage::new();
        for name in ["b-frame-v1.0", "b-frame-v2.0", "other-app", "b-frame-v3.0"] {
            storage.open(name).await.unwrap();
        }

        activate(&storage, "b-frame-v3.0").await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["b-frame-v3.0"]);
    }

    #[tokio::test]
    async fn test_activate_isolates_delete_failures() {
        let inner = MemoryCacheStorage::new();
        for name in ["v1", "v2", "v3"] {
            inner.open(name).await.unwrap();
        }
        let storage = FailingDeletes::new(inner, "v1");

        let report = activate(&storage, "v3").await.unwrap();
        assert_eq!(report.deleted, vec!["v2"]);
        assert_eq!(report.failed, vec!["v1"]);
        assert_eq!(storage.keys().await.unwrap(), vec!["v1", "v3"]);
    }
}
