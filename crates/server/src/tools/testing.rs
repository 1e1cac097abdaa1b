//! Test fixtures shared by the tool tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rmcp::model::{CallToolResult, RawContent};
use shellcache_client::{AgentConfig, Network, OfflineAgent};
use shellcache_core::http::{HeaderMap, HeaderValue, StatusCode, header};
use shellcache_core::{AppConfig, CacheDb, Error, Request, Response, ResponseSource};

pub(crate) const ORIGIN: &str = "https://app.test";

/// Network serving the B-Frame shell plus a few assets.
pub(crate) struct StaticNetwork {
    routes: HashMap<String, (u16, &'static str)>,
    offline: AtomicBool,
}

impl StaticNetwork {
    pub(crate) fn shell() -> Self {
        let mut routes = HashMap::new();
        routes.insert(format!("{ORIGIN}/b-frame/"), (200, "<html>root</html>"));
        routes.insert(format!("{ORIGIN}/b-frame/index.html"), (200, "<html>index</html>"));
        routes.insert(format!("{ORIGIN}/b-frame/manifest.webmanifest"), (200, "{\"name\":\"B-Frame\"}"));
        routes.insert(format!("{ORIGIN}/b-frame/app.js"), (200, "app()"));
        routes.insert(format!("{ORIGIN}/clip.mp4"), (200, "frames"));
        Self { routes, offline: AtomicBool::new(false) }
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("connection failed: {}", request.url)));
        }
        let (status, body) = self.routes.get(request.url.as_str()).copied().unwrap_or((404, "not found"));
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Ok(Response::new(StatusCode::from_u16(status).unwrap(), headers, body, ResponseSource::Network))
    }
}

/// Agent for `version` over a fresh in-memory SQLite cache.
pub(crate) async fn agent(version: &str, network: Arc<StaticNetwork>) -> Arc<OfflineAgent> {
    let app = AppConfig { cache_version: version.into(), origin: ORIGIN.into(), ..Default::default() };
    let config = AgentConfig::from_app_config(&app).unwrap();
    let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
    Arc::new(OfflineAgent::new(config, storage, network))
}

/// Agent for `version` sharing `other`'s cache.
pub(crate) fn sibling(other: &OfflineAgent, version: &str, network: Arc<StaticNetwork>) -> OfflineAgent {
    let app = AppConfig { cache_version: version.into(), origin: ORIGIN.into(), ..Default::default() };
    let config = AgentConfig::from_app_config(&app).unwrap();
    OfflineAgent::new(config, other.storage().clone(), network)
}

/// Parse the JSON text content of a tool result.
pub(crate) fn result_json(result: &CallToolResult) -> serde_json::Value {
    match &result.content[0].raw {
        RawContent::Text(text) => serde_json::from_str(&text.text).unwrap(),
        other => panic!("expected text content, got {other:?}"),
    }
}
