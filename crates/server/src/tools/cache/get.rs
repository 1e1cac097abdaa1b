//! cache_get tool implementation.
//!
//! Looks a URL up in the current cache store without touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{OfflineAgent, fetch::resolve};
use shellcache_core::message::headers_to_pairs;
use shellcache_core::{Error, Request};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the cached GET request, absolute or relative to the origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheGetOutput {
    pub store: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(agent: &OfflineAgent, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&agent.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let store = agent.config().cache_version.clone();

    let response = agent
        .storage()
        .match_request(&store, &Request::get(url.clone()))
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    json_result(&CacheGetOutput {
        store,
        url: url.to_string(),
        status: response.status.as_u16(),
        headers: headers_to_pairs(&response.headers),
        body: response.text(),
    })
}
