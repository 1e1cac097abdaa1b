//! agent_fetch tool implementation.
//!
//! Hands one synthetic request to the agent as if a page had issued it.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{OfflineAgent, RequestClass, classify, fetch::resolve};
use shellcache_core::http::Method;
use shellcache_core::message::headers_to_pairs;
use shellcache_core::{Error, Request, RequestMode, ResponseSource};

use super::json_result;

/// Input parameters for the agent_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentFetchParams {
    /// URL to request, absolute or relative to the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Issue the request as a top-level navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the agent_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct AgentFetchOutput {
    pub url: String,
    pub classification: RequestClass,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Whether the answer came from the network, the cache, or the agent itself.
    pub source: ResponseSource,
}

/// Implementation of the agent_fetch tool.
pub async fn fetch_impl(agent: &OfflineAgent, params: AgentFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(agent, params)?;
    let url = request.url.to_string();
    let classification = classify(&request);

    let response = agent.handle(request).await;

    json_result(&AgentFetchOutput {
        url,
        classification,
        status: response.status.as_u16(),
        headers: headers_to_pairs(&response.headers),
        body: response.text(),
        source: response.source,
    })
}

fn build_request(agent: &OfflineAgent, params: AgentFetchParams) -> Result<Request, Error> {
    let url = resolve(&agent.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = Method::from_bytes(params.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {}", params.method)))?;

    let mut request = Request::new(method, url);
    if params.navigate {
        request = request.with_mode(RequestMode::Navigate);
    }
    if let Some(accept) = &params.accept {
        request = request.with_header("accept", accept);
    }
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }
    Ok(request)
}
