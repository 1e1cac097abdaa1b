//! shellcache host entry point.
//!
//! Boots one offline agent over the SQLite cache and serves it as an MCP
//! server on stdio. Logging goes to stderr to keep stdout free for JSON-RPC.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{AgentConfig, FetchConfig, HttpNetwork, OfflineAgent};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(cache_version = %config.cache_version, origin = %config.origin, db = %config.db_path.display(), "starting shellcache host");

    let cache = CacheDb::open(&config.db_path).await?;
    let network = HttpNetwork::new(FetchConfig::from(&config))?;
    let agent = Arc::new(OfflineAgent::new(
        AgentConfig::from_app_config(&config)?,
        Arc::new(cache),
        Arc::new(network),
    ));

    let server = serve_server(handler::ShellcacheHost::new(agent.clone()), stdio()).await?;
    server.waiting().await?;

    // Let pending cache writes land before the database closes.
    agent.tasks().settle().await;
    tracing::info!("shellcache host stopped");

    Ok(())
}
