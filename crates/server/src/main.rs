//! railbook-sw entry point.
//!
//! Boots the cache policy engine for the configured origin and exposes its
//! lifecycle events as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use railbook_client::worker::{CachePolicyEngine, Collaborators, PolicyConfig, spawn_size_sweep};
use railbook_client::{FetchConfig, HttpNetwork};
use railbook_core::{AppConfig, CacheDb};

mod error;
mod handler;
mod host;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "starting railbook-sw on stdio transport");

    let storage = Arc::new(CacheDb::open(&config.db_path).await?);
    let network = Arc::new(HttpNetwork::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        timeout: config.timeout(),
        ..Default::default()
    })?);
    let outbox = Arc::new(host::Outbox::new(config.origin_url()?));

    let engine = Arc::new(CachePolicyEngine::new(
        PolicyConfig::from_app(&config)?,
        Collaborators { storage, network, clients: outbox.clone(), registration: outbox.clone() },
    ));

    boot(&engine).await;

    let sweep = spawn_size_sweep(
        Arc::new(CacheDb::open(&config.db_path).await?),
        config.runtime_generation().bucket_name(),
        config.max_runtime_entries,
        config.sweep_interval(),
    );

    let handler = handler::RailbookServer::new(engine.clone(), outbox);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    sweep.abort();
    engine.retire().await;
    tracing::info!("railbook-sw stopped");

    Ok(())
}

/// Install, then activate straight away when install asked to skip waiting.
///
/// Failures leave the engine in a state the `sw_install` and `sw_activate`
/// tools can retry from.
async fn boot(engine: &CachePolicyEngine) {
    match engine.install().await {
        Ok(report) => tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "boot install finished"),
        Err(e) => {
            tracing::error!(error = %e, "boot install failed");
            return;
        }
    }

    if engine.skip_waiting_requested()
        && let Err(e) = engine.activate().await
    {
        tracing::error!(error = %e, "boot activation failed");
    }
}
