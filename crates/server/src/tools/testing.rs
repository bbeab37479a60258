//! Fixtures shared by tool tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use url::Url;

use railbook_client::worker::{CachePolicyEngine, Collaborators, PolicyConfig};
use railbook_client::{CacheDirective, Network, NetworkError};
use railbook_core::{AppConfig, CacheDb, CacheRequest, ResponseSnapshot};

use crate::host::Outbox;

pub(crate) const ORIGIN: &str = "https://railbook.example";

/// Network answering by path; anything else is offline.
#[derive(Default)]
pub(crate) struct RouteNetwork {
    routes: Mutex<HashMap<String, ResponseSnapshot>>,
}

impl RouteNetwork {
    pub(crate) fn respond(&self, path: &str, response: ResponseSnapshot) {
        self.routes.lock().unwrap().insert(path.to_string(), response);
    }
}

#[async_trait]
impl Network for RouteNetwork {
    async fn fetch(&self, request: &CacheRequest, _directive: CacheDirective) -> Result<ResponseSnapshot, NetworkError> {
        let path = request.url.path();
        self.routes
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| NetworkError::Offline(format!("no route to {path}")))
    }
}

pub(crate) struct Fixture {
    pub(crate) engine: Arc<CachePolicyEngine>,
    pub(crate) storage: Arc<CacheDb>,
    pub(crate) network: Arc<RouteNetwork>,
    pub(crate) outbox: Arc<Outbox>,
}

impl Fixture {
    pub(crate) async fn new(assets: &[&str]) -> Self {
        let config = AppConfig {
            origin: ORIGIN.into(),
            cache_version: "tools-v1".into(),
            static_assets: assets.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        };
        let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let network = Arc::new(RouteNetwork::default());
        let outbox = Arc::new(Outbox::new(Url::parse(ORIGIN).unwrap()));
        let engine = Arc::new(CachePolicyEngine::new(
            PolicyConfig::from_app(&config).unwrap(),
            Collaborators {
                storage: storage.clone(),
                network: network.clone(),
                clients: outbox.clone(),
                registration: outbox.clone(),
            },
        ));
        Self { engine, storage, network, outbox }
    }

    /// Installed and activated, with the activation broadcast drained.
    pub(crate) async fn active(assets: &[&str]) -> Self {
        let fixture = Self::new(assets).await;
        fixture.engine.install().await.unwrap();
        fixture.engine.activate().await.unwrap();
        fixture.outbox.drain();
        fixture
    }
}

pub(crate) fn png(body: &'static [u8]) -> ResponseSnapshot {
    ResponseSnapshot::new(200, body).with_header("content-type", "image/png")
}

/// Parse the JSON text content of a tool result.
pub(crate) fn output(result: &CallToolResult) -> serde_json::Value {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
