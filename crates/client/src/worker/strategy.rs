//! Fetch interception: the per-request caching policy.
//!
//! | class | strategy |
//! |-------|----------|
//! | cross-origin, non-http, non-GET | pass through |
//! | data backend | network only, `no-store`, never touches storage |
//! | navigation | network first, then exact cache entry, then default document, then offline page |
//! | static asset | cache first with background refresh, else network and store |
//!
//! Storage failures on these paths are logged and treated as misses or
//! skipped writes; the caller always gets a response.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use railbook_core::{
    CacheRequest, CacheStorage, Error, GenerationId, NavigationStore, RequestClass, ResponseSnapshot, SkipReason,
};

use super::CachePolicyEngine;
use super::lifecycle::LifecycleState;
use super::messages::OutboundMessage;
use super::offline;
use crate::fetch::CacheDirective;

/// Where a returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    DefaultDocument,
    Offline,
}

/// Result of intercepting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The engine does not intervene; the host handles the request itself.
    PassThrough(SkipReason),
    Respond { response: ResponseSnapshot, source: ResponseSource },
}

impl FetchOutcome {
    fn respond(response: ResponseSnapshot, source: ResponseSource) -> Self {
        FetchOutcome::Respond { response, source }
    }

    pub fn response(&self) -> Option<&ResponseSnapshot> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            FetchOutcome::PassThrough(_) => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Respond { source, .. } => Some(*source),
            FetchOutcome::PassThrough(_) => None,
        }
    }
}

/// Open the bucket for `generation` and store `response` in it.
pub(crate) async fn store(
    storage: &dyn CacheStorage, generation: &GenerationId, request: &CacheRequest, response: &ResponseSnapshot,
) -> Result<(), Error> {
    let bucket = storage.open(generation).await?;
    storage.put(&bucket.name, request, response).await
}

impl CachePolicyEngine {
    /// Decide how to answer one intercepted request.
    pub async fn handle_fetch(&self, request: &CacheRequest) -> FetchOutcome {
        if self.state().await != LifecycleState::Active {
            return FetchOutcome::PassThrough(SkipReason::Inactive);
        }

        match self.classifier.classify(request) {
            RequestClass::PassThrough(reason) => {
                tracing::debug!(url = %request.url, ?reason, "not intercepting");
                FetchOutcome::PassThrough(reason)
            }
            RequestClass::ExternalApi => self.network_only(request).await,
            RequestClass::Navigation => self.network_first(request).await,
            RequestClass::StaticAsset => self.cache_first(request).await,
        }
    }

    async fn network_only(&self, request: &CacheRequest) -> FetchOutcome {
        match self.network.fetch(request, CacheDirective::NoStore).await {
            Ok(response) => FetchOutcome::respond(response, ResponseSource::Network),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "data backend unreachable");
                FetchOutcome::respond(offline::api_unavailable(), ResponseSource::Offline)
            }
        }
    }

    async fn network_first(&self, request: &CacheRequest) -> FetchOutcome {
        match self.network.fetch(request, CacheDirective::Bypass).await {
            Ok(response) if response.is_cacheable() => {
                tracing::debug!(url = %request.url, "fresh document from network");
                if self.policy.navigation_store == NavigationStore::Fallback {
                    self.store_runtime(request, &response).await;
                }
                return FetchOutcome::respond(response, ResponseSource::Network);
            }
            Ok(response) => {
                tracing::warn!(url = %request.url, status = response.status, "document fetch not usable, falling back");
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "document fetch failed, falling back");
            }
        }

        if let Some(cached) = self.lookup(request).await {
            return FetchOutcome::respond(cached, ResponseSource::Cache);
        }

        match CacheRequest::for_path(&self.policy.origin, &self.policy.default_document) {
            Ok(default_request) => {
                if let Some(cached) = self.lookup(&default_request).await {
                    return FetchOutcome::respond(cached, ResponseSource::DefaultDocument);
                }
            }
            Err(e) => tracing::warn!(error = %e, "default document path is not resolvable"),
        }

        FetchOutcome::respond(offline::offline_page(), ResponseSource::Offline)
    }

    async fn cache_first(&self, request: &CacheRequest) -> FetchOutcome {
        if let Some(cached) = self.lookup(request).await {
            tracing::debug!(url = %request.url, "serving cached asset");
            self.spawn_refresh(request.clone(), cached.body.clone());
            return FetchOutcome::respond(cached, ResponseSource::Cache);
        }

        match self.network.fetch(request, CacheDirective::Default).await {
            Ok(response) => {
                if response.status == 200 {
                    self.store_runtime(request, &response).await;
                }
                FetchOutcome::respond(response, ResponseSource::Network)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "asset not available offline");
                FetchOutcome::respond(offline::asset_unavailable(), ResponseSource::Offline)
            }
        }
    }

    /// Runtime bucket first (it holds refreshed copies), then every bucket.
    async fn lookup(&self, request: &CacheRequest) -> Option<ResponseSnapshot> {
        let runtime = self.policy.runtime_generation.bucket_name();
        let found = match self.storage.match_in(&runtime, request).await {
            Ok(Some(hit)) => Ok(Some(hit)),
            Ok(None) => self.storage.match_any(request).await,
            Err(e) => Err(e),
        };
        found.unwrap_or_else(|e| {
            tracing::warn!(url = %request.url, error = %e, "cache lookup failed, treating as miss");
            None
        })
    }

    async fn store_runtime(&self, request: &CacheRequest, response: &ResponseSnapshot) {
        if let Err(e) = store(self.storage.as_ref(), &self.policy.runtime_generation, request, response).await {
            tracing::warn!(url = %request.url, error = %e, "cache write skipped");
        }
    }

    /// Re-fetch a served asset without delaying the response already returned.
    fn spawn_refresh(&self, request: CacheRequest, served: Bytes) {
        let storage = Arc::clone(&self.storage);
        let network = Arc::clone(&self.network);
        let clients = Arc::clone(&self.clients);
        let generation = self.policy.runtime_generation.clone();

        self.track(async move {
            let fresh = match network.fetch(&request, CacheDirective::Default).await {
                Ok(fresh) if fresh.status == 200 => fresh,
                Ok(other) => {
                    tracing::debug!(url = %request.url, status = other.status, "background refresh ignored");
                    return;
                }
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "background refresh failed");
                    return;
                }
            };

            if let Err(e) = store(storage.as_ref(), &generation, &request, &fresh).await {
                tracing::warn!(url = %request.url, error = %e, "background refresh not stored");
                return;
            }

            if fresh.body != served {
                let message = OutboundMessage::ContentUpdated { url: Some(request.url.to_string()) };
                if let Err(e) = clients.broadcast(&message).await {
                    tracing::warn!(error = %e, "failed to announce updated content");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{Harness, html, png};
    use railbook_core::{AppConfig, RequestMode};

    #[tokio::test]
    async fn test_inactive_passes_through() {
        let harness = Harness::with_assets(&[]).await;
        let outcome = harness.engine.handle_fetch(&harness.request("/a.png")).await;
        assert_eq!(outcome, FetchOutcome::PassThrough(SkipReason::Inactive));
        assert!(harness.network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cross_origin_untouched() {
        let harness = Harness::active(&[]).await;
        let request = CacheRequest::parse("https://fonts.other.example/font.woff2").unwrap();

        let outcome = harness.engine.handle_fetch(&request).await;
        assert_eq!(outcome, FetchOutcome::PassThrough(SkipReason::CrossOrigin));
        assert!(harness.network.calls().is_empty());
        assert!(harness.storage.keys(&harness.runtime_bucket()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_get_untouched() {
        let harness = Harness::active(&[]).await;
        let request = harness.request("/feedback").with_method("POST");
        let outcome = harness.engine.handle_fetch(&request).await;
        assert_eq!(outcome, FetchOutcome::PassThrough(SkipReason::NonGet));
        assert!(harness.network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_api_is_network_only() {
        let harness = Harness::active(&[]).await;
        harness.network.respond("/api/papers", ResponseSnapshot::new(200, r#"[{"id":1}]"#));

        let outcome = harness.engine.handle_fetch(&harness.request("/api/papers")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(harness.network.directives_for("/api/papers"), vec![CacheDirective::NoStore]);
        assert_eq!(harness.storage.entry_count(&harness.runtime_bucket()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_api_offline() {
        let harness = Harness::active(&[]).await;
        let outcome = harness.engine.handle_fetch(&harness.request("/api/papers")).await;
        assert_eq!(outcome.response().unwrap().status, 503);
        assert_eq!(outcome.source(), Some(ResponseSource::Offline));
    }

    #[tokio::test]
    async fn test_navigation_fresh_and_stored() {
        let harness = Harness::active(&[]).await;
        harness.network.respond("/pdfs.html", html("<h1>papers</h1>"));

        let outcome = harness.engine.handle_fetch(&harness.request("/pdfs.html")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(harness.network.directives_for("/pdfs.html"), vec![CacheDirective::Bypass]);

        let stored = harness.storage.match_in(&harness.runtime_bucket(), &harness.request("/pdfs.html")).await.unwrap();
        assert_eq!(stored.unwrap().body, Bytes::from_static(b"<h1>papers</h1>"));
    }

    #[tokio::test]
    async fn test_navigation_never_store() {
        let config = AppConfig { navigation_store: NavigationStore::Never, ..Harness::config(&[]) };
        let harness = Harness::active_with(config).await;
        harness.network.respond("/", html("<h1>home</h1>"));

        let outcome = harness.engine.handle_fetch(&harness.request("/")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(harness.storage.entry_count(&harness.runtime_bucket()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_navigation_offline_uses_exact_entry() {
        let harness = Harness::active(&[]).await;
        harness.network.respond("/pdfs.html", html("cached papers"));
        harness.engine.handle_fetch(&harness.request("/pdfs.html")).await;
        harness.network.fail("/pdfs.html");

        let outcome = harness.engine.handle_fetch(&harness.request("/pdfs.html")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap().body, Bytes::from_static(b"cached papers"));
    }

    #[tokio::test]
    async fn test_navigation_offline_uses_default_document() {
        let harness = Harness::active(&[]).await;
        let index = html("<h1>index</h1>");
        harness.storage.put(&harness.static_bucket(), &harness.request("/index.html"), &index).await.unwrap();

        let request = harness.request("/syllabus").with_mode(RequestMode::Navigate);
        let outcome = harness.engine.handle_fetch(&request).await;
        assert_eq!(outcome.source(), Some(ResponseSource::DefaultDocument));
        assert_eq!(outcome.response().unwrap(), &index);
    }

    #[tokio::test]
    async fn test_navigation_server_error_falls_back_to_offline_page() {
        let harness = Harness::active(&[]).await;
        harness.network.respond("/index.html", ResponseSnapshot::new(500, "boom"));

        let outcome = harness.engine.handle_fetch(&harness.request("/index.html")).await;
        let response = outcome.response().unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Offline));
        assert_eq!(response.status, 503);
        assert!(!response.body.is_empty());
        assert!(response.content_type().unwrap().starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_navigation_server_error_prefers_cache() {
        let harness = Harness::active(&[]).await;
        let cached = html("<h1>yesterday</h1>");
        harness.storage.put(&harness.static_bucket(), &harness.request("/index.html"), &cached).await.unwrap();
        harness.network.respond("/index.html", ResponseSnapshot::new(500, "boom"));

        let outcome = harness.engine.handle_fetch(&harness.request("/index.html")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap(), &cached);
    }

    #[tokio::test]
    async fn test_asset_hit_returns_cached_and_refreshes() {
        let harness = Harness::active(&["/a.png"]).await;
        // Installed copy is "old"; the network now serves "new".
        harness.network.respond("/a.png", png(b"new"));
        let installed = harness.storage.match_in(&harness.static_bucket(), &harness.request("/a.png")).await.unwrap();
        assert!(installed.is_none());

        harness.storage.put(&harness.static_bucket(), &harness.request("/a.png"), &png(b"old")).await.unwrap();

        let outcome = harness.engine.handle_fetch(&harness.request("/a.png")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap(), &png(b"old"));

        harness.engine.settle().await;
        // One call during install, one for the background refresh.
        assert_eq!(harness.network.calls_for("/a.png"), 2);
        assert_eq!(outcome.response().unwrap().body, Bytes::from_static(b"old"));

        let refreshed = harness.storage.match_in(&harness.runtime_bucket(), &harness.request("/a.png")).await.unwrap();
        assert_eq!(refreshed.unwrap().body, Bytes::from_static(b"new"));
        assert_eq!(
            harness.host.messages(),
            vec![OutboundMessage::ContentUpdated { url: Some("https://railbook.example/a.png".into()) }]
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_is_ignored() {
        let harness = Harness::active(&[]).await;
        harness.storage.put(&harness.static_bucket(), &harness.request("/logo.png"), &png(b"logo")).await.unwrap();

        let outcome = harness.engine.handle_fetch(&harness.request("/logo.png")).await;
        harness.engine.settle().await;

        assert_eq!(outcome.response().unwrap(), &png(b"logo"));
        assert_eq!(harness.network.calls_for("/logo.png"), 1);
        assert!(harness.host.messages().is_empty());
        assert_eq!(harness.storage.entry_count(&harness.runtime_bucket()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unchanged_refresh_is_silent() {
        let harness = Harness::active(&[]).await;
        harness.storage.put(&harness.static_bucket(), &harness.request("/logo.png"), &png(b"same")).await.unwrap();
        harness.network.respond("/logo.png", png(b"same"));

        harness.engine.handle_fetch(&harness.request("/logo.png")).await;
        harness.engine.settle().await;
        assert!(harness.host.messages().is_empty());
    }

    #[tokio::test]
    async fn test_asset_miss_fetches_and_stores() {
        let harness = Harness::active(&[]).await;
        harness.network.respond("/icons/icon-96x96.png", png(b"icon"));

        let outcome = harness.engine.handle_fetch(&harness.request("/icons/icon-96x96.png")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Network));

        let stored =
            harness.storage.match_in(&harness.runtime_bucket(), &harness.request("/icons/icon-96x96.png")).await.unwrap();
        assert_eq!(stored.as_ref(), outcome.response());
    }

    #[tokio::test]
    async fn test_asset_miss_non_ok_not_stored() {
        let harness = Harness::active(&[]).await;
        harness.network.respond("/gone.png", ResponseSnapshot::new(404, "not found"));

        let outcome = harness.engine.handle_fetch(&harness.request("/gone.png")).await;
        assert_eq!(outcome.response().unwrap().status, 404);
        assert_eq!(harness.storage.entry_count(&harness.runtime_bucket()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_asset_offline_placeholder() {
        let harness = Harness::active(&[]).await;
        let outcome = harness.engine.handle_fetch(&harness.request("/missing.png")).await;
        let response = outcome.response().unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(&response.body[..], b"Asset not available offline");
    }

    #[tokio::test]
    async fn test_runtime_copy_wins_over_static() {
        let harness = Harness::active(&[]).await;
        harness.storage.put(&harness.static_bucket(), &harness.request("/a.png"), &png(b"installed")).await.unwrap();
        harness.storage.open(&harness.engine.policy().runtime_generation).await.unwrap();
        harness.storage.put(&harness.runtime_bucket(), &harness.request("/a.png"), &png(b"refreshed")).await.unwrap();

        let outcome = harness.engine.handle_fetch(&harness.request("/a.png")).await;
        assert_eq!(outcome.response().unwrap().body, Bytes::from_static(b"refreshed"));
        harness.engine.settle().await;
    }

    async fn active_with_failing_writes() -> Harness {
        let harness = Harness::with_failing_writes(Harness::config(&[])).await;
        harness.engine.install().await.unwrap();
        harness.engine.activate().await.unwrap();
        harness.host.clear();
        harness
    }

    #[tokio::test]
    async fn test_asset_miss_served_when_write_fails() {
        let harness = active_with_failing_writes().await;
        harness.network.respond("/icons/icon-96x96.png", png(b"icon"));

        let outcome = harness.engine.handle_fetch(&harness.request("/icons/icon-96x96.png")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(outcome.response().unwrap(), &png(b"icon"));
        assert_eq!(harness.storage.entry_count(&harness.runtime_bucket()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_navigation_served_when_write_fails() {
        let harness = active_with_failing_writes().await;
        assert_eq!(harness.engine.policy().navigation_store, NavigationStore::Fallback);
        harness.network.respond("/pdfs.html", html("<h1>papers</h1>"));

        let outcome = harness.engine.handle_fetch(&harness.request("/pdfs.html")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(outcome.response().unwrap(), &html("<h1>papers</h1>"));
        assert_eq!(harness.storage.entry_count(&harness.runtime_bucket()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_write_failure_keeps_cached_copy() {
        let harness = active_with_failing_writes().await;
        harness.storage.put(&harness.static_bucket(), &harness.request("/a.png"), &png(b"old")).await.unwrap();
        harness.network.respond("/a.png", png(b"new"));

        let outcome = harness.engine.handle_fetch(&harness.request("/a.png")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap(), &png(b"old"));

        harness.engine.settle().await;
        assert_eq!(harness.network.calls_for("/a.png"), 1);
        // Nothing was stored, so pages are not told about new content.
        assert!(harness.host.messages().is_empty());
        let stored = harness.storage.match_in(&harness.static_bucket(), &harness.request("/a.png")).await.unwrap();
        assert_eq!(stored.unwrap().body, Bytes::from_static(b"old"));
    }
}
