//! Per-request classification.
//!
//! Classification is stateless and recomputed on every intercepted request.

use serde::Serialize;
use url::Url;

use crate::request::{CacheRequest, RequestMode};

/// Why the engine declines to intercept a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    CrossOrigin,
    UnsupportedScheme,
    NonGet,
    /// The worker is not active yet. Set by the engine, never by [`Classifier`].
    Inactive,
}

/// Derived tag deciding which strategy handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Left to default browser handling.
    PassThrough(SkipReason),
    /// Data-backend call: network only, never read or written to cache.
    ExternalApi,
    /// Full page or HTML document.
    Navigation,
    StaticAsset,
}

/// Classifies requests relative to the controlled origin.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    api_path_prefixes: Vec<String>,
}

impl Classifier {
    pub fn new(origin: Url, api_path_prefixes: Vec<String>) -> Self {
        Self { origin, api_path_prefixes }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn classify(&self, request: &CacheRequest) -> RequestClass {
        let url = &request.url;

        if !matches!(url.scheme(), "http" | "https") {
            return RequestClass::PassThrough(SkipReason::UnsupportedScheme);
        }
        if url.origin() != self.origin.origin() {
            return RequestClass::PassThrough(SkipReason::CrossOrigin);
        }
        if !request.is_get() {
            return RequestClass::PassThrough(SkipReason::NonGet);
        }

        let path = url.path();
        if self.api_path_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return RequestClass::ExternalApi;
        }

        if is_navigation(request) { RequestClass::Navigation } else { RequestClass::StaticAsset }
    }
}

fn is_navigation(request: &CacheRequest) -> bool {
    if request.mode == RequestMode::Navigate {
        return true;
    }
    if request.header("accept").is_some_and(|accept| accept.contains("text/html")) {
        return true;
    }
    let path = request.url.path();
    path.ends_with(".html") || path.ends_with('/')
}
