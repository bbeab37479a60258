//! Network collaborator for the policy engine.
//!
//! ### Cache directives
//! - `Default`: plain fetch, used for static assets and install population
//! - `NoStore`: `Cache-Control: no-store`, used for data-backend calls
//! - `Bypass`: `Cache-Control: no-cache, no-store, must-revalidate` plus
//!   `Pragma: no-cache`, used for network-first navigation
//!
//! ### Limits
//! - Max body bytes: 5MB (configurable)
//! - Max redirects: 5

pub mod error;
pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub use error::NetworkError;
pub use url::{UrlError, canonicalize};

use railbook_core::{CacheRequest, ResponseSnapshot};

/// How the network request should treat intermediate HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheDirective {
    #[default]
    Default,
    NoStore,
    Bypass,
}

impl CacheDirective {
    /// Headers added to the outgoing request for this directive.
    pub fn headers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            CacheDirective::Default => &[],
            CacheDirective::NoStore => &[("cache-control", "no-store")],
            CacheDirective::Bypass => &[("cache-control", "no-cache, no-store, must-revalidate"), ("pragma", "no-cache")],
        }
    }
}

/// Issues HTTP requests on behalf of the policy engine.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch a request. Returns any response the server produced, including
    /// non-2xx ones; errors only when no response was received.
    async fn fetch(&self, request: &CacheRequest, directive: CacheDirective) -> Result<ResponseSnapshot, NetworkError>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "railbook-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "railbook-sw/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// `reqwest`-backed network.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, NetworkError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(NetworkError::from)?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn check_size(&self, len: usize) -> Result<(), NetworkError> {
        if len > self.config.max_bytes {
            return Err(NetworkError::TooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }
        Ok(())
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &CacheRequest, directive: CacheDirective) -> Result<ResponseSnapshot, NetworkError> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| NetworkError::Invalid(format!("method {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for (name, value) in directive.headers() {
            builder = builder.header(*name, *value);
        }

        let response = builder.send().await?;
        let status = response.status();

        if let Some(len) = response.content_length() {
            self.check_size(len as usize)?;
        }

        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await?;
        self.check_size(body.len())?;

        tracing::debug!(
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            content_type = headers.get(header::CONTENT_TYPE.as_str()).map(String::as_str).unwrap_or(""),
            "network fetch complete"
        );

        let mut snapshot = ResponseSnapshot::new(status.as_u16(), body);
        snapshot.status_text = status.canonical_reason().unwrap_or("").to_string();
        snapshot.headers = headers;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "railbook-sw/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_directive_headers() {
        assert!(CacheDirective::Default.headers().is_empty());
        assert_eq!(CacheDirective::NoStore.headers(), &[("cache-control", "no-store")]);

        let bypass = CacheDirective::Bypass.headers();
        assert!(bypass.contains(&("pragma", "no-cache")));
        assert!(bypass.iter().any(|(name, value)| *name == "cache-control" && value.contains("must-revalidate")));
    }

    #[tokio::test]
    async fn test_http_network_new() {
        let network = HttpNetwork::new(FetchConfig::default());
        assert!(network.is_ok());
    }

    #[test]
    fn test_size_limit() {
        let network = HttpNetwork::new(FetchConfig { max_bytes: 10, ..Default::default() }).unwrap();
        assert!(network.check_size(10).is_ok());
        assert!(matches!(network.check_size(11), Err(NetworkError::TooLarge(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_offline() {
        let network = HttpNetwork::new(FetchConfig { timeout: Duration::from_secs(2), ..Default::default() }).unwrap();
        // Port 9 (discard) on loopback is closed on test hosts.
        let request = CacheRequest::parse("http://127.0.0.1:9/index.html").unwrap();
        let result = network.fetch(&request, CacheDirective::Bypass).await;
        assert!(matches!(
            result,
            Err(NetworkError::Offline(_)) | Err(NetworkError::Timeout(_)) | Err(NetworkError::Request(_))
        ));
    }
}
