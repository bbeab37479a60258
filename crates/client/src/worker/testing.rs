//! In-process fakes for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use railbook_core::{AppConfig, BucketInfo, CacheDb, CacheRequest, CacheStorage, Error, GenerationId, ResponseSnapshot, StoredKey};

use super::host::{Clients, HostError, Registration};
use super::messages::OutboundMessage;
use super::push::Notification;
use super::{CachePolicyEngine, Collaborators, PolicyConfig};
use crate::fetch::{CacheDirective, Network, NetworkError};

pub(crate) const ORIGIN: &str = "https://railbook.example";

pub(crate) fn png(bytes: &[u8]) -> ResponseSnapshot {
    ResponseSnapshot::new(200, Bytes::copy_from_slice(bytes)).with_header("content-type", "image/png")
}

pub(crate) fn html(body: &str) -> ResponseSnapshot {
    ResponseSnapshot::new(200, body.to_string()).with_header("content-type", "text/html")
}

#[derive(Clone)]
enum Route {
    Respond(ResponseSnapshot),
    Fail,
}

/// Network keyed by URL path. Unrouted paths behave as offline.
#[derive(Default)]
pub(crate) struct FakeNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<(String, CacheDirective)>>,
}

impl FakeNetwork {
    pub(crate) fn respond(&self, path: &str, response: ResponseSnapshot) {
        self.routes.lock().unwrap().insert(path.to_string(), Route::Respond(response));
    }

    pub(crate) fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Route::Fail);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(path, _)| path.clone()).collect()
    }

    pub(crate) fn calls_for(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(p, _)| p == path).count()
    }

    pub(crate) fn directives_for(&self, path: &str) -> Vec<CacheDirective> {
        self.calls.lock().unwrap().iter().filter(|(p, _)| p == path).map(|(_, d)| *d).collect()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &CacheRequest, directive: CacheDirective) -> Result<ResponseSnapshot, NetworkError> {
        let path = request.url.path().to_string();
        self.calls.lock().unwrap().push((path.clone(), directive));
        let route = self.routes.lock().unwrap().get(&path).cloned();
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Fail) | None => Err(NetworkError::Offline(format!("no route to {path}"))),
        }
    }
}

/// Storage whose writes always fail, as when quota is exhausted. Reads and
/// deletes go to the wrapped database.
pub(crate) struct FailingWrites {
    inner: CacheDb,
}

#[async_trait]
impl CacheStorage for FailingWrites {
    async fn open(&self, generation: &GenerationId) -> Result<BucketInfo, Error> {
        self.inner.open(generation).await
    }

    async fn buckets(&self) -> Result<Vec<BucketInfo>, Error> {
        self.inner.buckets().await
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete_bucket(name).await
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<StoredKey>, Error> {
        self.inner.keys(bucket).await
    }

    async fn match_in(&self, bucket: &str, request: &CacheRequest) -> Result<Option<ResponseSnapshot>, Error> {
        self.inner.match_in(bucket, request).await
    }

    async fn match_any(&self, request: &CacheRequest) -> Result<Option<ResponseSnapshot>, Error> {
        self.inner.match_any(request).await
    }

    async fn put(&self, _bucket: &str, _request: &CacheRequest, _response: &ResponseSnapshot) -> Result<(), Error> {
        Err(Error::InvalidInput("storage quota exceeded".into()))
    }

    async fn delete_entry(&self, bucket: &str, request_key: &str) -> Result<bool, Error> {
        self.inner.delete_entry(bucket, request_key).await
    }
}

/// Records everything the engine asks of pages and the registration.
#[derive(Default)]
pub(crate) struct FakeHost {
    messages: Mutex<Vec<OutboundMessage>>,
    notifications: Mutex<Vec<Notification>>,
    windows: Mutex<Vec<String>>,
    has_open_window: AtomicBool,
    unavailable: AtomicBool,
    updates: AtomicUsize,
}

impl FakeHost {
    pub(crate) fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub(crate) fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub(crate) fn windows(&self) -> Vec<String> {
        self.windows.lock().unwrap().clone()
    }

    pub(crate) fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub(crate) fn set_open_window(&self, open: bool) {
        self.has_open_window.store(open, Ordering::SeqCst);
    }

    /// Make every window, notification, and update call fail.
    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), HostError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(HostError::Unavailable("host went away".into()));
        }
        Ok(())
    }

    pub(crate) fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl Clients for FakeHost {
    async fn claim(&self) -> Result<usize, HostError> {
        Ok(1)
    }

    async fn broadcast(&self, message: &OutboundMessage) -> Result<usize, HostError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(1)
    }

    async fn open_window(&self, url: &Url) -> Result<(), HostError> {
        self.check_available()?;
        self.windows.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn focus_existing(&self, _origin: &Url) -> Result<bool, HostError> {
        self.check_available()?;
        Ok(self.has_open_window.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Registration for FakeHost {
    async fn update(&self) -> Result<(), HostError> {
        self.check_available()?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), HostError> {
        self.check_available()?;
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub(crate) struct Harness {
    pub(crate) engine: CachePolicyEngine,
    pub(crate) storage: Arc<CacheDb>,
    pub(crate) network: Arc<FakeNetwork>,
    pub(crate) host: Arc<FakeHost>,
}

impl Harness {
    pub(crate) async fn with_config(config: AppConfig) -> Self {
        let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
        Self::build(config, storage.clone(), storage)
    }

    /// The engine's writes fail; `storage` still writes, for seeding entries.
    pub(crate) async fn with_failing_writes(config: AppConfig) -> Self {
        let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let failing = Arc::new(FailingWrites { inner: (*storage).clone() });
        Self::build(config, failing, storage)
    }

    fn build(config: AppConfig, engine_storage: Arc<dyn CacheStorage>, storage: Arc<CacheDb>) -> Self {
        let network = Arc::new(FakeNetwork::default());
        let host = Arc::new(FakeHost::default());
        let policy = PolicyConfig::from_app(&config).unwrap();
        let engine = CachePolicyEngine::new(
            policy,
            Collaborators {
                storage: engine_storage,
                network: network.clone(),
                clients: host.clone(),
                registration: host.clone(),
            },
        );
        Self { engine, storage, network, host }
    }

    pub(crate) fn config(assets: &[&str]) -> AppConfig {
        AppConfig {
            origin: ORIGIN.into(),
            cache_version: "test-v1".into(),
            static_assets: assets.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) async fn with_assets(assets: &[&str]) -> Self {
        Self::with_config(Self::config(assets)).await
    }

    /// Installed and activated, with the activation message cleared.
    pub(crate) async fn active(assets: &[&str]) -> Self {
        Self::active_with(Self::config(assets)).await
    }

    pub(crate) async fn active_with(config: AppConfig) -> Self {
        let harness = Self::with_config(config).await;
        harness.engine.install().await.unwrap();
        harness.engine.activate().await.unwrap();
        harness.host.clear();
        harness
    }

    pub(crate) fn request(&self, path: &str) -> CacheRequest {
        CacheRequest::for_path(&Url::parse(ORIGIN).unwrap(), path).unwrap()
    }

    pub(crate) fn runtime_bucket(&self) -> String {
        self.engine.policy().runtime_generation.bucket_name()
    }

    pub(crate) fn static_bucket(&self) -> String {
        self.engine.policy().static_generation.bucket_name()
    }
}
