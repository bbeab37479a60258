//! Cache policy engine.
//!
//! One engine instance corresponds to one deployed worker version. It owns
//! the lifecycle state, the immutable [`PolicyConfig`], and handles to the
//! storage, network, and host collaborators. Every handler is an independent
//! async task; the only shared mutable resource is the storage itself.
//!
//! Work a handler starts but does not await (background refresh) is tracked
//! in a pending set. [`CachePolicyEngine::settle`] waits for it, which is the
//! host's keep-alive contract.

pub mod events;
pub mod host;
pub mod lifecycle;
pub mod maintenance;
pub mod messages;
pub mod offline;
pub mod policy;
pub mod push;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::RwLock;
use tokio::task::JoinSet;

use railbook_core::{CacheStorage, Classifier};

use crate::fetch::Network;

pub use events::{MessageReply, SyncOutcome};
pub use host::{Clients, HostError, Registration};
pub use lifecycle::{ActivationReport, AssetFailure, InstallReport, LifecycleState};
pub use maintenance::{PurgeReport, PurgeTarget, enforce_size_bound, spawn_size_sweep};
pub use messages::{InboundMessage, OutboundMessage};
pub use policy::PolicyConfig;
pub use push::{ClickOutcome, Notification, NotificationAction, shape_notification};
pub use strategy::{FetchOutcome, ResponseSource};

/// External collaborators the engine drives.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub clients: Arc<dyn Clients>,
    pub registration: Arc<dyn Registration>,
}

/// The offline caching policy for one worker version.
pub struct CachePolicyEngine {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
    registration: Arc<dyn Registration>,
    policy: PolicyConfig,
    classifier: Classifier,
    state: RwLock<LifecycleState>,
    skip_waiting: AtomicBool,
    pending: Mutex<JoinSet<()>>,
}

impl CachePolicyEngine {
    pub fn new(policy: PolicyConfig, collaborators: Collaborators) -> Self {
        let classifier = Classifier::new(policy.origin.clone(), policy.api_path_prefixes.clone());
        Self {
            storage: collaborators.storage,
            network: collaborators.network,
            clients: collaborators.clients,
            registration: collaborators.registration,
            policy,
            classifier,
            state: RwLock::new(LifecycleState::Uninstalled),
            skip_waiting: AtomicBool::new(false),
            pending: Mutex::new(JoinSet::new()),
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Request activation without waiting for older instances to release their pages.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Run `task` in the background and keep the worker alive until it settles.
    pub(crate) fn track<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        while pending.try_join_next().is_some() {}
        pending.spawn(task);
    }

    /// Wait for every tracked background task to finish.
    pub async fn settle(&self) {
        loop {
            let mut batch = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
            if batch.is_empty() {
                return;
            }
            while let Some(result) = batch.join_next().await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "background task did not complete");
                }
            }
        }
    }
}
