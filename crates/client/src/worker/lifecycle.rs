//! Install and activate.

use futures_util::future::join_all;
use serde::Serialize;

use railbook_core::{CacheRequest, Error, GenerationId};

use super::CachePolicyEngine;
use super::messages::OutboundMessage;
use crate::fetch::CacheDirective;

/// Lifecycle of one worker instance.
///
/// `Redundant` is terminal: a newer instance has taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
    Redundant,
}

/// One asset that could not be cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of populating a bucket from an asset list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub bucket: String,
    pub cached: Vec<String>,
    pub failed: Vec<AssetFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub version: String,
    pub deleted: Vec<String>,
    pub claimed: usize,
    pub notified: usize,
}

impl CachePolicyEngine {
    async fn transition(&self, event: &str, from: &[LifecycleState], to: LifecycleState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(Error::InvalidState(format!("{event} not allowed while {:?}", *state)));
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: LifecycleState) {
        *self.state.write().await = to;
    }

    /// Open the current static bucket and cache every configured asset.
    ///
    /// Individual asset failures are reported, not propagated. Only failing
    /// to open the bucket fails the install. On success the instance asks to
    /// skip waiting so it replaces any older instance immediately.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition("install", &[LifecycleState::Uninstalled, LifecycleState::Installed], LifecycleState::Installing)
            .await?;
        tracing::info!(version = self.policy.version(), "installing");

        let generation = self.policy.static_generation.clone();
        let assets = self.policy.static_assets.clone();
        match self.populate(&generation, &assets).await {
            Ok(report) => {
                self.set_state(LifecycleState::Installed).await;
                self.skip_waiting();
                tracing::info!(
                    bucket = %report.bucket,
                    cached = report.cached.len(),
                    failed = report.failed.len(),
                    "install complete, skipping waiting"
                );
                Ok(report)
            }
            Err(e) => {
                self.set_state(LifecycleState::Uninstalled).await;
                tracing::error!(error = %e, "install failed");
                Err(e)
            }
        }
    }

    /// Fetch and store each path into the bucket for `generation`, best effort.
    pub(crate) async fn populate(&self, generation: &GenerationId, paths: &[String]) -> Result<InstallReport, Error> {
        let bucket = self.storage.open(generation).await?;

        let results = join_all(paths.iter().map(|path| self.cache_asset(&bucket.name, path))).await;

        let mut cached = Vec::new();
        let mut failed = Vec::new();
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(()) => cached.push(path.clone()),
                Err(reason) => {
                    tracing::warn!(path = %path, reason = %reason, "failed to cache asset");
                    failed.push(AssetFailure { path: path.clone(), reason });
                }
            }
        }

        Ok(InstallReport { bucket: bucket.name, cached, failed })
    }

    /// Only root-relative paths on the worker's own origin are fetched.
    async fn cache_asset(&self, bucket: &str, path: &str) -> Result<(), String> {
        if !path.starts_with('/') {
            return Err(format!("not a root-relative path: {path}"));
        }
        let request = CacheRequest::for_path(&self.policy.origin, path).map_err(|e| e.to_string())?;
        if request.url.origin() != self.policy.origin.origin() {
            return Err(format!("outside origin {}", self.policy.origin));
        }
        let response = self
            .network
            .fetch(&request, CacheDirective::Default)
            .await
            .map_err(|e| e.to_string())?;
        if !(200..300).contains(&response.status) {
            return Err(format!("status {}", response.status));
        }
        self.storage.put(bucket, &request, &response).await.map_err(|e| e.to_string())
    }

    /// Purge stale generations, claim open pages, and announce the version.
    ///
    /// Buckets of other applications are left alone; see [`super::PolicyConfig::is_stale`].
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.transition("activate", &[LifecycleState::Installed], LifecycleState::Activating).await?;
        tracing::info!(version = self.policy.version(), "activating");

        let mut deleted = Vec::new();
        match self.storage.buckets().await {
            Ok(buckets) => {
                for bucket in buckets.into_iter().filter(|b| self.policy.is_stale(&b.generation)) {
                    match self.storage.delete_bucket(&bucket.name).await {
                        Ok(_) => {
                            tracing::info!(bucket = %bucket.name, "deleted stale cache");
                            deleted.push(bucket.name);
                        }
                        Err(e) => tracing::warn!(bucket = %bucket.name, error = %e, "failed to delete stale cache"),
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not list caches; skipping purge"),
        }

        let claimed = self.clients.claim().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to claim clients");
            0
        });

        let message = OutboundMessage::Activated { version: self.policy.version().to_string() };
        let notified = self.clients.broadcast(&message).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to notify clients of activation");
            0
        });

        self.set_state(LifecycleState::Active).await;
        tracing::info!(deleted = deleted.len(), claimed, notified, "activated");

        Ok(ActivationReport { version: self.policy.version().to_string(), deleted, claimed, notified })
    }

    /// Mark this instance as superseded by a newer one.
    pub async fn retire(&self) {
        self.settle().await;
        self.set_state(LifecycleState::Redundant).await;
        tracing::info!(version = self.policy.version(), "worker superseded");
    }
}
