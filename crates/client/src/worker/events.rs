//! Message, push, notification-click, and sync handlers.

use serde::Serialize;

use railbook_core::{CacheRequest, Error, RequestClass};

use super::CachePolicyEngine;
use super::lifecycle::{ActivationReport, InstallReport, LifecycleState};
use super::maintenance::{PurgeReport, PurgeTarget};
use super::messages::{InboundMessage, OutboundMessage};
use super::push::{ClickOutcome, Notification, shape_notification};
use super::strategy::store;
use crate::fetch::CacheDirective;

const SYNC_QUESTIONS: &str = "sync-questions";
const CHECK_UPDATES: &str = "check-updates";

/// What handling an inbound message did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MessageReply {
    /// Skip-waiting recorded; `activation` is set when it triggered activation.
    SkipWaiting { activation: Option<ActivationReport> },
    Cleared(PurgeReport),
    Populated(InstallReport),
    UpdateRequested,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncOutcome {
    QuestionsSynced { refreshed: usize },
    UpdateChecked,
    Ignored { tag: String },
}

impl CachePolicyEngine {
    pub async fn handle_message(&self, message: InboundMessage) -> Result<MessageReply, Error> {
        tracing::debug!(?message, "message received");
        match message {
            InboundMessage::SkipWaiting => {
                self.skip_waiting();
                let activation =
                    if self.state().await == LifecycleState::Installed { Some(self.activate().await?) } else { None };
                Ok(MessageReply::SkipWaiting { activation })
            }
            InboundMessage::ClearCache => Ok(MessageReply::Cleared(self.purge(PurgeTarget::All).await?)),
            InboundMessage::CacheUrls { urls } => {
                let paths = if urls.is_empty() { self.policy.static_assets.clone() } else { urls };
                let report = self.populate(&self.policy.static_generation, &paths).await?;
                if let Err(e) = self.clients.broadcast(&OutboundMessage::ContentUpdated { url: None }).await {
                    tracing::warn!(error = %e, "failed to announce repopulated cache");
                }
                Ok(MessageReply::Populated(report))
            }
            InboundMessage::CheckUpdate => {
                match self.registration.update().await {
                    Ok(()) => tracing::info!("update check completed"),
                    Err(e) => tracing::warn!(error = %e, "update check failed"),
                }
                Ok(MessageReply::UpdateRequested)
            }
        }
    }

    /// Show a notification for a push payload. Malformed payloads become the body text.
    pub async fn handle_push(&self, payload: Option<&[u8]>) -> Result<Notification, Error> {
        let notification = shape_notification(&self.policy.notification, payload);
        self.registration.show_notification(&notification).await?;
        Ok(notification)
    }

    /// Route a notification click: "view" opens the papers page, "dismiss"
    /// does nothing, anything else focuses an open page or opens the root.
    pub async fn handle_notification_click(&self, action: Option<&str>) -> Result<ClickOutcome, Error> {
        match action {
            Some("dismiss") => Ok(ClickOutcome::Dismissed),
            Some("view") => {
                let url = CacheRequest::for_path(&self.policy.origin, &self.policy.notification_view_url)?.url;
                self.clients.open_window(&url).await?;
                Ok(ClickOutcome::OpenedWindow { url: url.to_string() })
            }
            _ => {
                if self.clients.focus_existing(&self.policy.origin).await? {
                    return Ok(ClickOutcome::FocusedExisting);
                }
                let url = CacheRequest::for_path(&self.policy.origin, "/")?.url;
                self.clients.open_window(&url).await?;
                Ok(ClickOutcome::OpenedWindow { url: url.to_string() })
            }
        }
    }

    /// Handle a one-off or periodic background sync.
    pub async fn handle_sync(&self, tag: &str, periodic: bool) -> Result<SyncOutcome, Error> {
        tracing::info!(tag, periodic, "background sync triggered");
        match tag {
            SYNC_QUESTIONS => Ok(SyncOutcome::QuestionsSynced { refreshed: self.refresh_runtime().await? }),
            CHECK_UPDATES => {
                self.registration.update().await?;
                Ok(SyncOutcome::UpdateChecked)
            }
            _ => {
                tracing::debug!(tag, "unhandled sync tag");
                Ok(SyncOutcome::Ignored { tag: tag.to_string() })
            }
        }
    }

    /// Re-fetch every GET entry in the runtime bucket and store fresh copies.
    async fn refresh_runtime(&self) -> Result<usize, Error> {
        let bucket = self.policy.runtime_generation.bucket_name();
        let keys = self.storage.keys(&bucket).await?;

        let mut refreshed = 0;
        for key in keys.into_iter().filter(|k| k.method == "GET") {
            let request = match CacheRequest::parse(&key.url) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(url = %key.url, error = %e, "stored url not parseable");
                    continue;
                }
            };
            let directive = self.refresh_directive(&bucket, &request).await;
            match self.network.fetch(&request, directive).await {
                Ok(fresh) if fresh.status == 200 => {
                    match store(self.storage.as_ref(), &self.policy.runtime_generation, &request, &fresh).await {
                        Ok(()) => refreshed += 1,
                        Err(e) => tracing::warn!(url = %key.url, error = %e, "sync write skipped"),
                    }
                }
                Ok(other) => tracing::debug!(url = %key.url, status = other.status, "sync kept stored copy"),
                Err(e) => tracing::debug!(url = %key.url, error = %e, "sync fetch failed"),
            }
        }
        Ok(refreshed)
    }

    /// Stored documents are re-fetched the way the navigation path fetches them.
    async fn refresh_directive(&self, bucket: &str, request: &CacheRequest) -> CacheDirective {
        if self.classifier.classify(request) == RequestClass::Navigation {
            return CacheDirective::Bypass;
        }
        let stored_html = matches!(
            self.storage.match_in(bucket, request).await,
            Ok(Some(stored)) if stored.content_type().is_some_and(|ct| ct.contains("text/html"))
        );
        if stored_html { CacheDirective::Bypass } else { CacheDirective::Default }
    }
}
