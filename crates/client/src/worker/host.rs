//! Host collaborators: connected pages and the worker registration.

use async_trait::async_trait;
use url::Url;

use railbook_core::Error;

use super::messages::OutboundMessage;
use super::push::Notification;

/// Errors reported by the host runtime.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    #[error("host unavailable: {0}")]
    Unavailable(String),

    #[error("host rejected request: {0}")]
    Rejected(String),
}

impl From<HostError> for Error {
    fn from(err: HostError) -> Self {
        Error::Host(err.to_string())
    }
}

/// Pages controlled by (or reachable from) the worker.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Take control of every open page without a reload. Returns how many were claimed.
    async fn claim(&self) -> Result<usize, HostError>;

    /// Post a message to every connected page. Returns how many received it.
    async fn broadcast(&self, message: &OutboundMessage) -> Result<usize, HostError>;

    async fn open_window(&self, url: &Url) -> Result<(), HostError>;

    /// Focus an open window on `origin`, if any. Returns whether one was focused.
    async fn focus_existing(&self, origin: &Url) -> Result<bool, HostError>;
}

/// The registration that owns this worker instance.
#[async_trait]
pub trait Registration: Send + Sync {
    /// Ask the host to check for a newer worker version.
    async fn update(&self) -> Result<(), HostError>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), HostError>;
}
