//! Host side of the worker: what the engine asks of pages and the registration.
//!
//! There is no browser behind this binary. Everything the engine would hand
//! to a page is queued here and drained by the `clients_poll` tool.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use url::Url;

use railbook_client::worker::{Clients, HostError, Notification, OutboundMessage, Registration};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Message { message: OutboundMessage },
    Notification { notification: Notification },
    OpenWindow { url: String },
    FocusWindow { url: String },
    UpdateRequested,
}

#[derive(Debug, Clone, Serialize)]
pub struct Delivered {
    pub at: String,
    #[serde(flatten)]
    pub event: HostEvent,
}

/// Events kept between polls before the oldest are dropped.
pub const MAX_QUEUED_EVENTS: usize = 256;

/// Windows remembered for focus lookups.
const MAX_OPEN_WINDOWS: usize = 16;

/// Queue of host events plus the windows the worker has opened.
///
/// The connected MCP peer counts as the single controlled page. A peer
/// that never polls loses the oldest events once `capacity` is reached.
#[derive(Debug)]
pub struct Outbox {
    origin: Url,
    capacity: usize,
    events: Mutex<VecDeque<Delivered>>,
    windows: Mutex<VecDeque<Url>>,
}

impl Outbox {
    pub fn new(origin: Url) -> Self {
        Self::with_capacity(origin, MAX_QUEUED_EVENTS)
    }

    pub fn with_capacity(origin: Url, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { origin, capacity, events: Mutex::new(VecDeque::new()), windows: Mutex::new(VecDeque::new()) }
    }

    fn push(&self, event: HostEvent) {
        let delivered = Delivered { at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true), event };
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() >= self.capacity
            && let Some(dropped) = events.pop_front()
        {
            tracing::warn!(capacity = self.capacity, dropped_at = %dropped.at, "outbox full, oldest event dropped");
        }
        events.push_back(delivered);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<Delivered> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).drain(..).collect()
    }
}

#[async_trait]
impl Clients for Outbox {
    async fn claim(&self) -> Result<usize, HostError> {
        Ok(1)
    }

    async fn broadcast(&self, message: &OutboundMessage) -> Result<usize, HostError> {
        self.push(HostEvent::Message { message: message.clone() });
        Ok(1)
    }

    async fn open_window(&self, url: &Url) -> Result<(), HostError> {
        if url.origin() != self.origin.origin() {
            return Err(HostError::Rejected(format!("{url} is outside {}", self.origin)));
        }
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        if windows.len() >= MAX_OPEN_WINDOWS {
            windows.pop_front();
        }
        windows.push_back(url.clone());
        drop(windows);
        self.push(HostEvent::OpenWindow { url: url.to_string() });
        Ok(())
    }

    async fn focus_existing(&self, origin: &Url) -> Result<bool, HostError> {
        let found = self
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|w| w.origin() == origin.origin())
            .cloned();

        match found {
            Some(url) => {
                self.push(HostEvent::FocusWindow { url: url.to_string() });
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Registration for Outbox {
    async fn update(&self) -> Result<(), HostError> {
        self.push(HostEvent::UpdateRequested);
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), HostError> {
        self.push(HostEvent::Notification { notification: notification.clone() });
        Ok(())
    }
}
