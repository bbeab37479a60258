//! Push payload shaping and notification click routing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use railbook_core::config::NotificationDefaults;

/// One action button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// Notification passed to the host for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    #[serde(default)]
    pub require_interaction: bool,
    #[serde(default)]
    pub actions: Vec<NotificationAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Notification {
    pub fn from_defaults(defaults: &NotificationDefaults) -> Self {
        Self {
            title: defaults.title.clone(),
            body: defaults.body.clone(),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            tag: defaults.tag.clone(),
            require_interaction: false,
            actions: vec![
                NotificationAction { action: "view".into(), title: "View Now".into() },
                NotificationAction { action: "dismiss".into(), title: "Dismiss".into() },
            ],
            data: None,
        }
    }
}

/// Build the notification for a push payload.
///
/// A JSON object overrides the default fields it names. Any other payload
/// (invalid JSON, a bare JSON string, fields of the wrong type) becomes the
/// body text.
pub fn shape_notification(defaults: &NotificationDefaults, payload: Option<&[u8]>) -> Notification {
    let base = Notification::from_defaults(defaults);
    let Some(payload) = payload else {
        return base;
    };

    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(overrides)) => {
            let mut merged = match serde_json::to_value(&base) {
                Ok(Value::Object(map)) => map,
                _ => return base,
            };
            merged.extend(overrides);
            match serde_json::from_value::<Notification>(Value::Object(merged)) {
                Ok(notification) => notification,
                Err(e) => {
                    tracing::warn!(error = %e, "push payload fields have unexpected types; using as text");
                    with_text_body(base, payload)
                }
            }
        }
        Ok(Value::String(text)) => Notification { body: text, ..base },
        _ => with_text_body(base, payload),
    }
}

fn with_text_body(base: Notification, payload: &[u8]) -> Notification {
    Notification { body: String::from_utf8_lossy(payload).into_owned(), ..base }
}

/// What a notification click resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    OpenedWindow { url: String },
    FocusedExisting,
    Dismissed,
}
