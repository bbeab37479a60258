//! Cross-context messages consumed and emitted by the worker.

use serde::{Deserialize, Serialize};

/// Messages pages send to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Activate immediately instead of waiting for old pages to close.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    /// Delete every cache bucket.
    #[serde(rename = "CLEAR_CACHE", alias = "clearCache")]
    ClearCache,
    /// Re-run install-style population. Empty `urls` means the configured asset list.
    #[serde(rename = "CACHE_URLS", alias = "fetchFresh")]
    CacheUrls {
        #[serde(default)]
        urls: Vec<String>,
    },
    /// Ask the host to look for a newer worker version.
    #[serde(rename = "CHECK_UPDATE")]
    CheckUpdate,
}

/// Messages the worker posts to pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "SW_ACTIVATED")]
    Activated { version: String },
    #[serde(rename = "CACHES_CLEARED")]
    CachesCleared,
    /// Stored content changed. `url` is set when a single resource was refreshed.
    #[serde(rename = "CONTENT_UPDATED")]
    ContentUpdated {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        url: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_wire_names() {
        let msg: InboundMessage = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
        assert_eq!(msg, InboundMessage::SkipWaiting);

        let msg: InboundMessage = serde_json::from_str(r#"{"type":"clearCache"}"#).unwrap();
        assert_eq!(msg, InboundMessage::ClearCache);

        let msg: InboundMessage = serde_json::from_str(r#"{"type":"CACHE_URLS","urls":["/a.png"]}"#).unwrap();
        assert_eq!(msg, InboundMessage::CacheUrls { urls: vec!["/a.png".into()] });

        let msg: InboundMessage = serde_json::from_str(r#"{"type":"fetchFresh"}"#).unwrap();
        assert_eq!(msg, InboundMessage::CacheUrls { urls: Vec::new() });
    }

    #[test]
    fn test_unknown_inbound_rejected() {
        assert!(serde_json::from_str::<InboundMessage>(r#"{"type":"REBOOT"}"#).is_err());
    }

    #[test]
    fn test_outbound_wire_shape() {
        let json = serde_json::to_value(OutboundMessage::Activated { version: "2024-06-01".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "SW_ACTIVATED", "version": "2024-06-01"}));

        let json = serde_json::to_value(OutboundMessage::ContentUpdated { url: None }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "CONTENT_UPDATED"}));
    }
}
