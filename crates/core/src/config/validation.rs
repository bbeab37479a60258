//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `cache_version` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - `cache_version` contains whitespace
    /// - namespaces are empty or equal
    /// - a static asset or `default_document` is not root-relative
    /// - `max_runtime_entries` is 0
    /// - `sweep_interval_secs` is outside 1s..=1 day
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }

        if self.cache_version.is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_version".into(),
                hint: "Set RAILBOOK_CACHE_VERSION at deploy time".into(),
            });
        }
        if self.cache_version.chars().any(char::is_whitespace) {
            return Err(invalid("cache_version", "must not contain whitespace"));
        }

        if self.static_namespace.is_empty() {
            return Err(invalid("static_namespace", "must not be empty"));
        }
        if self.runtime_namespace.is_empty() {
            return Err(invalid("runtime_namespace", "must not be empty"));
        }
        if self.static_namespace == self.runtime_namespace {
            return Err(invalid("runtime_namespace", "must differ from static_namespace"));
        }

        if let Some(asset) = self.static_assets.iter().find(|a| !a.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "static_assets".into(),
                reason: format!("{asset} must be root-relative"),
            });
        }
        if !self.default_document.starts_with('/') {
            return Err(invalid("default_document", "must be root-relative"));
        }
        if !self.notification_view_url.starts_with('/') {
            return Err(invalid("notification_view_url", "must be root-relative"));
        }

        if self.max_runtime_entries == 0 {
            return Err(invalid("max_runtime_entries", "must be greater than 0"));
        }

        if self.sweep_interval_secs == 0 {
            return Err(invalid("sweep_interval_secs", "must be at least 1 second"));
        }
        if self.sweep_interval_secs > 86_400 {
            return Err(invalid("sweep_interval_secs", "must not exceed 1 day (86400s)"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.static_assets.is_empty() {
            tracing::warn!("static_assets is empty; install will cache nothing");
        }

        Ok(())
    }
}
