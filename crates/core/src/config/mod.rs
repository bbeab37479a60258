//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (RAILBOOK_*)
//! 2. TOML config file (if RAILBOOK_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The cache version is part of the configuration rather than derived from
//! the clock, so the generation a deployment owns is fixed at deploy time.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::generation::GenerationId;

mod validation;

pub use validation::ConfigError;

/// Whether fresh navigation responses are copied into the runtime bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationStore {
    /// HTML is never written to storage; online users always see live content.
    Never,
    /// Fresh HTML is stored so the offline fallback chain can serve it.
    #[default]
    Fallback,
}

/// Default push notification fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "RailBook Question Bank".into(),
            body: "New question papers available!".into(),
            icon: "/icons/icon-192x192.png".into(),
            badge: "/icons/icon-96x96.png".into(),
            tag: "question-update".into(),
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (RAILBOOK_*)
/// 2. TOML config file (if RAILBOOK_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker controls. Requests to any other origin pass through.
    ///
    /// Set via RAILBOOK_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Version of the current cache generation, injected at deploy time.
    ///
    /// Set via RAILBOOK_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Namespace of the bucket populated at install.
    #[serde(default = "default_static_namespace")]
    pub static_namespace: String,

    /// Namespace of the bucket written during fetch handling.
    #[serde(default = "default_runtime_namespace")]
    pub runtime_namespace: String,

    /// Root-relative asset paths cached at install.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Navigation fallback document when the exact page is not cached.
    #[serde(default = "default_document")]
    pub default_document: String,

    /// Same-origin path prefixes served by the data backend.
    #[serde(default = "default_api_path_prefixes")]
    pub api_path_prefixes: Vec<String>,

    #[serde(default)]
    pub navigation_store: NavigationStore,

    /// Maximum entries kept in the runtime bucket.
    ///
    /// Set via RAILBOOK_MAX_RUNTIME_ENTRIES environment variable.
    #[serde(default = "default_max_runtime_entries")]
    pub max_runtime_entries: usize,

    /// Interval of the periodic size-bound sweep in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Path to SQLite cache database.
    ///
    /// Set via RAILBOOK_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub notification: NotificationDefaults,

    /// Page opened by the "view" notification action.
    #[serde(default = "default_notification_view_url")]
    pub notification_view_url: String,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}

fn default_static_namespace() -> String {
    "railbook-static".into()
}

fn default_runtime_namespace() -> String {
    "railbook-runtime".into()
}

fn default_static_assets() -> Vec<String> {
    [
        "/manifest.json",
        "/favicon.png",
        "/railbook-logo.png",
        "/icons/icon-72x72.png",
        "/icons/icon-96x96.png",
        "/icons/icon-128x128.png",
        "/icons/icon-144x144.png",
        "/icons/icon-152x152.png",
        "/icons/icon-192x192.png",
        "/icons/icon-384x384.png",
        "/icons/icon-512x512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_document() -> String {
    "/index.html".into()
}

fn default_api_path_prefixes() -> Vec<String> {
    vec!["/api/".into()]
}

fn default_max_runtime_entries() -> usize {
    50
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./railbook-cache.sqlite")
}

fn default_user_agent() -> String {
    "railbook-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_notification_view_url() -> String {
    "/pdfs.html".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_version: default_cache_version(),
            static_namespace: default_static_namespace(),
            runtime_namespace: default_runtime_namespace(),
            static_assets: default_static_assets(),
            default_document: default_document(),
            api_path_prefixes: default_api_path_prefixes(),
            navigation_store: NavigationStore::default(),
            max_runtime_entries: default_max_runtime_entries(),
            sweep_interval_secs: default_sweep_interval_secs(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            notification: NotificationDefaults::default(),
            notification_view_url: default_notification_view_url(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Parsed origin. Only valid after [`AppConfig::validate`] has passed.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    pub fn static_generation(&self) -> GenerationId {
        GenerationId::new(&self.static_namespace, &self.cache_version)
    }

    pub fn runtime_generation(&self) -> GenerationId {
        GenerationId::new(&self.runtime_namespace, &self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `RAILBOOK_`
    /// 2. TOML file from `RAILBOOK_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("RAILBOOK_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("RAILBOOK_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
