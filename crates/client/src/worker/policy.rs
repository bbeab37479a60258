//! Immutable policy for one deployed worker version.

use url::Url;

use railbook_core::config::NotificationDefaults;
use railbook_core::{AppConfig, ConfigError, GenerationId, NavigationStore};

/// Static policy table derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub origin: Url,
    pub static_generation: GenerationId,
    pub runtime_generation: GenerationId,
    pub static_assets: Vec<String>,
    pub default_document: String,
    pub api_path_prefixes: Vec<String>,
    pub navigation_store: NavigationStore,
    pub max_runtime_entries: usize,
    pub notification: NotificationDefaults,
    pub notification_view_url: String,
}

impl PolicyConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            origin: config.origin_url()?,
            static_generation: config.static_generation(),
            runtime_generation: config.runtime_generation(),
            static_assets: config.static_assets.clone(),
            default_document: config.default_document.clone(),
            api_path_prefixes: config.api_path_prefixes.clone(),
            navigation_store: config.navigation_store,
            max_runtime_entries: config.max_runtime_entries,
            notification: config.notification.clone(),
            notification_view_url: config.notification_view_url.clone(),
        })
    }

    pub fn version(&self) -> &str {
        &self.static_generation.version
    }

    /// Superseded by one of the current generations: eligible for the activation purge.
    pub fn is_stale(&self, generation: &GenerationId) -> bool {
        self.static_generation.supersedes(generation) || self.runtime_generation.supersedes(generation)
    }
}
