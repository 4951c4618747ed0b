use std::sync::Arc;

use omecache_core::{ChangeWatcher, Config, ContentService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<ContentService>,
    watcher: Arc<ChangeWatcher>,
}

impl AppState {
    pub fn new(config: Config, service: Arc<ContentService>, watcher: Arc<ChangeWatcher>) -> Self {
        Self {
            config,
            service,
            watcher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &ContentService {
        self.service.as_ref()
    }

    pub fn watcher(&self) -> &ChangeWatcher {
        self.watcher.as_ref()
    }

    /// Admin key, if the admin routes are enabled.
    pub fn admin_key(&self) -> Option<&str> {
        self.config.admin.api_key.as_deref()
    }

    /// Language used when a request does not name one.
    pub fn default_language(&self) -> &str {
        &self.config.query.default_language
    }
}
