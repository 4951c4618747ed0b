use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Upstream section exists (enforced by serde) and has a base URL
/// - Server port is not 0
/// - Page sizes, limits and TTLs are non-zero
/// - The watcher safety factor lies in (0, 1]
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.upstream.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "upstream.base_url cannot be empty".to_string(),
        ));
    }

    if config.mirror.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "mirror.page_size cannot be 0".to_string(),
        ));
    }

    if config.query.default_limit == 0 || config.query.filtered_limit == 0 {
        return Err(ConfigError::ValidationError(
            "query limits cannot be 0".to_string(),
        ));
    }

    let ttls = [
        ("mirror.ttl_secs", config.mirror.ttl_secs),
        ("cache.filters_ttl_secs", config.cache.filters_ttl_secs),
        ("cache.counts_ttl_secs", config.cache.counts_ttl_secs),
        ("cache.creators_ttl_secs", config.cache.creators_ttl_secs),
        ("cache.item_ttl_secs", config.cache.item_ttl_secs),
        ("cache.details_ttl_secs", config.cache.details_ttl_secs),
        ("cache.query_ttl_secs", config.cache.query_ttl_secs),
        ("cache.page_ttl_secs", config.cache.page_ttl_secs),
    ];
    if let Some((name, _)) = ttls.iter().find(|(_, ttl)| *ttl == 0) {
        return Err(ConfigError::ValidationError(format!("{} cannot be 0", name)));
    }

    if config.watcher.recent_limit == 0 || config.watcher.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "watcher.recent_limit and watcher.poll_interval_secs cannot be 0".to_string(),
        ));
    }

    let factor = config.watcher.ttl_safety_factor;
    if !(factor > 0.0 && factor <= 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "watcher.ttl_safety_factor must be in (0, 1], got {}",
            factor
        )));
    }

    Ok(())
}
