use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Session url is not empty
/// - Page size and reload interval are positive
/// - Server port is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.session.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "session.url cannot be empty".to_string(),
        ));
    }

    if config.sync.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "sync.page_size must be greater than 0".to_string(),
        ));
    }

    if config.sync.reload_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "sync.reload_interval_ms must be greater than 0".to_string(),
        ));
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    Ok(())
}
