use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Refresh settings are usable (at least one page, non-zero windows)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.refresh.max_pages == 0 {
        return Err(ConfigError::ValidationError(
            "refresh.max_pages must be at least 1".to_string(),
        ));
    }

    if config.refresh.staleness_hours == 0 {
        return Err(ConfigError::ValidationError(
            "refresh.staleness_hours cannot be 0".to_string(),
        ));
    }

    if config.refresh.enabled && config.refresh.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "refresh.interval_secs cannot be 0 when refresh is enabled".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RefreshConfig, ServerConfig};

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_pages_fails() {
        let config = Config {
            refresh: RefreshConfig {
                max_pages: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_interval_only_matters_when_enabled() {
        let mut config = Config {
            refresh: RefreshConfig {
                interval_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());

        config.refresh.enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
