//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotSettings, FerruleConfig, LoggingConfig, StorageBackend, StorageConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validates the entire configuration.
pub fn validate_config(config: &FerruleConfig) -> ConfigResult<()> {
    validate_bot(&config.bot)?;
    validate_storage(&config.storage)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn validate_bot(bot: &BotSettings) -> ConfigResult<()> {
    if bot.prefix.is_empty() {
        return Err(ConfigError::validation("bot.prefix must not be empty"));
    }

    if bot.prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(
            "bot.prefix must not contain whitespace",
        ));
    }

    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> ConfigResult<()> {
    if storage.backend == StorageBackend::Json && storage.path.is_none() {
        return Err(ConfigError::validation(
            "storage.path is required for the json backend",
        ));
    }
    Ok(())
}

fn validate_level(field: &str, level: &str) -> ConfigResult<()> {
    if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        return Err(ConfigError::validation(format!(
            "Invalid log level for {field}: {level}. Valid values are: {LOG_LEVELS:?}"
        )));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    validate_level("logging.level", &logging.level)?;
    for (target, level) in &logging.filters {
        validate_level(&format!("logging.filters.{target}"), level)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&FerruleConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_prefix() {
        let mut config = FerruleConfig::default();
        config.bot.prefix = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        config.bot.prefix = "! ".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = FerruleConfig::default();
        config.logging.level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());

        config
            .logging
            .filters
            .insert("ferrule_framework".into(), "chatty".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_json_storage_needs_path() {
        let mut config = FerruleConfig::default();
        config.storage.backend = StorageBackend::Json;
        assert!(validate_config(&config).is_err());

        config.storage.path = Some(PathBuf::from("data/ferrule.json"));
        assert!(validate_config(&config).is_ok());
    }
}
