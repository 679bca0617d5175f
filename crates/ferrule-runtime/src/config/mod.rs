//! Configuration module for the Ferrule runtime.
//!
//! This module provides layered (defaults, files, environment, overrides)
//! configuration loading and validation for the bot, its modules, storage
//! and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX, Profile, load_config, load_config_from_file};
pub use schema::{
    BotSettings, FerruleConfig, LogFormat, LogOutput, LogRotation, LoggingConfig, ModulesConfig,
    RuntimeSettings, SpanEventConfig, StorageBackend, StorageConfig,
};
pub use validation::validate_config;
