//! Runtime error types.

use ferrule_core::StoreError;
use ferrule_framework::RouterError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A module failed to register its routes.
    #[error("Module '{module}' failed to register: {source}")]
    Module {
        module: String,
        #[source]
        source: RouterError,
    },

    /// No registered module has this name.
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// The store backend could not be opened.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// `run` was called while the runtime is already running.
    #[error("Runtime is already running")]
    AlreadyRunning,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
