//! Error types for the Ferrule framework.

use thiserror::Error;

/// Errors raised while registering or mutating routes.
///
/// Registration errors are programming mistakes. Module `build` methods
/// propagate them with `?` and the runtime refuses to start.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// A matcher pattern failed to compile.
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The full pattern that was compiled.
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// No route matched the given name or probe text.
    #[error("no route matches '{0}'")]
    RouteNotFound(String),
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
