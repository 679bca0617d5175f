//! Unified error types for the Ferrule core.
//!
//! Framework-level errors (like `RouterError`) are defined in ferrule-framework.

use thiserror::Error;

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by the outbound [`Session`](crate::session::Session).
///
/// Reply helpers hand these back to the calling handler unchanged; nothing in
/// the dispatch path retries a failed send.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The session is not connected to the platform.
    #[error("session is not connected")]
    NotConnected,

    /// The platform rejected the message.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The bot lacks permission to post in the target channel.
    #[error("missing permission to send in channel '{channel_id}'")]
    Forbidden {
        /// The channel the send was attempted on.
        channel_id: String,
    },

    /// Failed to serialize the outbound payload.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors raised by a [`Store`](crate::store::Store) backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// I/O error while reading or writing the backing file.
    #[error("I/O error: {0}")]
    Io(String),

    /// Stored data could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend-specific failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for outbound API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
