//! Ferrule Runtime - Orchestration layer for the Ferrule chat-bot framework.
//!
//! This crate provides:
//! - Layered configuration loading and validation (`ConfigLoader`, `FerruleConfig`)
//! - Logging initialization (`LoggingBuilder`, `init_from_config`)
//! - Runtime orchestration (`FerruleRuntime`): module registration and
//!   selection, startup command policy, the event loop and graceful shutdown
//!
//! ```ignore
//! use ferrule_runtime::FerruleRuntime;
//! use ferrule_framework::builtin::builtin_modules;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = FerruleRuntime::new();
//!     runtime.register_modules(builtin_modules())?;
//!
//!     // `events` yields gateway events, `session` posts replies.
//!     runtime.run(events, session).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Shutdown
//!
//! Ctrl+C, SIGTERM, [`FerruleRuntime::shutdown_token`] or the end of the event
//! source stop ingestion. Handlers still running are then given
//! `runtime.shutdown_grace_ms` to finish.

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    BotSettings, ConfigError, ConfigLoader, ConfigResult, FerruleConfig, ModulesConfig,
    StorageBackend, StorageConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents, init_from_config};
pub use runtime::{FerruleRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
