//! # Ferrule
//!
//! A chat-bot command framework: regex-matched routes, keyword-gated
//! sub-routers, and a dispatcher that runs every command on its own task.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐  find_enabled_match  ┌─────────────────────────────┐
//! │ EventSource  │────▶│ Dispatcher │─────────────────────▶│ Router                      │
//! │ (transport)  │     │            │                      │  route "ping"               │
//! └──────────────┘     └─────┬──────┘                      │  sub-router "config"        │
//!                            │ spawn                       │    route "prefix"           │
//!                            ▼                             └─────────────────────────────┘
//!                  handler(DispatchContext) ──▶ Session (replies), Store (settings)
//! ```
//!
//! - **Runtime**: loads configuration, builds modules, pumps events, shuts down
//! - **Modules**: units of functionality that register routes at startup
//! - **Router**: ordered routes and sub-routers, first match wins
//! - **Dispatcher**: resolves prefix or mention, matches, spawns the handler
//! - **Handlers**: `async fn(DispatchContext)`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrule::prelude::*;
//!
//! async fn ping(ctx: DispatchContext) {
//!     let _ = ctx.reply("pong").await;
//! }
//!
//! struct General;
//!
//! impl Module for General {
//!     fn name(&self) -> &str {
//!         "general"
//!     }
//!
//!     fn build(&self, r: &mut Registrar) -> RouterResult<()> {
//!         r.on("ping", ping)?.describe("Replies with pong");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = FerruleRuntime::new();
//!     runtime.register_modules(builtin_modules())?;
//!     runtime.register_module(General)?;
//!     runtime.run(events, session).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use ferrule_core as core;
pub use ferrule_framework as framework;
pub use ferrule_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use ferrule::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use ferrule_runtime::{ConfigLoader, FerruleConfig, FerruleRuntime};

    // Modules and registration
    pub use ferrule_framework::builtin::{
        AdminModule, GuildConfigModule, HelpModule, builtin_modules, require_admin,
    };
    pub use ferrule_framework::{Module, Registrar, RouterError, RouterResult};

    // Routing
    pub use ferrule_framework::{Args, Matcher, Route, Router, Subrouter};

    // Handlers
    pub use ferrule_framework::{
        DispatchContext, Dispatcher, DispatcherConfig, Handler, Middleware, with_middleware,
    };

    // Platform seams
    pub use ferrule_core::{
        BoxedSession, BoxedStore, Embed, EventSource, GatewayEvent, GuildSettings, MessageEvent,
        Session, Status, Store, User,
    };
}
