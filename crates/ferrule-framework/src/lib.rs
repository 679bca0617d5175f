//! # Ferrule Framework
//!
//! Command routing and dispatch for chat bots.
//!
//! This layer provides:
//! - Argument tokenizing with quote handling ([`Args`])
//! - Regex-backed routes with help metadata and an enable switch ([`Route`])
//! - An ordered, concurrently mutable route table with keyword-gated
//!   sub-routers ([`Router`])
//! - Per-invocation context with reply helpers and a scratch bag
//!   ([`DispatchContext`])
//! - The message-to-handler pipeline ([`Dispatcher`])
//! - Feature modules and middleware ([`Module`], [`Middleware`])
//!
//! Transport, configuration loading and process lifecycle live in
//! `ferrule-runtime`.

pub mod args;
pub mod builtin;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod help;
pub mod matcher;
pub mod module;
pub mod route;
pub mod router;

pub use args::{Args, tokenize};
pub use context::{DispatchContext, GUILD_SETTINGS_KEY, Services};
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherConfig, IgnoreReason};
pub use error::{RouterError, RouterResult};
pub use handler::{BoxFuture, BoxedHandler, Handler, Middleware, into_handler, with_middleware};
pub use matcher::Matcher;
pub use module::{BoxedModule, Module, Registrar};
pub use route::{Route, RouteMeta};
pub use router::{Entry, RouteMatch, Router, Subrouter};
