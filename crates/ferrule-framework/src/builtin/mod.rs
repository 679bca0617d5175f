//! Built-in modules shipped with the Ferrule framework.
//!
//! | Module | Category | Commands |
//! |--------|----------|----------|
//! | [`HelpModule`] | `information` | `help [command]` |
//! | [`AdminModule`] | `admin` | `enable <command>`, `disable <command>`, `commands` |
//! | [`GuildConfigModule`] | `config` | `config prefix [value]`, `config admins [ids]` |
//!
//! # Loading built-in modules
//!
//! ```rust,ignore
//! use ferrule::prelude::*;
//!
//! runtime.register_module(HelpModule);
//! runtime.register_module(AdminModule);
//! ```
//!
//! Alternatively, [`builtin_modules`] returns all of them.

pub mod admin;
pub mod guild_config;
pub mod help;

pub use admin::AdminModule;
pub use guild_config::GuildConfigModule;
pub use help::HelpModule;

use ferrule_core::{ApiResult, SentMessage};
use tracing::warn;

use crate::context::DispatchContext;
use crate::module::BoxedModule;

/// All built-in modules, in their default registration order.
pub fn builtin_modules() -> Vec<BoxedModule> {
    vec![
        Box::new(HelpModule),
        Box::new(AdminModule),
        Box::new(GuildConfigModule),
    ]
}

/// Middleware letting only admins through.
///
/// Non-admins get an error notice and the handler does not run.
pub async fn require_admin(ctx: DispatchContext) -> Option<DispatchContext> {
    if ctx.is_admin().await {
        return Some(ctx);
    }
    log_send(ctx.reply_error("You need to be an admin to use this command").await);
    None
}

/// Logs a failed reply. Handlers have nobody to report send failures to.
pub(crate) fn log_send(result: ApiResult<SentMessage>) {
    if let Err(e) = result {
        warn!(error = %e, "Failed to send reply");
    }
}
