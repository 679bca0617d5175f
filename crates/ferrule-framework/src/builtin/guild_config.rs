//! Per-guild settings: `config prefix`, `config admins`.
//!
//! Every `config` command runs behind [`guild_auth`], which loads the guild's
//! [`GuildSettings`] into the scratch bag and checks admin access against
//! them. Handlers read the cached settings instead of hitting the store again.

use ferrule_core::{GuildSettings, load_guild_settings, save_guild_settings};
use tracing::{info, warn};

use super::log_send;
use crate::context::{DispatchContext, GUILD_SETTINGS_KEY};
use crate::error::RouterResult;
use crate::module::{Module, Registrar};

/// Argument that resets a setting.
pub const RESET_FLAG: &str = "--default";

/// Guild-level configuration commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuildConfigModule;

impl Module for GuildConfigModule {
    fn name(&self) -> &str {
        "config"
    }

    fn build(&self, r: &mut Registrar) -> RouterResult<()> {
        let guarded = r.with_middleware(guild_auth);
        let config = guarded.subrouter("config")?;
        config.set(
            "config",
            "Shows or changes this guild's settings. `config prefix [value | --default]`, `config admins [id,id | --default]`",
            "",
        );
        guarded.on_subrouter(&config, show);

        let nested = guarded.nested(&config);
        nested
            .on("prefix", prefix)?
            .describe("Shows or sets the guild command prefix");
        nested
            .on("admins", admins)?
            .describe("Shows or sets the guild admins, comma separated");
        Ok(())
    }
}

/// Loads guild settings into the scratch bag and requires admin access.
pub async fn guild_auth(mut ctx: DispatchContext) -> Option<DispatchContext> {
    let Some(guild_id) = ctx.guild_id().map(str::to_string) else {
        log_send(ctx.reply_error("This command can only be used in a guild").await);
        return None;
    };

    let settings = match load_guild_settings(ctx.store().as_ref(), &guild_id).await {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            warn!(%guild_id, error = %e, "Failed to load guild settings");
            log_send(ctx.reply_error("Could not load the guild settings").await);
            return None;
        }
    };
    ctx.set(GUILD_SETTINGS_KEY, settings);

    if !ctx.is_admin().await {
        log_send(ctx.reply_error("You need to be an admin to use this command").await);
        return None;
    }
    Some(ctx)
}

fn cached(ctx: &DispatchContext) -> GuildSettings {
    ctx.get::<GuildSettings>(GUILD_SETTINGS_KEY)
        .unwrap_or_default()
}

async fn save(ctx: &DispatchContext, settings: &GuildSettings) -> bool {
    let Some(guild_id) = ctx.guild_id() else {
        return false;
    };
    match save_guild_settings(ctx.store().as_ref(), guild_id, settings).await {
        Ok(()) => {
            info!(guild_id, ?settings, "Guild settings saved");
            true
        }
        Err(e) => {
            warn!(guild_id, error = %e, "Failed to save guild settings");
            log_send(ctx.reply_error("Could not save the guild settings").await);
            false
        }
    }
}

fn effective_prefix<'a>(ctx: &'a DispatchContext, settings: &'a GuildSettings) -> &'a str {
    settings
        .prefix_override()
        .unwrap_or(&ctx.services().config.prefix)
}

fn admin_list(settings: &GuildSettings) -> String {
    if settings.admins.is_empty() {
        "none".to_string()
    } else {
        settings.admins.join(", ")
    }
}

async fn show(ctx: DispatchContext) {
    let settings = cached(&ctx);
    let text = format!(
        "prefix: `{}`\nadmins: {}",
        effective_prefix(&ctx, &settings),
        admin_list(&settings)
    );
    log_send(ctx.reply_notify(text).await);
}

async fn prefix(ctx: DispatchContext) {
    let mut settings = cached(&ctx);
    let value = ctx.args().get(0).to_string();

    match value.as_str() {
        "" => {
            let text = format!("The prefix is `{}`", effective_prefix(&ctx, &settings));
            log_send(ctx.reply_notify(text).await);
        }
        RESET_FLAG => {
            settings.prefix = None;
            if save(&ctx, &settings).await {
                let text = format!("Prefix reset to `{}`", ctx.services().config.prefix);
                log_send(ctx.reply_success(text).await);
            }
        }
        _ => {
            settings.prefix = Some(value.clone());
            if save(&ctx, &settings).await {
                log_send(ctx.reply_success(format!("Prefix set to `{value}`")).await);
            }
        }
    }
}

async fn admins(ctx: DispatchContext) {
    let mut settings = cached(&ctx);
    let value = ctx.args().after_n(0);

    match value.as_str() {
        "" => {
            let text = format!("Guild admins: {}", admin_list(&settings));
            log_send(ctx.reply_notify(text).await);
        }
        RESET_FLAG => {
            settings.admins.clear();
            if save(&ctx, &settings).await {
                log_send(ctx.reply_success("Guild admins cleared").await);
            }
        }
        _ => {
            settings.admins = value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
            if save(&ctx, &settings).await {
                let text = format!("Guild admins set to {}", admin_list(&settings));
                log_send(ctx.reply_success(text).await);
            }
        }
    }
}
