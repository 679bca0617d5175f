//! Console Bot Demo
//!
//! Drives a Ferrule bot from the terminal. Every line typed on stdin becomes
//! a message in a single `console` channel; replies are printed to stdout.
//!
//! # Modules
//!
//! - built-in: `help`, `enable`/`disable`/`commands`, `config`
//! - `general`: `ping`, `echo`, `whoami`, `hello`
//! - `notes`: a sub-router (`notes add`, `notes remove`, ...) backed by the store
//! - `ask`: waits for a follow-up answer
//!
//! # Usage
//!
//! ```bash
//! # Write a default configuration, edit it, then start the bot with it
//! cargo run --package console-bot -- --config ferrule.toml
//! cargo run --package console-bot -- --config ferrule.toml
//!
//! # Ad-hoc settings
//! cargo run --package console-bot -- --prefix "?" --admin
//! ```
//!
//! `FERRULE_*` environment variables (e.g. `FERRULE_BOT__PREFIX=?`) override
//! the file. Press Ctrl+D or Ctrl+C to stop.

mod console;
mod modules;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ferrule::prelude::*;
use tracing::info;

use crate::console::{ConsoleSession, stdin_events};

const BOT_ID: &str = "1000";
const CONSOLE_USER_ID: &str = "42";

#[derive(Debug, Parser)]
#[command(name = "console-bot", version, about = "Chat with a Ferrule bot from the terminal")]
struct Cli {
    /// Configuration file. A default one is written (and the bot exits) when
    /// it does not exist yet.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `development`.
    #[arg(long)]
    profile: Option<String>,

    /// Overrides `bot.prefix`.
    #[arg(short, long)]
    prefix: Option<String>,

    /// Display name of the person typing.
    #[arg(short, long, default_value = "console")]
    user: String,

    /// Guild the console channel belongs to.
    #[arg(short, long, default_value = "console-guild", conflicts_with = "dm")]
    guild: String,

    /// Talk in a direct message instead of a guild channel.
    #[arg(long)]
    dm: bool,

    /// Makes the console user a global admin.
    #[arg(long)]
    admin: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config
        && ConfigLoader::ensure_default(path)
            .with_context(|| format!("writing default configuration to {}", path.display()))?
    {
        println!(
            "Wrote a default configuration to {}. Edit it and start the bot again.",
            path.display()
        );
        return Ok(());
    }

    let user = User::new(CONSOLE_USER_ID, &cli.user);
    let bot = User::bot(BOT_ID, "ferrule");

    let mut builder = FerruleRuntime::builder();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    if let Some(prefix) = &cli.prefix {
        builder = builder.set("bot.prefix", prefix);
    }
    if cli.admin {
        builder = builder.set("bot.admins", vec![user.id.clone()]);
    }
    let runtime = builder.build().context("loading configuration")?;

    runtime.register_modules(builtin_modules())?;
    runtime.register_modules(modules::demo_modules())?;

    let guild = (!cli.dm).then(|| cli.guild.clone());
    info!(
        prefix = %runtime.config().bot.prefix,
        user = %user.name,
        guild = guild.as_deref().unwrap_or("<dm>"),
        "Console bot ready, type a command"
    );

    let session: BoxedSession = Arc::new(ConsoleSession::new(bot.clone()));
    let events = stdin_events(bot, user, guild);
    runtime.run(events, session).await?;

    info!("Console bot stopped");
    Ok(())
}
