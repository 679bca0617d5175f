//! `ping`, `echo`, `whoami` and a greeting pattern.

use ferrule::prelude::*;
use tracing::warn;

pub struct GeneralModule;

impl Module for GeneralModule {
    fn name(&self) -> &str {
        "general"
    }

    fn build(&self, r: &mut Registrar) -> RouterResult<()> {
        r.on("ping", ping)?.describe("Replies with pong");
        r.on("echo|say", echo)?
            .set("echo", "Repeats the text after the command", "");
        r.on("whoami", whoami)?
            .describe("Shows your user id and where you are talking from");
        r.on_reg(r"(?i)^(?:hi|hello|hey)\b", greet)?
            .set("hello", "Says hello back", "");
        Ok(())
    }
}

async fn send(ctx: &DispatchContext, text: impl std::fmt::Display) {
    if let Err(e) = ctx.reply(text).await {
        warn!(error = %e, "Failed to send reply");
    }
}

async fn ping(ctx: DispatchContext) {
    send(&ctx, "Pong!").await;
}

async fn echo(ctx: DispatchContext) {
    let text = ctx.args().after_n(0);
    if text.is_empty() {
        if let Err(e) = ctx.reply_error("Nothing to echo").await {
            warn!(error = %e, "Failed to send reply");
        }
        return;
    }
    send(&ctx, text).await;
}

async fn whoami(ctx: DispatchContext) {
    let author = &ctx.message().author;
    let place = match ctx.guild_id() {
        Some(guild) => format!("guild {guild}"),
        None => "a direct message".to_string(),
    };
    let admin = if ctx.is_admin().await { " (admin)" } else { "" };
    send(&ctx, format!("{} [{}]{admin}, talking from {place}", author.name, author.id)).await;
}

async fn greet(ctx: DispatchContext) {
    send(&ctx, format!("Hello, {}!", ctx.message().author.name)).await;
}
