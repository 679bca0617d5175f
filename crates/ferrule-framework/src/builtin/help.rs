//! `help [command]`.

use ferrule_core::Embed;

use super::log_send;
use crate::context::DispatchContext;
use crate::error::RouterResult;
use crate::help::{UNDEFINED_CATEGORY, listing, render_embed};
use crate::module::{Module, Registrar};

/// Lists commands, or describes one.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelpModule;

impl Module for HelpModule {
    fn name(&self) -> &str {
        "help"
    }

    fn category(&self) -> &str {
        "information"
    }

    fn build(&self, r: &mut Registrar) -> RouterResult<()> {
        r.on("help|h", help)?.set(
            "help",
            "Lists the available commands, or describes one. `help [command]`",
            "",
        );
        Ok(())
    }
}

async fn help(ctx: DispatchContext) {
    let query = ctx.args().after_n(0);

    if query.is_empty() {
        let sections = listing(ctx.router());
        log_send(ctx.reply_embed(&render_embed(&sections, ctx.prefix())).await);
        return;
    }

    let Some((route, _)) = ctx.router().find_match(&query) else {
        log_send(ctx.reply_error(format!("No command matches `{query}`")).await);
        return;
    };

    let meta = route.meta();
    let category = if meta.category.is_empty() {
        UNDEFINED_CATEGORY
    } else {
        meta.category.as_str()
    };
    let description = if meta.description.is_empty() {
        "No description"
    } else {
        meta.description.as_str()
    };
    let mut embed = Embed::new()
        .title(&meta.name)
        .description(description)
        .field("Category", category, true);
    if route.is_disabled() {
        embed = embed.field("Status", "disabled", true);
    }
    log_send(ctx.reply_embed(&embed).await);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Services;
    use crate::dispatcher::{DispatchOutcome, Dispatcher, DispatcherConfig};
    use crate::router::Router;
    use ferrule_core::{MemorySession, MemoryStore, MessageEvent, Outbound, User};
    use std::sync::Arc;
    use std::time::Duration;

    async fn run(content: &str) -> Vec<Outbound> {
        let session = Arc::new(MemorySession::new(User::bot("42", "ferrule")));
        let router = Arc::new(Router::new());
        let mut r = Registrar::new(
            Arc::clone(&router),
            HelpModule.category(),
            serde_json::Value::Null,
        );
        HelpModule.build(&mut r).unwrap();
        router
            .scope("general")
            .on("ping", |_ctx: DispatchContext| async {})
            .unwrap()
            .describe("Replies with pong");

        let services = Services::new(
            Arc::clone(&session) as _,
            router,
            Arc::new(MemoryStore::new()),
            DispatcherConfig::default(),
        );
        let dispatcher = Dispatcher::new(Arc::new(services));
        let outcome = dispatcher
            .handle_message(MessageEvent::new("c1", User::new("7", "alice"), content))
            .await;
        assert!(matches!(outcome, DispatchOutcome::Spawned(_)));
        assert!(dispatcher.shutdown(Duration::from_secs(1)).await);
        session.take_sent()
    }

    fn embed(sent: &[Outbound]) -> &Embed {
        match &sent[0] {
            Outbound::Embed { embed, .. } => embed,
            other => panic!("expected embed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_help_lists_categories() {
        let sent = run("!help").await;
        let names: Vec<&str> = embed(&sent).fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["general", "information"]);
    }

    #[tokio::test]
    async fn test_help_describes_command() {
        let sent = run("!help ping").await;
        let embed = embed(&sent);
        assert_eq!(embed.title.as_deref(), Some("ping"));
        assert_eq!(embed.description.as_deref(), Some("Replies with pong"));
    }

    #[tokio::test]
    async fn test_help_unknown_command() {
        let sent = run("!h nope").await;
        assert_eq!(embed(&sent).color, Some(ferrule_core::Status::Error.color()));
    }
}
