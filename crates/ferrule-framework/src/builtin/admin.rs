//! Runtime route administration: `enable`, `disable`, `commands`.
//!
//! These handlers mutate the live route table while dispatch keeps running.
//! All of them are admin-only.

use std::sync::Arc;

use super::{log_send, require_admin};
use crate::context::DispatchContext;
use crate::error::RouterResult;
use crate::help::group_by_category;
use crate::module::{Module, Registrar};

/// Enables and disables commands at runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminModule;

impl Module for AdminModule {
    fn name(&self) -> &str {
        "admin"
    }

    fn build(&self, r: &mut Registrar) -> RouterResult<()> {
        let admin = r.with_middleware(require_admin);
        admin
            .on("enable", enable)?
            .describe("Re-enables a disabled command. `enable <command>`");
        admin
            .on("disable", disable)?
            .describe("Disables a command without removing it. `disable <command>`");
        admin
            .on("commands", commands)?
            .describe("Lists every command with its state");
        Ok(())
    }
}

async fn enable(ctx: DispatchContext) {
    toggle(ctx, false).await;
}

async fn disable(ctx: DispatchContext) {
    toggle(ctx, true).await;
}

async fn toggle(ctx: DispatchContext, disabled: bool) {
    let name = ctx.args().after_n(0);
    if name.is_empty() {
        log_send(ctx.reply_warning("Name the command to change").await);
        return;
    }

    let Some((route, _)) = ctx.router().find_match(&name) else {
        log_send(ctx.reply_error(format!("No command matches `{name}`")).await);
        return;
    };

    if disabled && ctx.route().is_some_and(|current| Arc::ptr_eq(current, &route)) {
        log_send(ctx.reply_error("Refusing to disable the command that is running").await);
        return;
    }

    route.set_disabled(disabled);
    let state = if disabled { "disabled" } else { "enabled" };
    log_send(
        ctx.reply_success(format!("`{}` is now {state}", route.name()))
            .await,
    );
}

async fn commands(ctx: DispatchContext) {
    let mut out = String::new();
    for group in group_by_category(ctx.router().all_routes()) {
        out.push_str(&format!("[{}]\n", group.category));
        for route in group.routes {
            if route.is_disabled() {
                out.push_str(&format!("  {} (disabled)\n", route.name()));
            } else {
                out.push_str(&format!("  {}\n", route.name()));
            }
        }
    }
    log_send(ctx.reply(format!("```\n{out}```")).await);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Services;
    use crate::dispatcher::{Dispatcher, DispatcherConfig};
    use crate::router::Router;
    use ferrule_core::{MemorySession, MemoryStore, MessageEvent, Outbound, Status, User};
    use serde_json::Value;
    use std::time::Duration;

    struct Bot {
        dispatcher: Dispatcher,
        session: Arc<MemorySession>,
        router: Arc<Router>,
    }

    fn bot() -> Bot {
        let session = Arc::new(MemorySession::new(User::bot("42", "ferrule")));
        let router = Arc::new(Router::new());
        let mut r = Registrar::new(Arc::clone(&router), AdminModule.category(), Value::Null);
        AdminModule.build(&mut r).unwrap();
        router
            .scope("general")
            .on("ping", |_ctx: DispatchContext| async {})
            .unwrap();

        let config = DispatcherConfig {
            admins: vec!["1".into()],
            ..DispatcherConfig::default()
        };
        let services = Services::new(
            Arc::clone(&session) as _,
            Arc::clone(&router),
            Arc::new(MemoryStore::new()),
            config,
        );
        Bot {
            dispatcher: Dispatcher::new(Arc::new(services)),
            session,
            router,
        }
    }

    async fn say(bot: &Bot, author: &str, content: &str) -> Vec<Outbound> {
        let msg = MessageEvent::new("c1", User::new(author, author), content);
        bot.dispatcher.handle_message(msg).await;
        // Wait for the spawned handler without closing the tracker.
        while !bot.dispatcher.tracker().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        bot.session.take_sent()
    }

    fn color(sent: &[Outbound]) -> Option<u32> {
        match &sent[0] {
            Outbound::Embed { embed, .. } => embed.color,
            Outbound::Text { .. } => None,
        }
    }

    #[tokio::test]
    async fn test_disable_then_enable() {
        let bot = bot();

        let sent = say(&bot, "1", "!disable ping").await;
        assert_eq!(color(&sent), Some(Status::Success.color()));
        assert!(bot.router.find_enabled_match("ping").is_none());

        let sent = say(&bot, "1", "!commands").await;
        assert!(sent[0].text().unwrap().contains("ping (disabled)"));

        say(&bot, "1", "!enable ping").await;
        assert!(bot.router.find_enabled_match("ping").is_some());
    }

    #[tokio::test]
    async fn test_non_admin_is_rejected() {
        let bot = bot();
        let sent = say(&bot, "2", "!disable ping").await;
        assert_eq!(color(&sent), Some(Status::Error.color()));
        assert!(bot.router.find_enabled_match("ping").is_some());
    }

    #[tokio::test]
    async fn test_cannot_disable_itself() {
        let bot = bot();
        let sent = say(&bot, "1", "!disable disable").await;
        assert_eq!(color(&sent), Some(Status::Error.color()));
        assert!(bot.router.find_enabled_match("disable x").is_some());
    }

    #[tokio::test]
    async fn test_unknown_and_missing_names() {
        let bot = bot();
        assert_eq!(color(&say(&bot, "1", "!enable nope").await), Some(Status::Error.color()));
        assert_eq!(color(&say(&bot, "1", "!enable").await), Some(Status::Warning.color()));
    }
}
