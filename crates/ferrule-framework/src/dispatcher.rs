//! Message dispatcher for the Ferrule framework.
//!
//! The [`Dispatcher`] turns inbound [`MessageEvent`]s into handler invocations.
//! For each message:
//!
//! 1. **Filter**: messages from automated accounts are ignored. In self-bot
//!    mode only the bot's own messages are processed, otherwise its own
//!    messages are ignored.
//! 2. **Address resolution**: the message must start with a mention of the
//!    bot (which must also be in the message's mention list) or with the
//!    command prefix (the guild override when one is saved,
//!    else the global prefix). A lone mention gets a short "how to get help"
//!    reply and ends there.
//! 3. **Route resolution**: the root router's first enabled match on the text
//!    after the prefix. No match ends silently.
//! 4. **Invoke**: the text after the match is tokenized into [`Args`], a
//!    [`DispatchContext`] is built and the handler runs on its own task.
//!
//! ```text
//! MessageEvent ─▶ filter ─▶ prefix/mention ─▶ find_enabled_match ─▶ spawn(handler)
//! ```
//!
//! Invocations are tracked by a [`TaskTracker`] and isolated from each other:
//! a panicking handler is caught and logged, and never reaches the ingestion
//! loop or other invocations.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Level, debug, error, span, trace, warn};

use ferrule_core::{MessageEvent, load_guild_settings};

use crate::args::Args;
use crate::context::{DispatchContext, Services};
use crate::handler::BoxedHandler;

static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<@!?([^>\s]+)>").unwrap());

/// Settings the dispatcher reads for every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Global command prefix.
    pub prefix: String,
    /// Only the bot's own messages are commands.
    pub self_bot: bool,
    /// User ids with global admin access.
    pub admins: Vec<String>,
    /// Reply to a lone mention with a pointer to `help`.
    pub help_hint: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            self_bot: false,
            admins: Vec::new(),
            help_hint: true,
        }
    }
}

/// Why a message was not considered a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The author is an automated account.
    BotAuthor,
    /// The bot's own message outside self-bot mode.
    OwnMessage,
    /// Someone else's message in self-bot mode.
    NotSelf,
    /// Neither prefix nor mention.
    NotAddressed,
    /// The dispatcher was shut down.
    ShuttingDown,
}

/// What [`Dispatcher::handle_message`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    /// A lone mention; the help hint was sent (or is disabled).
    HelpHint,
    /// Addressed to the bot but no enabled route matched.
    NoMatch,
    /// The matched route has no handler.
    NoHandler,
    /// The handler of the named route was spawned.
    Spawned(String),
}

/// Routes inbound messages to handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    services: Arc<Services>,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            tracker: TaskTracker::new(),
        }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Tracker of in-flight invocations.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Processes one inbound message. Never waits for a handler.
    pub async fn handle_message(&self, message: MessageEvent) -> DispatchOutcome {
        if self.tracker.is_closed() {
            return DispatchOutcome::Ignored(IgnoreReason::ShuttingDown);
        }

        let me = self.services.session.current_user();
        let author = &message.author;

        if author.bot {
            return DispatchOutcome::Ignored(IgnoreReason::BotAuthor);
        }
        if let Some(me) = &me {
            if self.services.config.self_bot && author.id != me.id {
                return DispatchOutcome::Ignored(IgnoreReason::NotSelf);
            }
            if !self.services.config.self_bot && author.id == me.id {
                return DispatchOutcome::Ignored(IgnoreReason::OwnMessage);
            }
        }

        let message = Arc::new(message);
        self.services.publish(Arc::clone(&message));

        let prefix = self.resolve_prefix(&message).await;
        let content = message.content.as_str();

        let mention = me.as_ref().and_then(|me| {
            if !message.mentions_user(&me.id) {
                return None;
            }
            let caps = MENTION_RE.captures(content)?;
            let end = caps.get(0)?.end();
            (caps.get(1)?.as_str() == me.id).then_some((me, end))
        });

        let (addressed_by, search_text) = match mention {
            Some((me, end)) => {
                let rest = content[end..].trim_start();
                if rest.is_empty() {
                    self.send_help_hint(&message, &prefix, &me.mention());
                    return DispatchOutcome::HelpHint;
                }
                (content[..end].to_string(), rest)
            }
            None => match content.strip_prefix(prefix.as_str()) {
                Some(rest) => (prefix, rest),
                None => return DispatchOutcome::Ignored(IgnoreReason::NotAddressed),
            },
        };

        let Some((route, loc)) = self.services.router.find_enabled_match(search_text) else {
            trace!(text = search_text, "No route matched");
            return DispatchOutcome::NoMatch;
        };

        let Some(handler) = route.handler().cloned() else {
            debug!(route = %route.name(), "Matched route has no handler");
            return DispatchOutcome::NoHandler;
        };

        let args = Args::parse(&search_text[loc.end..]);
        let name = route.name();
        let span = span!(
            Level::INFO,
            "dispatch",
            route = %name,
            channel_id = %message.channel_id,
            author_id = %message.author.id,
        );
        let ctx = DispatchContext::new(
            message,
            args,
            Some(route),
            addressed_by,
            Arc::clone(&self.services),
        );

        debug!(route = %name, "Spawning handler");
        let route_name = name.clone();
        self.tracker.spawn(
            async move {
                invoke(handler, ctx, &route_name).await;
            }
            .instrument(span),
        );

        DispatchOutcome::Spawned(name)
    }

    /// The guild prefix override when one is saved, else the global prefix.
    async fn resolve_prefix(&self, message: &MessageEvent) -> String {
        let global = &self.services.config.prefix;
        let Some(guild_id) = message.guild_id.as_deref() else {
            return global.clone();
        };

        match load_guild_settings(self.services.store.as_ref(), guild_id).await {
            Ok(Some(settings)) => settings
                .prefix_override()
                .map(str::to_string)
                .unwrap_or_else(|| global.clone()),
            Ok(None) => global.clone(),
            Err(e) => {
                warn!(guild_id, error = %e, "Failed to load guild settings, using global prefix");
                global.clone()
            }
        }
    }

    fn send_help_hint(&self, message: &Arc<MessageEvent>, prefix: &str, mention: &str) {
        if !self.services.config.help_hint {
            return;
        }
        let text = format!("Type `{prefix}help` or {mention} help for a list of commands");
        let services = Arc::clone(&self.services);
        let channel_id = message.channel_id.clone();
        self.tracker.spawn(async move {
            if let Err(e) = services.session.send_message(&channel_id, &text).await {
                warn!(channel_id, error = %e, "Failed to send help hint");
            }
        });
    }

    /// Stops accepting new messages and waits for in-flight invocations.
    ///
    /// After this [`handle_message`](Self::handle_message) ignores every
    /// message with [`IgnoreReason::ShuttingDown`].
    ///
    /// Returns `false` if `grace` elapsed with invocations still running.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            debug!(pending, "Waiting for in-flight handlers");
        }
        tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
    }
}

/// Runs one invocation and logs a panic instead of unwinding, including one
/// raised before the handler returns its future. Returns `false` on panic.
async fn invoke(handler: BoxedHandler, ctx: DispatchContext, route: &str) -> bool {
    let result = AssertUnwindSafe(async move { handler.call(ctx).await })
        .catch_unwind()
        .await;
    match result {
        Ok(()) => true,
        Err(panic) => {
            error!(
                route,
                panic = panic_message(panic.as_ref()),
                "Handler panicked"
            );
            false
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::into_handler;
    use crate::router::Router;
    use ferrule_core::{
        GuildSettings, MemorySession, MemoryStore, Outbound, User, save_guild_settings,
    };
    use tokio::sync::{mpsc, oneshot};

    struct Harness {
        dispatcher: Dispatcher,
        session: Arc<MemorySession>,
        store: Arc<MemoryStore>,
        router: Arc<Router>,
    }

    fn harness(config: DispatcherConfig) -> Harness {
        let session = Arc::new(MemorySession::new(User::bot("42", "ferrule")));
        let store = Arc::new(MemoryStore::new());
        let router = Arc::new(Router::new());
        let services = Arc::new(Services::new(
            Arc::clone(&session) as _,
            Arc::clone(&router),
            Arc::clone(&store) as _,
            config,
        ));
        Harness {
            dispatcher: Dispatcher::new(services),
            session,
            store,
            router,
        }
    }

    fn from_user(content: &str) -> MessageEvent {
        MessageEvent::new("c1", User::new("7", "alice"), content)
    }

    fn mentioning_bot(content: &str) -> MessageEvent {
        from_user(content).mentioning(User::bot("42", "ferrule"))
    }

    /// Registers `ping`, reporting each invocation's args on the channel.
    fn register_ping(router: &Router) -> mpsc::UnboundedReceiver<Vec<String>> {
        let (tx, rx) = mpsc::unbounded_channel();
        router
            .on("ping", move |ctx: DispatchContext| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(ctx.args().as_slice().to_vec());
                }
            })
            .unwrap();
        rx
    }

    #[tokio::test]
    async fn test_prefix_end_to_end() {
        let h = harness(DispatcherConfig::default());
        let mut calls = register_ping(&h.router);

        let outcome = h.dispatcher.handle_message(from_user("!ping")).await;
        assert_eq!(outcome, DispatchOutcome::Spawned("ping".into()));
        assert!(calls.recv().await.unwrap().is_empty());

        assert_eq!(
            h.dispatcher.handle_message(from_user("!pingpong")).await,
            DispatchOutcome::NoMatch
        );
        assert_eq!(
            h.dispatcher.handle_message(from_user("hello !ping")).await,
            DispatchOutcome::Ignored(IgnoreReason::NotAddressed)
        );

        h.dispatcher.handle_message(from_user(r#"!ping a "b c""#)).await;
        assert_eq!(calls.recv().await.unwrap(), vec!["a", "b c"]);
    }

    #[tokio::test]
    async fn test_unbalanced_quotes_still_dispatch() {
        let h = harness(DispatcherConfig::default());
        let mut calls = register_ping(&h.router);

        h.dispatcher.handle_message(from_user(r#"!ping a "unterminated"#)).await;
        assert_eq!(calls.recv().await.unwrap(), vec!["a", "\"unterminated"]);
    }

    #[tokio::test]
    async fn test_filters_authors() {
        let h = harness(DispatcherConfig::default());
        let _calls = register_ping(&h.router);

        let bot = MessageEvent::new("c1", User::bot("9", "other"), "!ping");
        assert_eq!(
            h.dispatcher.handle_message(bot).await,
            DispatchOutcome::Ignored(IgnoreReason::BotAuthor)
        );

        let own = MessageEvent::new("c1", User::new("42", "ferrule"), "!ping");
        assert_eq!(
            h.dispatcher.handle_message(own).await,
            DispatchOutcome::Ignored(IgnoreReason::OwnMessage)
        );
    }

    #[tokio::test]
    async fn test_self_bot_mode() {
        let h = harness(DispatcherConfig {
            self_bot: true,
            ..DispatcherConfig::default()
        });
        let mut calls = register_ping(&h.router);

        assert_eq!(
            h.dispatcher.handle_message(from_user("!ping")).await,
            DispatchOutcome::Ignored(IgnoreReason::NotSelf)
        );

        let own = MessageEvent::new("c1", User::new("42", "ferrule"), "!ping");
        assert_eq!(
            h.dispatcher.handle_message(own).await,
            DispatchOutcome::Spawned("ping".into())
        );
        assert!(calls.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_mention_addressing() {
        let h = harness(DispatcherConfig::default());
        let mut calls = register_ping(&h.router);

        for content in ["<@42> ping x", "<@!42>ping x"] {
            let outcome = h.dispatcher.handle_message(mentioning_bot(content)).await;
            assert_eq!(outcome, DispatchOutcome::Spawned("ping".into()));
            assert_eq!(calls.recv().await.unwrap(), vec!["x"]);
        }

        // Someone else's mention is not an address.
        assert_eq!(
            h.dispatcher.handle_message(from_user("<@99> ping")).await,
            DispatchOutcome::Ignored(IgnoreReason::NotAddressed)
        );

        // Mention markup without the bot in the mention list, e.g. escaped text.
        assert_eq!(
            h.dispatcher.handle_message(from_user("<@42> ping")).await,
            DispatchOutcome::Ignored(IgnoreReason::NotAddressed)
        );

        // Mentioned, but the mention does not open the message.
        assert_eq!(
            h.dispatcher.handle_message(mentioning_bot("hey <@42> ping")).await,
            DispatchOutcome::Ignored(IgnoreReason::NotAddressed)
        );
    }

    #[tokio::test]
    async fn test_lone_mention_sends_help_hint() {
        let h = harness(DispatcherConfig::default());

        let outcome = h.dispatcher.handle_message(mentioning_bot("<@42>")).await;
        assert_eq!(outcome, DispatchOutcome::HelpHint);
        assert!(h.dispatcher.shutdown(Duration::from_secs(1)).await);

        let sent = h.session.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].text(),
            Some("Type `!help` or <@42> help for a list of commands")
        );
    }

    #[tokio::test]
    async fn test_guild_prefix_override() {
        let h = harness(DispatcherConfig::default());
        let mut calls = register_ping(&h.router);

        let settings = GuildSettings {
            prefix: Some("?".into()),
            admins: Vec::new(),
        };
        save_guild_settings(h.store.as_ref(), "g1", &settings).await.unwrap();

        let in_guild = |content: &str| from_user(content).in_guild("g1");
        assert_eq!(
            h.dispatcher.handle_message(in_guild("?ping")).await,
            DispatchOutcome::Spawned("ping".into())
        );
        assert!(calls.recv().await.is_some());
        assert_eq!(
            h.dispatcher.handle_message(in_guild("!ping")).await,
            DispatchOutcome::Ignored(IgnoreReason::NotAddressed)
        );

        // Other guilds and direct messages keep the global prefix.
        assert_eq!(
            h.dispatcher
                .handle_message(from_user("!ping").in_guild("g2"))
                .await,
            DispatchOutcome::Spawned("ping".into())
        );
    }

    #[tokio::test]
    async fn test_route_without_handler() {
        let h = harness(DispatcherConfig::default());
        let docs = h.router.subrouter("docs", "docs").unwrap();
        docs.set("docs", "Documentation only", "");

        assert_eq!(
            h.dispatcher.handle_message(from_user("!docs")).await,
            DispatchOutcome::NoHandler
        );
    }

    #[tokio::test]
    async fn test_disabled_route_is_not_dispatched() {
        let h = harness(DispatcherConfig::default());
        let _calls = register_ping(&h.router);
        h.router.set_disabled("ping", true).unwrap();

        assert_eq!(
            h.dispatcher.handle_message(from_user("!ping")).await,
            DispatchOutcome::NoMatch
        );
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let h = harness(DispatcherConfig::default());
        async fn boom(_ctx: DispatchContext) {
            panic!("handler failure")
        }
        h.router.on("boom", boom).unwrap();
        let mut calls = register_ping(&h.router);

        h.dispatcher.handle_message(from_user("!boom")).await;
        h.dispatcher.handle_message(from_user("!ping after")).await;

        assert_eq!(calls.recv().await.unwrap(), vec!["after"]);
        assert!(h.dispatcher.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_slow_handler_does_not_block_dispatch() {
        let h = harness(DispatcherConfig::default());
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(parking_lot::Mutex::new(Some(release_rx)));
        h.router
            .on("slow", move |ctx: DispatchContext| {
                let release_rx = release_rx.lock().take();
                async move {
                    if let Some(rx) = release_rx {
                        let _ = rx.await;
                    }
                    let _ = ctx.reply("slow done").await;
                }
            })
            .unwrap();
        let mut calls = register_ping(&h.router);

        h.dispatcher.handle_message(from_user("!slow")).await;
        h.dispatcher.handle_message(from_user("!ping")).await;
        assert!(calls.recv().await.is_some());

        release_tx.send(()).unwrap();
        assert!(h.dispatcher.shutdown(Duration::from_secs(1)).await);
        assert_eq!(h.session.take_sent()[0].text(), Some("slow done"));
    }

    #[tokio::test]
    async fn test_follow_up_reply_through_dispatcher() {
        let h = harness(DispatcherConfig::default());
        h.router
            .on("ask", |ctx: DispatchContext| async move {
                let text = match ctx.await_reply(Duration::from_secs(5)).await {
                    Some(answer) => format!("you said {}", answer.content),
                    None => "no response received".to_string(),
                };
                let _ = ctx.reply(text).await;
            })
            .unwrap();

        h.dispatcher.handle_message(from_user("!ask")).await;
        while h.dispatcher.services().waiting() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            h.dispatcher.handle_message(from_user("blue")).await,
            DispatchOutcome::Ignored(IgnoreReason::NotAddressed)
        );

        assert!(h.dispatcher.shutdown(Duration::from_secs(1)).await);
        let sent = h.session.take_sent();
        assert_eq!(sent[0], Outbound::Text {
            channel_id: "c1".into(),
            content: "you said blue".into(),
        });
    }

    #[tokio::test]
    async fn test_panic_before_future_is_caught() {
        let h = harness(DispatcherConfig::default());
        let eager = into_handler(|_ctx: DispatchContext| -> std::future::Ready<()> {
            panic!("failed while building the future")
        });
        let ctx = DispatchContext::new(
            Arc::new(from_user("!eager")),
            Args::default(),
            None,
            "!".to_string(),
            Arc::clone(h.dispatcher.services()),
        );
        assert!(!invoke(eager, ctx, "eager").await);

        let ctx = DispatchContext::new(
            Arc::new(from_user("!fine")),
            Args::default(),
            None,
            "!".to_string(),
            Arc::clone(h.dispatcher.services()),
        );
        assert!(invoke(into_handler(|_ctx: DispatchContext| async {}), ctx, "fine").await);
    }

    #[tokio::test]
    async fn test_messages_after_shutdown_are_ignored() {
        let h = harness(DispatcherConfig::default());
        let _calls = register_ping(&h.router);

        assert!(h.dispatcher.shutdown(Duration::from_secs(1)).await);
        assert_eq!(
            h.dispatcher.handle_message(from_user("!ping")).await,
            DispatchOutcome::Ignored(IgnoreReason::ShuttingDown)
        );
        assert!(h.dispatcher.tracker().is_empty());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
