//! Per-invocation execution context.
//!
//! Two types model how one command invocation sees the world:
//!
//! - [`Services`]: the **shared** collaborators of a dispatcher (session,
//!   router, store, settings). One `Arc<Services>` is created per dispatcher
//!   and cloned into every context.
//!
//! - [`DispatchContext`]: **owned** by one invocation. It binds the
//!   originating message, the tokenized [`Args`], the matched [`Route`] and a
//!   scratch bag that middleware uses to hand computed values to the handler.
//!   Because the context is owned by its task, the scratch bag needs no
//!   synchronization.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::warn;

use ferrule_core::{
    ApiResult, BoxedSession, BoxedStore, Embed, GuildSettings, MessageEvent, SentMessage, Status,
    load_guild_settings,
};

use crate::args::Args;
use crate::dispatcher::DispatcherConfig;
use crate::route::Route;
use crate::router::Router;

/// Scratch key under which guild settings are cached for one invocation.
pub const GUILD_SETTINGS_KEY: &str = "guild_settings";

/// Capacity of the inbound message broadcast used by follow-up waits.
const INBOUND_CAPACITY: usize = 256;

// =============================================================================
// Services: shared, one per dispatcher
// =============================================================================

/// Collaborators shared by every invocation of one dispatcher.
pub struct Services {
    pub session: BoxedSession,
    pub router: Arc<Router>,
    pub store: BoxedStore,
    pub config: DispatcherConfig,
    inbound: broadcast::Sender<Arc<MessageEvent>>,
}

impl Services {
    pub fn new(
        session: BoxedSession,
        router: Arc<Router>,
        store: BoxedStore,
        config: DispatcherConfig,
    ) -> Self {
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        Self {
            session,
            router,
            store,
            config,
            inbound,
        }
    }

    /// Feeds a message to every pending [`DispatchContext::await_reply`].
    pub(crate) fn publish(&self, message: Arc<MessageEvent>) {
        // No receivers simply means nobody is waiting.
        let _ = self.inbound.send(message);
    }

    pub(crate) fn waiting(&self) -> usize {
        self.inbound.receiver_count()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .field("routes", &self.router.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// DispatchContext: owned, one per invocation
// =============================================================================

/// Everything a handler receives for one invocation.
pub struct DispatchContext {
    message: Arc<MessageEvent>,
    args: Args,
    route: Option<Arc<Route>>,
    prefix: String,
    scratch: HashMap<String, Box<dyn Any + Send + Sync>>,
    services: Arc<Services>,
}

impl DispatchContext {
    /// Creates a context. `prefix` is the text that addressed the bot.
    pub fn new(
        message: Arc<MessageEvent>,
        args: Args,
        route: Option<Arc<Route>>,
        prefix: impl Into<String>,
        services: Arc<Services>,
    ) -> Self {
        Self {
            message,
            args,
            route,
            prefix: prefix.into(),
            scratch: HashMap::new(),
            services,
        }
    }

    pub fn message(&self) -> &MessageEvent {
        &self.message
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    /// The matched route, if the context was built from a match.
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    /// The prefix or mention that addressed the bot.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn channel_id(&self) -> &str {
        &self.message.channel_id
    }

    pub fn author_id(&self) -> &str {
        &self.message.author.id
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.message.guild_id.as_deref()
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.services.router
    }

    pub fn store(&self) -> &BoxedStore {
        &self.services.store
    }

    pub fn session(&self) -> &BoxedSession {
        &self.services.session
    }

    // ─── Scratch bag ────────────────────────────────────────────────────

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.scratch.insert(key.into(), Box::new(value));
    }

    /// Borrows the value under `key` if it has type `T`.
    pub fn get_ref<T: Any>(&self, key: &str) -> Option<&T> {
        self.scratch.get(key)?.downcast_ref::<T>()
    }

    /// Clones the value under `key` if it has type `T`.
    pub fn get<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.get_ref::<T>(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.scratch.contains_key(key)
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.scratch.remove(key).is_some()
    }

    // ─── Reply helpers ──────────────────────────────────────────────────

    /// Sends text to the originating channel.
    pub async fn reply(&self, text: impl Display) -> ApiResult<SentMessage> {
        self.services
            .session
            .send_message(self.channel_id(), &text.to_string())
            .await
    }

    /// Sends a status-colored notice to the originating channel.
    pub async fn reply_status(&self, status: Status, text: impl Display) -> ApiResult<SentMessage> {
        self.send_status(self.channel_id(), status, text).await
    }

    /// Sends structured content to the originating channel.
    pub async fn reply_embed(&self, embed: &Embed) -> ApiResult<SentMessage> {
        self.services
            .session
            .send_embed(self.channel_id(), embed)
            .await
    }

    pub async fn reply_error(&self, text: impl Display) -> ApiResult<SentMessage> {
        self.reply_status(Status::Error, text).await
    }

    pub async fn reply_notify(&self, text: impl Display) -> ApiResult<SentMessage> {
        self.reply_status(Status::Notify, text).await
    }

    pub async fn reply_warning(&self, text: impl Display) -> ApiResult<SentMessage> {
        self.reply_status(Status::Warning, text).await
    }

    pub async fn reply_success(&self, text: impl Display) -> ApiResult<SentMessage> {
        self.reply_status(Status::Success, text).await
    }

    /// Sends a status-colored notice to another channel.
    pub async fn send_status(
        &self,
        channel_id: &str,
        status: Status,
        text: impl Display,
    ) -> ApiResult<SentMessage> {
        let embed = Embed::status_notice(status, text.to_string());
        self.services.session.send_embed(channel_id, &embed).await
    }

    // ─── Access ─────────────────────────────────────────────────────────

    /// Returns `true` if the author is a global admin or a guild admin.
    ///
    /// Guild settings are read from the scratch bag when a middleware cached
    /// them under [`GUILD_SETTINGS_KEY`], otherwise from the store. Store
    /// failures count as "not an admin".
    pub async fn is_admin(&self) -> bool {
        let author = self.author_id();
        if self.services.config.admins.iter().any(|a| a == author) {
            return true;
        }

        if let Some(settings) = self.get_ref::<GuildSettings>(GUILD_SETTINGS_KEY) {
            return settings.is_admin(author);
        }

        let Some(guild_id) = self.guild_id() else {
            return false;
        };
        match load_guild_settings(self.services.store.as_ref(), guild_id).await {
            Ok(settings) => settings.is_some_and(|s| s.is_admin(author)),
            Err(e) => {
                warn!(guild_id, error = %e, "Failed to load guild settings");
                false
            }
        }
    }

    // ─── Follow-up input ────────────────────────────────────────────────

    /// Waits for the next message from the same author in the same channel.
    ///
    /// Returns `None` when `timeout` elapses first. Only messages that arrive
    /// after this call are considered.
    pub async fn await_reply(&self, timeout: Duration) -> Option<Arc<MessageEvent>> {
        let mut rx = self.services.inbound.subscribe();
        let original = Arc::clone(&self.message);

        let wait = async move {
            loop {
                match rx.recv().await {
                    Ok(msg)
                        if msg.author.id == original.author.id
                            && msg.channel_id == original.channel_id
                            && msg.id != original.id =>
                    {
                        return Some(msg);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Follow-up wait lagged behind inbound messages");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        };

        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("message_id", &self.message.id)
            .field("channel_id", &self.message.channel_id)
            .field("route", &self.route.as_ref().map(|r| r.name()))
            .field("args", &self.args)
            .field("scratch_keys", &self.scratch.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrule_core::{MemorySession, MemoryStore, Outbound, User, save_guild_settings};

    fn services(session: Arc<MemorySession>, store: Arc<MemoryStore>) -> Arc<Services> {
        let config = DispatcherConfig {
            admins: vec!["root".into()],
            ..DispatcherConfig::default()
        };
        Arc::new(Services::new(session, Arc::new(Router::new()), store, config))
    }

    fn context(services: Arc<Services>, author: &str) -> DispatchContext {
        let message = MessageEvent::new("c1", User::new(author, author), "!cmd a b").in_guild("g1");
        DispatchContext::new(Arc::new(message), Args::parse("a b"), None, "!", services)
    }

    #[tokio::test]
    async fn test_scratch_bag() {
        let session = Arc::new(MemorySession::new(User::bot("bot", "ferrule")));
        let mut ctx = context(services(session, Arc::new(MemoryStore::new())), "u1");

        ctx.set("count", 3usize);
        assert_eq!(ctx.get::<usize>("count"), Some(3));
        assert_eq!(ctx.get::<String>("count"), None);
        assert!(ctx.contains("count"));
        assert!(ctx.remove("count"));
        assert!(!ctx.contains("count"));
        assert_eq!(ctx.get_ref::<usize>("missing"), None);
    }

    #[tokio::test]
    async fn test_reply_helpers_use_origin_channel() {
        let session = Arc::new(MemorySession::new(User::bot("bot", "ferrule")));
        let ctx = context(services(Arc::clone(&session), Arc::new(MemoryStore::new())), "u1");

        ctx.reply("pong").await.unwrap();
        ctx.reply_error("boom").await.unwrap();
        ctx.send_status("c2", Status::Success, "done").await.unwrap();

        let sent = session.take_sent();
        assert_eq!(sent[0], Outbound::Text { channel_id: "c1".into(), content: "pong".into() });
        match &sent[1] {
            Outbound::Embed { channel_id, embed } => {
                assert_eq!(channel_id, "c1");
                assert_eq!(embed.color, Some(Status::Error.color()));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(sent[2].channel_id(), "c2");
    }

    #[tokio::test]
    async fn test_reply_failure_is_returned() {
        let session = Arc::new(MemorySession::new(User::bot("bot", "ferrule")));
        session.disconnect();
        let ctx = context(services(session, Arc::new(MemoryStore::new())), "u1");
        assert!(ctx.reply("pong").await.is_err());
    }

    #[tokio::test]
    async fn test_is_admin_sources() {
        let session = Arc::new(MemorySession::new(User::bot("bot", "ferrule")));
        let store = Arc::new(MemoryStore::new());
        let services = services(session, Arc::clone(&store));

        assert!(context(Arc::clone(&services), "root").is_admin().await);
        assert!(!context(Arc::clone(&services), "u1").is_admin().await);

        let settings = GuildSettings {
            prefix: None,
            admins: vec!["u1".into()],
        };
        save_guild_settings(store.as_ref(), "g1", &settings).await.unwrap();
        assert!(context(Arc::clone(&services), "u1").is_admin().await);

        // Cached settings take precedence over the store.
        let mut ctx = context(services, "u1");
        ctx.set(GUILD_SETTINGS_KEY, GuildSettings::default());
        assert!(!ctx.is_admin().await);
    }

    #[tokio::test]
    async fn test_await_reply_matches_author_and_channel() {
        let session = Arc::new(MemorySession::new(User::bot("bot", "ferrule")));
        let services = services(session, Arc::new(MemoryStore::new()));
        let ctx = context(Arc::clone(&services), "u1");

        let waiter = tokio::spawn(async move { ctx.await_reply(Duration::from_secs(5)).await });
        while services.waiting() == 0 {
            tokio::task::yield_now().await;
        }

        let other_author = MessageEvent::new("c1", User::new("u2", "u2"), "no");
        let other_channel = MessageEvent::new("c9", User::new("u1", "u1"), "no");
        let answer = MessageEvent::new("c1", User::new("u1", "u1"), "yes");
        services.publish(Arc::new(other_author));
        services.publish(Arc::new(other_channel));
        services.publish(Arc::new(answer));

        let reply = waiter.await.unwrap().unwrap();
        assert_eq!(reply.content, "yes");
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_reply_times_out() {
        let session = Arc::new(MemorySession::new(User::bot("bot", "ferrule")));
        let ctx = context(services(session, Arc::new(MemoryStore::new())), "u1");
        assert!(ctx.await_reply(Duration::from_secs(30)).await.is_none());
    }
}
