//! Inbound event model.
//!
//! The messaging transport itself lives outside Ferrule. Whatever connects to
//! the platform converts its payloads into [`GatewayEvent`]s and hands them to
//! the runtime through an [`EventSource`]:
//!
//! ```text
//! ┌──────────────┐  GatewayEvent  ┌───────────┐  MessageEvent  ┌────────────┐
//! │  Transport   │───────────────▶│  Runtime  │───────────────▶│ Dispatcher │
//! │ (external)   │                │ event loop│                │            │
//! └──────────────┘                └───────────┘                └────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A platform user (human or automated account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Platform user id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// `true` for automated (non-human) accounts.
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Creates a human user.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// Creates an automated account.
    pub fn bot(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bot: true,
            ..Self::new(id, name)
        }
    }

    /// Returns the mention markup for this user, e.g. `<@1234>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

/// A message-received event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Platform message id.
    pub id: String,
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Guild (server) the channel belongs to; `None` for direct messages.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// The author.
    pub author: User,
    /// Raw text content.
    pub content: String,
    /// Users mentioned in the text.
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl MessageEvent {
    /// Creates a message with a random id and no guild, mentions or attachments.
    pub fn new(channel_id: impl Into<String>, author: User, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: channel_id.into(),
            guild_id: None,
            author,
            content: content.into(),
            mentions: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Sets the guild id (builder style).
    pub fn in_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// Adds a mentioned user (builder style).
    pub fn mentioning(mut self, user: User) -> Self {
        self.mentions.push(user);
        self
    }

    /// Returns `true` if `user_id` appears in the mention list.
    pub fn mentions_user(&self, user_id: &str) -> bool {
        self.mentions.iter().any(|u| u.id == user_id)
    }
}

/// Emitted once the transport has authenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// The identity the bot is connected as.
    pub user: User,
    /// Number of guilds the bot is serving.
    pub guild_count: usize,
}

/// Events delivered by an [`EventSource`].
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(ReadyEvent),
    MessageCreate(MessageEvent),
}

impl GatewayEvent {
    /// Returns a short name used in logs.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Ready(_) => "ready",
            Self::MessageCreate(_) => "message_create",
        }
    }
}

/// A sequential source of inbound events.
///
/// `next_event` returns `None` once the source is exhausted (connection closed
/// for good); the runtime then stops its event loop.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Option<GatewayEvent>;
}

#[async_trait]
impl EventSource for mpsc::Receiver<GatewayEvent> {
    async fn next_event(&mut self) -> Option<GatewayEvent> {
        self.recv().await
    }
}

#[async_trait]
impl EventSource for mpsc::UnboundedReceiver<GatewayEvent> {
    async fn next_event(&mut self) -> Option<GatewayEvent> {
        self.recv().await
    }
}
