//! # Ferrule Core
//!
//! Foundation types for the Ferrule chat-bot framework.
//!
//! This crate holds everything the command engine needs to talk to the outside
//! world without knowing how that world is connected:
//!
//! - **Event Model**: inbound events and the [`EventSource`] the runtime reads
//!   them from ([`GatewayEvent`], [`MessageEvent`], [`User`])
//! - **Session**: the outbound send capability ([`Session`]) and an in-memory
//!   recording implementation ([`MemorySession`])
//! - **Message Content**: [`Embed`] and the fixed [`Status`] colors
//! - **Store**: the bucket/key/value collaborator ([`Store`]) used for
//!   per-guild settings
//!
//! ## Collaborators
//!
//! ```text
//! ┌──────────────┐                          ┌──────────────┐
//! │ EventSource  │──▶ runtime ─▶ framework ─▶│   Session    │
//! └──────────────┘                  │       └──────────────┘
//!                                   ▼
//!                             ┌──────────┐
//!                             │  Store   │
//!                             └──────────┘
//! ```

pub mod error;
pub mod event;
pub mod message;
pub mod session;
pub mod store;

pub use error::{ApiError, ApiResult, StoreError, StoreResult};
pub use event::{Attachment, EventSource, GatewayEvent, MessageEvent, ReadyEvent, User};
pub use message::{Embed, EmbedField, SentMessage, Status};
pub use session::{BoxedSession, MemorySession, Outbound, Session};
pub use store::{
    BoxedStore, GUILDS_BUCKET, GuildSettings, JsonFileStore, MemoryStore, Store,
    load_guild_settings, save_guild_settings,
};
