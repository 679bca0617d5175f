//! Session trait and related types.
//!
//! This module defines the [`Session`] trait, the outbound half of the external
//! messaging transport: the identity the bot is connected as and the ability
//! to post messages to a channel.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ApiError, ApiResult};
use crate::event::User;
use crate::message::{Embed, SentMessage};

/// The outbound messaging capability.
///
/// Implementations wrap a platform connection. Every method is a direct call
/// into that connection; failures are returned to the caller as [`ApiError`]
/// and are never retried here.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Returns the identity the bot is connected as, once known.
    fn current_user(&self) -> Option<User>;

    /// Posts a plain text message to `channel_id`.
    async fn send_message(&self, channel_id: &str, content: &str) -> ApiResult<SentMessage>;

    /// Posts structured content to `channel_id`.
    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> ApiResult<SentMessage>;
}

/// A shared Session trait object.
pub type BoxedSession = Arc<dyn Session>;

// =============================================================================
// MemorySession
// =============================================================================

/// One message recorded by [`MemorySession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text { channel_id: String, content: String },
    Embed { channel_id: String, embed: Embed },
}

impl Outbound {
    pub fn channel_id(&self) -> &str {
        match self {
            Self::Text { channel_id, .. } | Self::Embed { channel_id, .. } => channel_id,
        }
    }

    /// The text content, or the embed description.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { content, .. } => Some(content),
            Self::Embed { embed, .. } => embed.description.as_deref(),
        }
    }
}

/// A session that keeps every outbound message in memory.
///
/// Useful for tests and offline runs. Sends fail with
/// [`ApiError::NotConnected`] after [`disconnect`](Self::disconnect).
#[derive(Debug)]
pub struct MemorySession {
    user: User,
    sent: Mutex<Vec<Outbound>>,
    connected: Mutex<bool>,
}

impl MemorySession {
    /// Creates a connected session identifying as `user`.
    pub fn new(user: User) -> Self {
        Self {
            user,
            sent: Mutex::new(Vec::new()),
            connected: Mutex::new(true),
        }
    }

    /// Returns a copy of everything sent so far.
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().clone()
    }

    /// Removes and returns everything sent so far.
    pub fn take_sent(&self) -> Vec<Outbound> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Makes all further sends fail.
    pub fn disconnect(&self) {
        *self.connected.lock() = false;
    }

    fn record(&self, outbound: Outbound) -> ApiResult<SentMessage> {
        if !*self.connected.lock() {
            return Err(ApiError::NotConnected);
        }
        let receipt = SentMessage {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: outbound.channel_id().to_string(),
        };
        self.sent.lock().push(outbound);
        Ok(receipt)
    }
}

#[async_trait]
impl Session for MemorySession {
    fn current_user(&self) -> Option<User> {
        Some(self.user.clone())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> ApiResult<SentMessage> {
        self.record(Outbound::Text {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        })
    }

    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> ApiResult<SentMessage> {
        self.record(Outbound::Embed {
            channel_id: channel_id.to_string(),
            embed: embed.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Status;

    #[tokio::test]
    async fn test_memory_session_records() {
        let session = MemorySession::new(User::bot("1", "ferrule"));
        session.send_message("c1", "hello").await.unwrap();
        session
            .send_embed("c2", &Embed::status_notice(Status::Error, "boom"))
            .await
            .unwrap();

        let sent = session.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].text(), Some("hello"));
        assert_eq!(sent[1].channel_id(), "c2");
        assert_eq!(sent[1].text(), Some("boom"));
    }

    #[tokio::test]
    async fn test_memory_session_disconnected() {
        let session = MemorySession::new(User::bot("1", "ferrule"));
        session.disconnect();
        let err = session.send_message("c1", "hello").await.unwrap_err();
        assert!(matches!(err, ApiError::NotConnected));
        assert!(session.sent().is_empty());
    }
}
