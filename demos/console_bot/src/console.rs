//! Terminal transport: stdin lines in, stdout replies out.

use std::io::BufRead;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use ferrule::core::{
    ApiError, ApiResult, Embed, GatewayEvent, MessageEvent, ReadyEvent, SentMessage, Session, User,
};
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

/// The single channel the console talks in.
pub const CONSOLE_CHANNEL: &str = "console";

/// A [`Session`] that prints every reply to stdout.
pub struct ConsoleSession {
    user: User,
    stdout: Mutex<Stdout>,
    next_id: AtomicU64,
}

impl ConsoleSession {
    pub fn new(user: User) -> Self {
        Self {
            user,
            stdout: Mutex::new(tokio::io::stdout()),
            next_id: AtomicU64::new(1),
        }
    }

    async fn print(&self, channel_id: &str, text: &str) -> ApiResult<SentMessage> {
        let line = format!("[{channel_id}] {}: {text}\n", self.user.name);
        let mut stdout = self.stdout.lock().await;
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ApiError::SendFailed(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| ApiError::SendFailed(e.to_string()))?;

        Ok(SentMessage {
            id: self.next_id.fetch_add(1, Ordering::Relaxed).to_string(),
            channel_id: channel_id.to_string(),
        })
    }
}

#[async_trait]
impl Session for ConsoleSession {
    fn current_user(&self) -> Option<User> {
        Some(self.user.clone())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> ApiResult<SentMessage> {
        self.print(channel_id, content).await
    }

    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> ApiResult<SentMessage> {
        self.print(channel_id, &render_embed(embed)).await
    }
}

/// Flattens an embed into plain lines.
pub fn render_embed(embed: &Embed) -> String {
    let mut lines = Vec::new();
    if let Some(title) = &embed.title {
        lines.push(format!("== {title} =="));
    }
    if let Some(description) = &embed.description {
        lines.push(description.clone());
    }
    for field in &embed.fields {
        lines.push(format!("{}: {}", field.name, field.value));
    }
    if let Some(footer) = &embed.footer {
        lines.push(format!("-- {footer}"));
    }
    lines.join("\n")
}

/// Builds the message event for one console line.
///
/// A line opening with the bot's mention also lists the bot as mentioned.
pub fn console_message(bot: &User, author: &User, guild_id: Option<&str>, line: &str) -> MessageEvent {
    let mut message = MessageEvent::new(CONSOLE_CHANNEL, author.clone(), line);
    if let Some(guild_id) = guild_id {
        message = message.in_guild(guild_id);
    }
    if line.starts_with(&bot.mention()) {
        message = message.mentioning(bot.clone());
    }
    message
}

/// Spawns a reader turning stdin lines into gateway events.
///
/// A `Ready` event comes first. The channel closes on end of input. The
/// reader is a plain thread, so a pending read never keeps the runtime alive
/// after shutdown.
pub fn stdin_events(bot: User, author: User, guild_id: Option<String>) -> mpsc::Receiver<GatewayEvent> {
    let (tx, rx) = mpsc::channel(32);

    std::thread::spawn(move || {
        let ready = ReadyEvent {
            user: bot.clone(),
            guild_count: usize::from(guild_id.is_some()),
        };
        if tx.blocking_send(GatewayEvent::Ready(ready)).is_err() {
            return;
        }

        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to read from stdin");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let message = console_message(&bot, &author, guild_id.as_deref(), &line);
            if tx.blocking_send(GatewayEvent::MessageCreate(message)).is_err() {
                break;
            }
        }
        debug!("Console input closed");
    });

    rx
}
