//! Personal notes kept in the store, one list per user.
//!
//! ```text
//! !notes              list your notes
//! !notes add <text>   save a note
//! !notes remove <n>   delete note number n
//! !notes clear        delete everything
//! ```
//!
//! Settings (`modules.settings.notes`):
//!
//! ```toml
//! [modules.settings.notes]
//! max_notes = 10
//! ```

use ferrule::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Store bucket holding note lists keyed by user id.
pub const NOTES_BUCKET: &str = "notes";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotesSettings {
    /// Most notes one user may keep.
    pub max_notes: usize,
}

impl Default for NotesSettings {
    fn default() -> Self {
        Self { max_notes: 10 }
    }
}

pub struct NotesModule;

impl Module for NotesModule {
    fn name(&self) -> &str {
        "notes"
    }

    fn build(&self, r: &mut Registrar) -> RouterResult<()> {
        let settings: NotesSettings = r.config_as().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid notes settings, using defaults");
            NotesSettings::default()
        });
        debug!(?settings, "Notes settings");

        let notes = r.subrouter("notes|note")?;
        notes.set("notes", "Personal notes. `notes add <text>`, `notes remove <n>`, `notes clear`", "");
        r.on_subrouter(&notes, list);

        let nested = r.nested(&notes);
        let max_notes = settings.max_notes;
        nested
            .on("add", move |ctx: DispatchContext| add(ctx, max_notes))?
            .describe("Saves a note");
        nested
            .on("list|ls", list)?
            .set("list", "Lists your notes", "");
        nested
            .on("remove|rm", remove)?
            .set("remove", "Deletes a note by number", "");
        nested.on("clear", clear)?.describe("Deletes all your notes");
        Ok(())
    }
}

fn log_send(result: ferrule::core::ApiResult<ferrule::core::SentMessage>) {
    if let Err(e) = result {
        warn!(error = %e, "Failed to send reply");
    }
}

/// Loads the author's notes. Store failures are reported to the user.
async fn load(ctx: &DispatchContext) -> Option<Vec<String>> {
    match ctx.store().get(NOTES_BUCKET, ctx.author_id()).await {
        Ok(Some(value)) => Some(serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(user = ctx.author_id(), error = %e, "Discarding malformed notes");
            Vec::new()
        })),
        Ok(None) => Some(Vec::new()),
        Err(e) => {
            warn!(user = ctx.author_id(), error = %e, "Failed to load notes");
            log_send(ctx.reply_error("Could not load your notes").await);
            None
        }
    }
}

async fn save(ctx: &DispatchContext, notes: &[String]) -> bool {
    let value = Value::from(notes.to_vec());
    match ctx.store().put(NOTES_BUCKET, ctx.author_id(), value).await {
        Ok(()) => true,
        Err(e) => {
            warn!(user = ctx.author_id(), error = %e, "Failed to save notes");
            log_send(ctx.reply_error("Could not save your notes").await);
            false
        }
    }
}

async fn list(ctx: DispatchContext) {
    let Some(notes) = load(&ctx).await else {
        return;
    };
    if notes.is_empty() {
        log_send(ctx.reply_notify("You have no notes").await);
        return;
    }

    let mut embed = Embed::new().title(format!("Notes of {}", ctx.message().author.name));
    for (i, note) in notes.iter().enumerate() {
        embed = embed.field(format!("{}", i + 1), note, false);
    }
    log_send(ctx.reply_embed(&embed.status(Status::Notify)).await);
}

async fn add(ctx: DispatchContext, max_notes: usize) {
    let text = ctx.args().after_n(0);
    if text.is_empty() {
        log_send(ctx.reply_error("Usage: notes add <text>").await);
        return;
    }
    let Some(mut notes) = load(&ctx).await else {
        return;
    };
    if notes.len() >= max_notes {
        log_send(ctx.reply_warning(format!("You already have {max_notes} notes")).await);
        return;
    }

    notes.push(text);
    if save(&ctx, &notes).await {
        log_send(ctx.reply_success(format!("Saved note {}", notes.len())).await);
    }
}

async fn remove(ctx: DispatchContext) {
    let Ok(n) = ctx.args().get(0).parse::<usize>() else {
        log_send(ctx.reply_error("Usage: notes remove <number>").await);
        return;
    };
    let Some(mut notes) = load(&ctx).await else {
        return;
    };
    if n == 0 || n > notes.len() {
        log_send(ctx.reply_error(format!("There is no note {n}")).await);
        return;
    }

    let removed = notes.remove(n - 1);
    if save(&ctx, &notes).await {
        log_send(ctx.reply_success(format!("Removed \"{removed}\"")).await);
    }
}

async fn clear(ctx: DispatchContext) {
    match ctx.store().delete(NOTES_BUCKET, ctx.author_id()).await {
        Ok(true) => log_send(ctx.reply_success("Notes cleared").await),
        Ok(false) => log_send(ctx.reply_notify("You have no notes").await),
        Err(e) => {
            warn!(user = ctx.author_id(), error = %e, "Failed to clear notes");
            log_send(ctx.reply_error("Could not clear your notes").await);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::TestBot;
    use ferrule::core::Outbound;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_list_remove() {
        let bot = TestBot::new(vec![Box::new(NotesModule)]);

        assert_eq!(bot.say("!notes").await, vec!["You have no notes"]);
        assert_eq!(bot.say("!notes add buy milk").await, vec!["Saved note 1"]);
        assert_eq!(bot.say("!note add \"call home\"").await, vec!["Saved note 2"]);

        bot.send("!notes ls").await;
        bot.settle().await;
        let sent = bot.session.take_sent();
        let Outbound::Embed { embed, .. } = &sent[0] else {
            panic!("expected an embed, got {sent:?}");
        };
        let values: Vec<_> = embed.fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, ["buy milk", "call home"]);

        assert_eq!(bot.say("!notes rm 1").await, vec!["Removed \"buy milk\""]);
        assert_eq!(bot.say("!notes rm 5").await, vec!["There is no note 5"]);
        assert_eq!(bot.say("!notes rm x").await, vec!["Usage: notes remove <number>"]);
        assert_eq!(bot.say("!notes clear").await, vec!["Notes cleared"]);
        assert_eq!(bot.say("!notes clear").await, vec!["You have no notes"]);
    }

    #[tokio::test]
    async fn test_max_notes_setting() {
        let bot = TestBot::with_settings(vec![Box::new(NotesModule)], json!({ "max_notes": 1 }));

        assert_eq!(bot.say("!notes add one").await, vec!["Saved note 1"]);
        assert_eq!(bot.say("!notes add two").await, vec!["You already have 1 notes"]);
    }

    #[tokio::test]
    async fn test_unknown_subcommand_lists() {
        let bot = TestBot::new(vec![Box::new(NotesModule)]);

        // No child matches, so the sub-router's own route answers.
        assert_eq!(bot.say("!notes frobnicate").await, vec!["You have no notes"]);
    }
}
