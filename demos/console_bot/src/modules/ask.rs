//! `ask`: a two-step conversation using follow-up input.

use std::time::Duration;

use ferrule::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AskSettings {
    /// How long to wait for the answer.
    pub timeout_secs: u64,
}

impl Default for AskSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

pub struct AskModule;

impl Module for AskModule {
    fn name(&self) -> &str {
        "ask"
    }

    fn build(&self, r: &mut Registrar) -> RouterResult<()> {
        let settings: AskSettings = r.config_as().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid ask settings, using defaults");
            AskSettings::default()
        });
        let timeout = Duration::from_secs(settings.timeout_secs);

        r.on("ask", move |ctx: DispatchContext| ask(ctx, timeout))?
            .describe("Asks for your favourite colour and waits for the answer");
        Ok(())
    }
}

async fn ask(ctx: DispatchContext, timeout: Duration) {
    if let Err(e) = ctx.reply("What is your favourite colour?").await {
        warn!(error = %e, "Failed to send question");
        return;
    }

    let answer = match ctx.await_reply(timeout).await {
        Some(reply) => {
            info!(user = ctx.author_id(), answer = %reply.content, "Question answered");
            format!("{} is a fine colour", reply.content.trim())
        }
        None => "No response received".to_string(),
    };
    if let Err(e) = ctx.reply(answer).await {
        warn!(error = %e, "Failed to send reply");
    }
}
