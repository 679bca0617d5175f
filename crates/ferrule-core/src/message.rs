//! Outbound message content.
//!
//! Ferrule does not render rich formatting itself; it only carries the
//! structured content a session needs to post:
//! - [`Embed`]: a titled, colored block with optional fields
//! - [`Status`]: the four fixed status colors used by status replies

use serde::{Deserialize, Serialize};

// ============================================================================
// Status
// ============================================================================

/// Status kinds for colored notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Notify,
    Warning,
    Error,
    Success,
}

impl Status {
    /// The fixed display color of this status (`0xRRGGBB`).
    pub const fn color(self) -> u32 {
        match self {
            Self::Notify => 0x00ffff,
            Self::Warning => 0xffff00,
            Self::Error => 0xff0000,
            Self::Success => 0x00ff00,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Embed
// ============================================================================

/// A named field inside an [`Embed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Structured message content.
///
/// # Example
///
/// ```rust
/// use ferrule_core::{Embed, Status};
///
/// let embed = Embed::new()
///     .title("ping")
///     .description("Replies with pong")
///     .status(Status::Notify);
/// assert_eq!(embed.color, Some(0x00ffff));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a description-only embed colored for `status`.
    pub fn status_notice(status: Status, text: impl Into<String>) -> Self {
        Self::new().description(text).status(status)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets the color to the status color.
    pub fn status(self, status: Status) -> Self {
        self.color(status.color())
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Marks every field inline.
    pub fn inline_all_fields(mut self) -> Self {
        for field in &mut self.fields {
            field.inline = true;
        }
        self
    }
}

// ============================================================================
// Sent message receipt
// ============================================================================

/// What a session returns after posting a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: String,
    pub channel_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colors_are_distinct() {
        let colors = [
            Status::Notify.color(),
            Status::Warning.color(),
            Status::Error.color(),
            Status::Success.color(),
        ];
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(Status::Error.color(), 0xff0000);
    }

    #[test]
    fn test_embed_builder() {
        let embed = Embed::new()
            .title("help")
            .field("General", "ping", false)
            .field("Admin", "enable", false)
            .inline_all_fields();

        assert_eq!(embed.title.as_deref(), Some("help"));
        assert_eq!(embed.fields.len(), 2);
        assert!(embed.fields.iter().all(|f| f.inline));
    }

    #[test]
    fn test_embed_serialization_skips_empty() {
        let json = serde_json::to_value(Embed::status_notice(Status::Success, "ok")).unwrap();
        assert_eq!(json["description"], "ok");
        assert_eq!(json["color"], 0x00ff00);
        assert!(json.get("title").is_none());
        assert!(json.get("fields").is_none());
    }
}
