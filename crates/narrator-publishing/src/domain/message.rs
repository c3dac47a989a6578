//! Message text handling.

/// Speaker alias used when a publish does not name one.
pub const DEFAULT_SPEAKER: &str = "Narrator";

/// Per-publish chat options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    /// Alias shown as the chat speaker.
    pub speaker: String,
    /// Scene the narrator is viewing, if any.
    pub scene: Option<String>,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            speaker: DEFAULT_SPEAKER.to_owned(),
            scene: None,
        }
    }
}

impl PublishOptions {
    /// Overrides the speaker alias.
    #[must_use]
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = speaker.into();
        self
    }

    /// Sets the scene.
    #[must_use]
    pub fn with_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = Some(scene.into());
        self
    }
}

/// Turns the escaped line breaks chat users type (a literal `\n` or a
/// `<br>` tag) into real newlines.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.replace("\\n", "\n").replace("<br>", "\n")
}

/// Wraps `message` in the span the chat log styles by `class`.
#[must_use]
pub fn chat_content(class: &str, message: &str) -> String {
    format!(r#"<span class="narrator-span {class}">{message}</span>"#)
}
