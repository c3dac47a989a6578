//! Chat command boundary.

use narrator_core::chat::MessageKind;
use narrator_core::error::NarratorError;
use narrator_core::role::Role;
use tracing::{debug, instrument};

use crate::application::publisher::Publisher;
use crate::domain::commands::parse_chat_command;
use crate::domain::message::PublishOptions;

/// What became of a chat submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatDisposition {
    /// The submission was a narrator command and has been published in
    /// its place. The original chat line must be suppressed.
    Consumed {
        /// The kind the command published.
        kind: MessageKind,
    },
    /// Not a narrator command, or not from the narrator. Post it as is.
    Passthrough,
}

/// Intercepts chat submissions and turns narrator commands into publishes.
#[derive(Debug, Clone)]
pub struct ChatHook {
    publisher: Publisher,
}

impl ChatHook {
    /// Creates a hook publishing through `publisher`.
    #[must_use]
    pub fn new(publisher: Publisher) -> Self {
        Self { publisher }
    }

    /// Handles one chat submission. A narration started this way runs on
    /// its own; nobody waits for its close.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Publisher::publish`].
    #[instrument(skip(self, content, options))]
    pub async fn handle(
        &self,
        role: Role,
        content: &str,
        options: &PublishOptions,
    ) -> Result<ChatDisposition, NarratorError> {
        if !role.is_privileged() {
            return Ok(ChatDisposition::Passthrough);
        }
        let Some(command) = parse_chat_command(content) else {
            return Ok(ChatDisposition::Passthrough);
        };

        debug!(kind = ?command.kind, "chat command recognised");
        self.publisher
            .publish(role, command.kind, &command.text, options)
            .await?;
        Ok(ChatDisposition::Consumed { kind: command.kind })
    }
}
