//! Shared chat log port.
//!
//! Every published message, whatever its kind, is also recorded in the
//! world's chat log. The log itself is an external collaborator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NarratorError;

/// The kinds of message the narrator can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Shown on the overlay with the full reveal / scroll / close cycle.
    Narration,
    /// Chat-only scene description.
    Description,
    /// Chat-only notification.
    Notification,
}

impl MessageKind {
    /// CSS class tagging the chat span for this kind.
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Narration => "narration",
            Self::Description => "description",
            Self::Notification => "note",
        }
    }
}

/// A message posted to the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: Uuid,
    /// What kind of narrator message this is.
    pub kind: MessageKind,
    /// Rendered chat content.
    pub content: String,
    /// Speaker alias shown in the log.
    pub speaker: String,
    /// Scene the speaker was viewing, if known.
    pub scene: Option<String>,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

/// Append-only world chat log.
#[async_trait]
pub trait ChatLog: Send + Sync {
    /// Posts a message to every client's chat.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Persistence` if the log rejects the message.
    async fn post(&self, message: ChatMessage) -> Result<(), NarratorError>;
}

/// Abstraction over wall-clock time, used to stamp chat messages.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
