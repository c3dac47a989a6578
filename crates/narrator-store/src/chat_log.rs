//! In-process chat log.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use narrator_core::chat::{ChatLog, ChatMessage};
use narrator_core::error::NarratorError;
use tokio::sync::broadcast;
use tracing::debug;

/// Chat log kept in memory, with a live feed for attached clients.
#[derive(Debug)]
pub struct InMemoryChatLog {
    messages: Mutex<Vec<ChatMessage>>,
    feed: broadcast::Sender<ChatMessage>,
}

impl Default for InMemoryChatLog {
    fn default() -> Self {
        let (feed, _) = broadcast::channel(crate::register::CHANGE_CHANNEL_CAPACITY);
        Self {
            messages: Mutex::new(Vec::new()),
            feed,
        }
    }
}

impl InMemoryChatLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message posted so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subscribes to messages posted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChatMessage> {
        self.feed.subscribe()
    }
}

#[async_trait]
impl ChatLog for InMemoryChatLog {
    async fn post(&self, message: ChatMessage) -> Result<(), NarratorError> {
        debug!(message_id = %message.id, kind = ?message.kind, "chat message posted");
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        let _ = self.feed.send(message);
        Ok(())
    }
}
