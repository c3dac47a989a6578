//! Test chat logs.

use std::sync::Mutex;

use async_trait::async_trait;
use narrator_core::chat::{ChatLog, ChatMessage};
use narrator_core::error::NarratorError;

/// A chat log that keeps every posted message for inspection.
#[derive(Debug, Default)]
pub struct RecordingChatLog {
    posted: Mutex<Vec<ChatMessage>>,
}

impl RecordingChatLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every posted message.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn posted(&self) -> Vec<ChatMessage> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatLog for RecordingChatLog {
    async fn post(&self, message: ChatMessage) -> Result<(), NarratorError> {
        self.posted.lock().unwrap().push(message);
        Ok(())
    }
}

/// A chat log that rejects every message. Useful for testing error paths.
#[derive(Debug)]
pub struct FailingChatLog;

#[async_trait]
impl ChatLog for FailingChatLog {
    async fn post(&self, _message: ChatMessage) -> Result<(), NarratorError> {
        Err(NarratorError::Persistence("chat log unavailable".into()))
    }
}
