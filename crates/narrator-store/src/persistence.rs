//! `StatePersistence` backends.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use narrator_core::error::NarratorError;
use narrator_core::state::SharedState;
use narrator_core::store::StatePersistence;

/// Keeps the last saved state in memory only.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    saved: Mutex<Option<SharedState>>,
}

impl MemoryPersistence {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatePersistence for MemoryPersistence {
    async fn load(&self) -> Result<Option<SharedState>, NarratorError> {
        Ok(self
            .saved
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    async fn save(&self, state: &SharedState) -> Result<(), NarratorError> {
        *self
            .saved
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(state.clone());
        Ok(())
    }
}

/// Saves the world's shared state as a JSON document.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash never leaves a half-written document behind.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    /// Creates a backend writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this backend reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StatePersistence for JsonFilePersistence {
    async fn load(&self) -> Result<Option<SharedState>, NarratorError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(NarratorError::Persistence(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            NarratorError::Persistence(format!("malformed state in {}: {e}", self.path.display()))
        })
    }

    async fn save(&self, state: &SharedState) -> Result<(), NarratorError> {
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| NarratorError::Persistence(format!("state serialization failed: {e}")))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| NarratorError::Persistence(format!("failed to create {}: {e}", parent.display())))?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| NarratorError::Persistence(format!("failed to write {}: {e}", temp.display())))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| NarratorError::Persistence(format!("failed to replace {}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrator_core::state::NarrationRecord;

    fn sample_state() -> SharedState {
        SharedState {
            narration: NarrationRecord {
                id: 12,
                display: true,
                message: "The gates creak open.".to_owned(),
                paused: false,
            },
            scenery: true,
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path().join("state.json"));

        let loaded = persistence.load().await.unwrap();

        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_saved_state_is_loaded_back() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path().join("world").join("state.json"));

        // Act
        persistence.save(&sample_state()).await.unwrap();
        let loaded = persistence.load().await.unwrap();

        // Assert
        assert_eq!(loaded, Some(sample_state()));
        assert!(!persistence.temp_path().exists());
    }

    #[tokio::test]
    async fn test_malformed_file_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let persistence = JsonFilePersistence::new(&path);

        let result = persistence.load().await;

        assert!(matches!(result, Err(NarratorError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_memory_persistence_keeps_last_save() {
        let persistence = MemoryPersistence::new();
        assert!(persistence.load().await.unwrap().is_none());

        persistence.save(&SharedState::default()).await.unwrap();
        persistence.save(&sample_state()).await.unwrap();

        assert_eq!(persistence.load().await.unwrap(), Some(sample_state()));
    }
}
