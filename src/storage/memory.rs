//! In-memory storage backend.

use std::sync::Mutex;

use crate::common::errors::{SidekickError, SidekickResult};

use super::StateStorage;

/// Blob kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blob: Mutex<Option<String>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-filled with `blob`.
    #[must_use]
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    /// Copy of the current blob.
    #[must_use]
    pub fn snapshot(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|blob| blob.clone())
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self) -> SidekickResult<Option<String>> {
        let blob = self.blob.lock().map_err(|_| SidekickError::StoragePoisoned)?;
        Ok(blob.clone())
    }

    fn save(&self, blob: &str) -> SidekickResult<()> {
        let mut slot = self.blob.lock().map_err(|_| SidekickError::StoragePoisoned)?;
        *slot = Some(blob.to_string());
        Ok(())
    }
}
