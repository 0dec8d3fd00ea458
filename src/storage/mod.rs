//! Durable storage for the session state record.
//!
//! The store only ever sees one opaque blob. Backends decide where it lives:
//! - `memory`: process memory, for tests and throwaway sessions
//! - `file`: a JSON file replaced atomically on every save
//! - `sqlite`: a named row in a `SQLite` table

pub mod file;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use crate::common::config::{StorageConfig, StorageKind};
use crate::common::errors::SidekickResult;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Read/write capability for a single opaque blob.
pub trait StateStorage: Send + Sync {
    /// Read the blob, or `None` if nothing was ever saved.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn load(&self) -> SidekickResult<Option<String>>;

    /// Replace the blob as one unit.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written.
    fn save(&self, blob: &str) -> SidekickResult<()>;
}

impl<T: StateStorage + ?Sized> StateStorage for Arc<T> {
    fn load(&self) -> SidekickResult<Option<String>> {
        (**self).load()
    }

    fn save(&self, blob: &str) -> SidekickResult<()> {
        (**self).save(blob)
    }
}

impl<T: StateStorage + ?Sized> StateStorage for Box<T> {
    fn load(&self) -> SidekickResult<Option<String>> {
        (**self).load()
    }

    fn save(&self, blob: &str) -> SidekickResult<()> {
        (**self).save(blob)
    }
}

/// Open the backend selected by `config`.
///
/// # Errors
/// Returns an error if the backend cannot be opened.
pub fn open_storage(config: &StorageConfig) -> SidekickResult<Box<dyn StateStorage>> {
    let storage: Box<dyn StateStorage> = match config.kind {
        StorageKind::File => Box::new(FileStorage::new(&config.path)),
        StorageKind::Sqlite => Box::new(SqliteStorage::open(&config.path, &config.record_key)?),
        StorageKind::Memory => Box::new(MemoryStorage::new()),
    };
    tracing::debug!(kind = ?config.kind, path = %config.path.display(), "opened state storage");
    Ok(storage)
}
