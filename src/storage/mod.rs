//! Storage layer for autoarch
//!
//! Provides the persistent key/value store backed by a JSON file with atomic
//! writes, and the typed backup history kept in it.

pub mod history;
pub mod store;

pub use history::HistoryStore;
pub use store::FileStorage;

use crate::config::paths::AppPaths;
use crate::error::ArchiveError;

/// Open and load the storage file of the user configuration directory
pub fn open_storage(paths: &AppPaths) -> Result<FileStorage, ArchiveError> {
    paths.ensure_directories()?;
    let storage = FileStorage::new(paths.storage_file());
    storage.load()?;
    Ok(storage)
}
