//! Key/value repository for persistent bookkeeping
//!
//! Values live in `storage.json` and are addressed by realm (one per archive),
//! section (one per component) and variable name. All values are strings;
//! typed access is layered on top.
//!
//! The file is replaced in one rename, so an interrupted run leaves either
//! the old or the new history behind. Empty sections and realms are dropped
//! when saving.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::ArchiveError;

type Section = BTreeMap<String, String>;
type Realm = BTreeMap<String, Section>;

/// Serializable storage file layout
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct StorageData {
    realms: BTreeMap<String, Realm>,
}

/// Repository for persistent key/value data
pub struct FileStorage {
    path: PathBuf,
    data: RwLock<BTreeMap<String, Realm>>,
}

impl FileStorage {
    /// Create a new storage repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Load stored values from disk
    ///
    /// A missing file is an empty storage.
    pub fn load(&self) -> Result<(), ArchiveError> {
        let file_data = if self.path.exists() {
            read_storage_file(&self.path)?
        } else {
            StorageData::default()
        };

        let mut data = self.data.write().map_err(|e| {
            ArchiveError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        *data = file_data.realms;
        Ok(())
    }

    /// Save stored values to disk
    pub fn save(&self) -> Result<(), ArchiveError> {
        let data = self.data.read().map_err(|e| {
            ArchiveError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let realms: BTreeMap<String, Realm> = data
            .iter()
            .map(|(name, realm)| {
                let sections: Realm = realm
                    .iter()
                    .filter(|(_, section)| !section.is_empty())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                (name.clone(), sections)
            })
            .filter(|(_, realm)| !realm.is_empty())
            .collect();

        replace_storage_file(&self.path, &StorageData { realms })
    }

    /// Get a stored value
    pub fn get(
        &self,
        realm: &str,
        section: &str,
        variable: &str,
    ) -> Result<Option<String>, ArchiveError> {
        let data = self.data.read().map_err(|e| {
            ArchiveError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data
            .get(realm)
            .and_then(|r| r.get(section))
            .and_then(|s| s.get(variable))
            .cloned())
    }

    /// Store a value, replacing any previous one
    pub fn set(
        &self,
        realm: &str,
        section: &str,
        variable: &str,
        value: impl ToString,
    ) -> Result<(), ArchiveError> {
        let mut data = self.data.write().map_err(|e| {
            ArchiveError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        data.entry(realm.to_string())
            .or_default()
            .entry(section.to_string())
            .or_default()
            .insert(variable.to_string(), value.to_string());
        Ok(())
    }

    /// Check whether a value is stored
    pub fn contains(
        &self,
        realm: &str,
        section: &str,
        variable: &str,
    ) -> Result<bool, ArchiveError> {
        Ok(self.get(realm, section, variable)?.is_some())
    }

    /// Remove a value, returning whether it existed
    pub fn remove(&self, realm: &str, section: &str, variable: &str) -> Result<bool, ArchiveError> {
        let mut data = self.data.write().map_err(|e| {
            ArchiveError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        Ok(data
            .get_mut(realm)
            .and_then(|r| r.get_mut(section))
            .map(|s| s.remove(variable).is_some())
            .unwrap_or(false))
    }

    /// Variables stored in one section
    pub fn section(&self, realm: &str, section: &str) -> Result<Section, ArchiveError> {
        let data = self.data.read().map_err(|e| {
            ArchiveError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data
            .get(realm)
            .and_then(|r| r.get(section))
            .cloned()
            .unwrap_or_default())
    }

    /// Remove a whole realm, returning whether it held anything
    pub fn remove_realm(&self, realm: &str) -> Result<bool, ArchiveError> {
        let mut data = self.data.write().map_err(|e| {
            ArchiveError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        Ok(data
            .remove(realm)
            .map(|r| r.values().any(|s| !s.is_empty()))
            .unwrap_or(false))
    }

    /// Names of all realms holding at least one value
    pub fn realms(&self) -> Result<Vec<String>, ArchiveError> {
        let data = self.data.read().map_err(|e| {
            ArchiveError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data
            .iter()
            .filter(|(_, r)| r.values().any(|s| !s.is_empty()))
            .map(|(name, _)| name.clone())
            .collect())
    }
}

fn read_storage_file(path: &Path) -> Result<StorageData, ArchiveError> {
    let file = File::open(path).map_err(|e| {
        ArchiveError::Storage(format!("Failed to open storage {}: {}", path.display(), e))
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        ArchiveError::Storage(format!("Storage {} is corrupt: {}", path.display(), e))
    })
}

/// Write `data` next to `path` and rename it over the old file
fn replace_storage_file(path: &Path, data: &StorageData) -> Result<(), ArchiveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ArchiveError::Storage(format!(
                "Unable to create storage directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let pending = path.with_extension("json.pending");
    let write = || -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(&pending)?);
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&pending, path)
    };

    write().map_err(|e| {
        if pending.exists() {
            if let Err(cleanup) = fs::remove_file(&pending) {
                tracing::warn!(path = %pending.display(), error = %cleanup, "unable to remove pending storage file");
            }
        }
        ArchiveError::Storage(format!("Unable to save storage {}: {}", path.display(), e))
    })
}
