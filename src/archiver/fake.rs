//! In-memory archiver for tests
//!
//! Writes small placeholder files and keeps level bookkeeping the way a
//! snapshot based archiver does: creating level `n` makes `n + 1` the next
//! level, removing increments from `n` makes `n` the next level.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use super::{check_backup_request, Archiver, ArchiverEvent, BackupDefinition, EventCallback};
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{ArchiverFeature, BackupType};

#[derive(Debug, Default)]
pub struct FakeArchiver {
    incremental: bool,
    next_levels: RefCell<BTreeMap<String, u32>>,
    sizes_by_level: RefCell<BTreeMap<u32, u64>>,
    events: RefCell<Vec<ArchiverEvent>>,
    failure: RefCell<Option<String>>,
    created: RefCell<Vec<(Option<u32>, Option<u8>)>>,
    removed_from: RefCell<Vec<u32>>,
}

impl FakeArchiver {
    pub fn new() -> Self {
        Self {
            incremental: true,
            ..Default::default()
        }
    }

    pub fn without_incremental() -> Self {
        Self::default()
    }

    /// Size of the file written for `level`; 10 bytes when not set
    pub fn set_size(&self, level: u32, size: u64) {
        self.sizes_by_level.borrow_mut().insert(level, size);
    }

    /// Events emitted during the next backups
    pub fn emit(&self, event: ArchiverEvent) {
        self.events.borrow_mut().push(event);
    }

    /// Make backups fail with `BackupFailed(message)`
    pub fn fail_with(&self, message: &str) {
        *self.failure.borrow_mut() = Some(message.to_string());
    }

    pub fn set_next_level(&self, backup_id: &str, level: u32) {
        self.next_levels
            .borrow_mut()
            .insert(backup_id.to_string(), level);
    }

    /// `(level, compression)` of every backup created
    pub fn created(&self) -> Vec<(Option<u32>, Option<u8>)> {
        self.created.borrow().clone()
    }

    pub fn removed_from(&self) -> Vec<u32> {
        self.removed_from.borrow().clone()
    }

    fn write_backup(
        &self,
        definition: &BackupDefinition,
        level: Option<u32>,
        on_event: EventCallback<'_>,
    ) -> ArchiveResult<PathBuf> {
        if let Some(message) = self.failure.borrow().as_ref() {
            return Err(ArchiveError::BackupFailed(message.clone()));
        }

        for event in self.events.borrow().iter() {
            on_event(event);
        }
        for file in &definition.include_files {
            on_event(&ArchiverEvent::FileAdded(file.clone()));
        }

        let size = self
            .sizes_by_level
            .borrow()
            .get(&level.unwrap_or(0))
            .copied()
            .unwrap_or(10);

        let path = definition.backup_file_path(level);
        fs::create_dir_all(&definition.destination)?;
        fs::write(&path, vec![b'x'; size as usize])?;
        Ok(path)
    }
}

impl Archiver for FakeArchiver {
    fn supported_backup_types(&self) -> BTreeSet<BackupType> {
        [BackupType::Tar, BackupType::TarGz, BackupType::TarBz2, BackupType::TarXz]
            .into_iter()
            .collect()
    }

    fn supported_features(&self, backup_type: Option<BackupType>) -> BTreeSet<ArchiverFeature> {
        let mut features = BTreeSet::new();
        if backup_type != Some(BackupType::Tar) {
            features.insert(ArchiverFeature::CompressionStrength);
        }
        if self.incremental {
            features.insert(ArchiverFeature::Incremental);
        }
        features
    }

    fn backup_files(
        &self,
        definition: &BackupDefinition,
        compression_level: Option<u8>,
        on_event: EventCallback<'_>,
    ) -> ArchiveResult<PathBuf> {
        check_backup_request(self, definition, compression_level, false)?;
        let path = self.write_backup(definition, None, on_event)?;
        self.created.borrow_mut().push((None, compression_level));
        Ok(path)
    }

    fn backup_files_incrementally(
        &self,
        definition: &BackupDefinition,
        compression_level: Option<u8>,
        level: Option<u32>,
        on_event: EventCallback<'_>,
    ) -> ArchiveResult<PathBuf> {
        check_backup_request(self, definition, compression_level, true)?;
        let max = self.max_backup_level(&definition.backup_id)?;
        let level = level.unwrap_or(max);
        if level > max {
            return Err(ArchiveError::Config(format!(
                "Level {} is above the maximal level {}",
                level, max
            )));
        }

        let path = self.write_backup(definition, Some(level), on_event)?;
        self.set_next_level(&definition.backup_id, level + 1);
        self.created.borrow_mut().push((Some(level), compression_level));
        Ok(path)
    }

    fn remove_backup_increments(
        &self,
        definition: &BackupDefinition,
        from_level: u32,
    ) -> ArchiveResult<()> {
        let max = self.max_backup_level(&definition.backup_id)?;
        let mut level = from_level;
        loop {
            let path = definition.backup_file_path(Some(level));
            if !path.exists() {
                break;
            }
            fs::remove_file(path)?;
            level += 1;
        }
        if max > from_level {
            self.set_next_level(&definition.backup_id, from_level);
        }
        self.removed_from.borrow_mut().push(from_level);
        Ok(())
    }

    fn max_backup_level(&self, backup_id: &str) -> ArchiveResult<u32> {
        Ok(self
            .next_levels
            .borrow()
            .get(backup_id)
            .copied()
            .unwrap_or(0))
    }

    fn stored_backup_ids(&self) -> ArchiveResult<BTreeSet<String>> {
        Ok(self
            .next_levels
            .borrow()
            .iter()
            .filter(|(_, level)| **level > 0)
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn purge_stored_backup_data(&self, backup_id: &str) -> ArchiveResult<()> {
        self.next_levels.borrow_mut().remove(backup_id);
        Ok(())
    }
}
