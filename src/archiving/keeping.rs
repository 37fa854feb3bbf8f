//! Keeping old backups
//!
//! A backup about to be replaced is renamed with a keeping id in front of
//! its extension, e.g. `home.2.aa.tar.gz`. Keeping ids run `aa`, `ab`, ...,
//! `zz`; `aa` is always the most recent generation. Keeping a new
//! generation moves every older one up by one id and deletes the one that
//! would go past the configured number of generations.

use std::fs;
use std::path::{Path, PathBuf};

use crate::archiver::{level_of_stem, BackupDefinition};
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::MAX_OLD_BACKUPS;

/// Keeping id of the `generation`-th most recent kept backup, from 0
pub fn keeping_id(generation: u32) -> Option<String> {
    if generation >= MAX_OLD_BACKUPS {
        return None;
    }
    let first = char::from(b'a' + (generation / 26) as u8);
    let second = char::from(b'a' + (generation % 26) as u8);
    Some([first, second].iter().collect())
}

/// Renames backups that are about to be overwritten
pub struct BackupKeeper<'a> {
    definition: &'a BackupDefinition,
    generations: u32,
}

impl<'a> BackupKeeper<'a> {
    /// Keeper holding up to `generations` old backups
    pub fn new(definition: &'a BackupDefinition, generations: u32) -> Self {
        Self {
            definition,
            generations: generations.clamp(1, MAX_OLD_BACKUPS),
        }
    }

    /// Keep the standalone backup file, if there is one
    ///
    /// Returns the keeping id it was kept under.
    pub fn keep_backup(&self) -> ArchiveResult<Option<String>> {
        let current = self.definition.backup_file_path(None);
        if !current.exists() {
            return Ok(None);
        }
        self.keep(&[0])
    }

    /// Keep the increments of `from_level` and above as one generation
    ///
    /// Returns the keeping id they were kept under.
    pub fn keep_increments(&self, from_level: u32) -> ArchiveResult<Option<String>> {
        let levels: Vec<u32> = (from_level..)
            .take_while(|level| self.definition.backup_file_path(Some(*level)).exists())
            .collect();
        if levels.is_empty() {
            return Ok(None);
        }
        self.keep(&levels)
    }

    fn keep(&self, levels: &[u32]) -> ArchiveResult<Option<String>> {
        self.rotate()?;
        let newest = keeping_id(0).unwrap_or_default();
        for level in levels {
            let level = Some(*level);
            rename(
                &self.definition.backup_file_path(level),
                &self.definition.kept_file_path(level, &newest),
            )?;
        }
        tracing::debug!(
            archive = %self.definition.backup_id,
            levels = levels.len(),
            "old backup kept"
        );
        Ok(Some(newest))
    }

    /// Free the newest keeping id by moving every generation one up
    fn rotate(&self) -> ArchiveResult<()> {
        let oldest = self.generations - 1;
        for (_, path) in self.kept_files(oldest)? {
            fs::remove_file(&path).map_err(|e| {
                ArchiveError::Io(format!(
                    "Unable to remove old backup \"{}\": {}",
                    path.display(),
                    e
                ))
            })?;
        }

        for generation in (0..oldest).rev() {
            let target = keeping_id(generation + 1).unwrap_or_default();
            for (level, path) in self.kept_files(generation)? {
                rename(
                    &path,
                    &self.definition.kept_file_path(Some(level), &target),
                )?;
            }
        }
        Ok(())
    }

    /// `(level, path)` of the backups kept under the id of `generation`
    fn kept_files(&self, generation: u32) -> ArchiveResult<Vec<(u32, PathBuf)>> {
        let keeping_id = match keeping_id(generation) {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };
        let destination = &self.definition.destination;
        if !destination.is_dir() {
            return Ok(Vec::new());
        }

        let suffix = format!(".{}.{}", keeping_id, self.definition.backup_type.extension());
        let mut files = Vec::new();
        for entry in fs::read_dir(destination)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let level = file_name
                .strip_suffix(&suffix)
                .and_then(|stem| level_of_stem(stem, &self.definition.backup_id));
            if let Some(level) = level {
                files.push((level, entry.path()));
            }
        }
        Ok(files)
    }
}

fn rename(from: &Path, to: &Path) -> ArchiveResult<()> {
    fs::rename(from, to).map_err(|e| {
        ArchiveError::Io(format!(
            "Unable to keep old backup \"{}\" as \"{}\": {}",
            from.display(),
            to.display(),
            e
        ))
    })
}
