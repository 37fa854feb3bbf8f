//! Archiver backends
//!
//! An [`Archiver`] reads the files of a [`BackupDefinition`] and writes one
//! backup file. Problems with single files do not stop a backup; they are
//! reported through the event callback passed to the backup methods.

pub mod external;
pub mod internal;
pub mod registry;

#[cfg(test)]
pub mod fake;

pub use external::ExternalTarArchiver;
pub use internal::InternalTarArchiver;
pub use registry::ArchiverRegistry;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{ArchiverFeature, BackupType};

/// Suffix of a backup file that is still being written
pub const PARTIAL_SUFFIX: &str = "._partial";

/// Highest accepted compression level
pub const MAX_COMPRESSION_LEVEL: u8 = 9;

/// Step of the backup during which a per-file problem occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupSubOperation {
    Stat,
    Open,
    Read,
    /// Completion of the whole backup
    Finish,
    UnknownFileOperation,
}

/// Per-file problem reported during a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupOperationError {
    PermissionDenied,
    FileChanged,
    SocketIgnored,
    UnknownTypeIgnored,
    DirectoryRenamed,
    SomeFilesChanged,
    UnknownError,
    UnknownOsError,
}

/// Notification sent by an archiver while it creates a backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiverEvent {
    /// A file was written to the backup
    FileAdded(String),
    /// A non-fatal problem occurred
    OperationError {
        operation: BackupSubOperation,
        error: BackupOperationError,
        path: Option<String>,
        detail: Option<String>,
    },
}

impl ArchiverEvent {
    pub fn error(
        operation: BackupSubOperation,
        error: BackupOperationError,
        path: Option<&str>,
        detail: Option<&str>,
    ) -> Self {
        Self::OperationError {
            operation,
            error,
            path: path.map(str::to_string),
            detail: detail.map(str::to_string),
        }
    }
}

/// What to back up and where to put it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupDefinition {
    /// Base name of the backup files
    pub backup_id: String,
    pub backup_type: BackupType,
    /// Directory receiving the backup file
    pub destination: PathBuf,
    /// Directory the include and exclude paths are relative to
    pub root: PathBuf,
    pub include_files: BTreeSet<String>,
    pub exclude_files: BTreeSet<String>,
    /// Write directly to the final file name instead of a partial file
    pub overwrite_at_start: bool,
}

impl BackupDefinition {
    /// Path of the backup file for `level`
    pub fn backup_file_path(&self, level: Option<u32>) -> PathBuf {
        backup_file_path(&self.backup_id, self.backup_type, &self.destination, level)
    }

    /// Path of a backup kept under `keeping_id`: `<id>[.<level>].<keeping id>.<ext>`
    pub fn kept_file_path(&self, level: Option<u32>, keeping_id: &str) -> PathBuf {
        let level_token = match level {
            Some(level) if level > 0 => format!(".{}", level),
            _ => String::new(),
        };
        self.destination.join(format!(
            "{}{}.{}.{}",
            self.backup_id,
            level_token,
            keeping_id,
            self.backup_type.extension()
        ))
    }

    /// Path the archiver writes to while the backup is in progress
    pub fn working_path(&self, final_path: &Path) -> PathBuf {
        if self.overwrite_at_start {
            final_path.to_path_buf()
        } else {
            partial_path(final_path)
        }
    }
}

/// Callback receiving archiver events
pub type EventCallback<'a> = &'a mut dyn FnMut(&ArchiverEvent);

/// A backend that creates backup files
pub trait Archiver {
    /// Backup types this archiver can write
    fn supported_backup_types(&self) -> BTreeSet<BackupType>;

    /// Features available for `backup_type`, or for any type if `None`
    fn supported_features(&self, backup_type: Option<BackupType>) -> BTreeSet<ArchiverFeature>;

    /// Create a standalone backup and return its path
    fn backup_files(
        &self,
        definition: &BackupDefinition,
        compression_level: Option<u8>,
        on_event: EventCallback<'_>,
    ) -> ArchiveResult<PathBuf>;

    /// Create a backup of `level`, or of the next level if `None`, and
    /// return its path
    fn backup_files_incrementally(
        &self,
        definition: &BackupDefinition,
        compression_level: Option<u8>,
        level: Option<u32>,
        on_event: EventCallback<'_>,
    ) -> ArchiveResult<PathBuf>;

    /// Remove backups of `from_level` and above
    fn remove_backup_increments(
        &self,
        definition: &BackupDefinition,
        from_level: u32,
    ) -> ArchiveResult<()>;

    /// Level the next incremental backup of `backup_id` would get
    fn max_backup_level(&self, backup_id: &str) -> ArchiveResult<u32>;

    /// Ids of backups this archiver keeps private data for
    fn stored_backup_ids(&self) -> ArchiveResult<BTreeSet<String>>;

    /// Drop private data kept for `backup_id`
    fn purge_stored_backup_data(&self, backup_id: &str) -> ArchiveResult<()>;
}

/// Backup file path: `<destination>/<id>[.<level>].<ext>`
///
/// The level token is left out for level 0 and for non-incremental backups.
pub fn backup_file_path(
    backup_id: &str,
    backup_type: BackupType,
    destination: &Path,
    level: Option<u32>,
) -> PathBuf {
    let level_token = match level {
        Some(level) if level > 0 => format!(".{}", level),
        _ => String::new(),
    };
    destination.join(format!(
        "{}{}.{}",
        backup_id,
        level_token,
        backup_type.extension()
    ))
}

/// Path of the partial file for `path`
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Check a backup request against what `archiver` supports
///
/// # Errors
///
/// `Unsupported` for an unsupported backup type or feature,
/// `BackupAborted` when there is nothing to back up and `Config` for a
/// compression level out of range.
pub fn check_backup_request(
    archiver: &dyn Archiver,
    definition: &BackupDefinition,
    compression_level: Option<u8>,
    incremental: bool,
) -> ArchiveResult<()> {
    if !archiver
        .supported_backup_types()
        .contains(&definition.backup_type)
    {
        return Err(ArchiveError::Unsupported(format!(
            "Unsupported backup type: {}",
            definition.backup_type
        )));
    }

    let features = archiver.supported_features(Some(definition.backup_type));
    let mut requested = Vec::new();
    if compression_level.is_some() {
        requested.push(ArchiverFeature::CompressionStrength);
    }
    if incremental {
        requested.push(ArchiverFeature::Incremental);
    }
    if let Some(feature) = requested.into_iter().find(|f| !features.contains(f)) {
        return Err(ArchiveError::Unsupported(format!(
            "Feature {} is not supported by the backup type {}.",
            feature, definition.backup_type
        )));
    }

    if let Some(level) = compression_level {
        if level > MAX_COMPRESSION_LEVEL {
            return Err(ArchiveError::Config(format!(
                "Compression level {} is out of range 0-{}",
                level, MAX_COMPRESSION_LEVEL
            )));
        }
    }

    if definition.include_files.is_empty() {
        return Err(ArchiveError::BackupAborted("Nothing to backup.".into()));
    }

    Ok(())
}

/// Backup level of the file stem `stem` if it belongs to `backup_id`
///
/// The stem is either `<id>` (level 0) or `<id>.<level>`.
pub fn level_of_stem(stem: &str, backup_id: &str) -> Option<u32> {
    let rest = stem.strip_prefix(backup_id)?;
    if rest.is_empty() {
        return Some(0);
    }
    let token = rest.strip_prefix('.')?;
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Map an I/O error onto a per-file backup error
pub fn io_error_kind(err: &std::io::Error) -> BackupOperationError {
    if err.kind() == std::io::ErrorKind::PermissionDenied {
        BackupOperationError::PermissionDenied
    } else {
        BackupOperationError::UnknownOsError
    }
}
