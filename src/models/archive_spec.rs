//! Archive specification model
//!
//! The resolved policy and file set of one named archive. Built by the
//! loader in `crate::spec` from a declaration file merged with the global
//! configuration, and never modified afterwards.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::archiver_kind::ArchiverKind;

/// Fully resolved archive specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSpec {
    /// Unique archive name, also the storage realm
    pub name: String,

    /// Declaration file this spec was loaded from
    pub spec_file: PathBuf,

    /// Root directory of the file set
    pub root_path: PathBuf,

    /// Included paths relative to the root, globs already expanded
    pub include_files: BTreeSet<String>,

    /// Excluded paths relative to the root, globs already expanded
    pub exclude_files: BTreeSet<String>,

    /// Backend and format
    pub archiver: ArchiverKind,

    /// Directory where backups are written
    pub destination_dir: PathBuf,

    /// Compression strength 0-9
    pub compression_level: Option<u8>,

    /// Explicitly requested backup level
    pub level: Option<u32>,

    /// Whether incremental backups are requested
    pub incremental: bool,

    /// Whether automatic backup-level restarts are enabled
    pub restarting: bool,

    /// Highest level created before restarting to a lower one
    pub restart_after_level: u32,

    /// Days since the last restart after which a restart is forced
    pub restart_after_age_days: Option<u32>,

    /// Number of restarts after which a full (level 0) restart is forced
    pub full_restart_after_count: Option<u32>,

    /// Days since the last full restart after which a full restart is forced
    pub full_restart_after_age_days: Option<u32>,

    /// Size ceiling, in percent of the level 0 backup, for a restart target
    pub max_restart_level_size_percent: Option<u8>,

    /// Remove backups of higher levels than the one just created
    pub remove_obsolete_backups: bool,

    /// Replace the old backup file when starting rather than on completion
    pub overwrite_at_start: bool,

    /// Rename backups about to be replaced instead of overwriting them
    pub keep_old_backups: bool,

    /// How many generations of kept backups to hold
    pub number_of_old_backups: u32,

    /// Shell command run before the backup is created
    pub command_before_backup: Option<String>,

    /// Shell command run after the backup attempt
    pub command_after_backup: Option<String>,
}

impl ArchiveSpec {
    /// Create a spec with default policy for the given name and root
    ///
    /// Mostly useful for tests and for callers that build specs in code.
    pub fn new(name: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            spec_file: PathBuf::new(),
            root_path: root_path.into(),
            include_files: BTreeSet::new(),
            exclude_files: BTreeSet::new(),
            archiver: ArchiverKind::default(),
            destination_dir: PathBuf::from("."),
            compression_level: None,
            level: None,
            incremental: false,
            restarting: false,
            restart_after_level: DEFAULT_RESTART_AFTER_LEVEL,
            restart_after_age_days: None,
            full_restart_after_count: None,
            full_restart_after_age_days: None,
            max_restart_level_size_percent: None,
            remove_obsolete_backups: false,
            overwrite_at_start: false,
            keep_old_backups: false,
            number_of_old_backups: DEFAULT_NUMBER_OF_OLD_BACKUPS,
            command_before_backup: None,
            command_after_backup: None,
        }
    }
}

/// Default value of `restart-after-level`
pub const DEFAULT_RESTART_AFTER_LEVEL: u32 = 10;

/// Default value of `number-of-old-backups`
pub const DEFAULT_NUMBER_OF_OLD_BACKUPS: u32 = 1;

/// Number of keeping ids, `aa` to `zz`
pub const MAX_OLD_BACKUPS: u32 = 26 * 26;

/// Name and location of an archive specification file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchiveSpecInfo {
    /// Archive name derived from the file name
    pub name: String,
    /// Path to the declaration file
    pub path: PathBuf,
}

impl ArchiveSpecInfo {
    /// Build info for a declaration file, naming it after the file stem
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            name,
            path: path.to_path_buf(),
        }
    }
}
