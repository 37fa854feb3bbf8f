//! Archive information shown by the `list` action

use chrono::NaiveDate;
use std::path::PathBuf;

use super::archiver_kind::ArchiverKind;
use super::restart::RestartReason;

/// Everything known about one archive
///
/// Most fields are optional: an orphaned archive (one with stored data but
/// no declaration file) only has what could be recovered from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub name: String,
    pub root_path: Option<PathBuf>,
    pub archiver: Option<ArchiverKind>,
    pub destination_dir: Option<PathBuf>,
    pub incremental: Option<bool>,
    /// Level of the most recently created backup
    pub backup_level: Option<u32>,
    /// Level the next backup will have, when known
    pub next_backup_level: Option<u32>,
    pub restarting: Option<bool>,
    pub restart_after_level: Option<u32>,
    pub restart_reason: Option<RestartReason>,
    /// Target level of a non-full restart
    pub restart_level: Option<u32>,
    pub restart_count: Option<u32>,
    pub full_restart_after_count: Option<u32>,
    pub last_restart: Option<NaiveDate>,
    pub restart_after_age_days: Option<u32>,
    pub last_full_restart: Option<NaiveDate>,
    pub full_restart_after_age_days: Option<u32>,
}

impl ArchiveInfo {
    /// Create an empty info record for `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether restart figures are meaningful for this archive
    pub fn restart_enabled(&self) -> bool {
        self.incremental.unwrap_or(false) && self.restarting.unwrap_or(false)
    }

    /// Whole days since the last restart, as of `today`
    pub fn days_since_restart(&self, today: NaiveDate) -> Option<i64> {
        self.last_restart.map(|d| (today - d).num_days())
    }

    /// Whole days since the last full restart, as of `today`
    pub fn days_since_full_restart(&self, today: NaiveDate) -> Option<i64> {
        self.last_full_restart.map(|d| (today - d).num_days())
    }
}
