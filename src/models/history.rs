//! Backup history model
//!
//! Bookkeeping remembered between runs for one archive. Every field stays
//! absent until the first backup that needs it has been recorded.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Persisted restart bookkeeping of one archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupHistory {
    /// Level the archiver would create next, as of the last recorded backup
    pub max_backup_level: Option<u32>,
    /// Size in bytes of the last backup created at each level
    pub backup_size_by_level: BTreeMap<u32, u64>,
    /// Day of the last restart of any kind
    pub last_restart_date: Option<NaiveDate>,
    /// Day of the last restart to level 0
    pub last_full_restart_date: Option<NaiveDate>,
    /// Restarts since the last full restart
    pub restart_count: Option<u32>,
}

impl BackupHistory {
    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Recorded size of the backup at `level`
    pub fn backup_size(&self, level: u32) -> Option<u64> {
        self.backup_size_by_level.get(&level).copied()
    }

    /// Record the size of the backup just created at `level`
    pub fn record_backup_size(&mut self, level: u32, size: u64) {
        self.backup_size_by_level.insert(level, size);
    }

    /// Drop sizes recorded for levels above `level`
    ///
    /// Removal walks upward from `level + 1` and stops at the first level
    /// without a recorded size. Returns the number of sizes removed.
    pub fn clear_sizes_above(&mut self, level: u32) -> usize {
        let mut removed = 0;
        let mut idx = level + 1;
        while self.backup_size_by_level.remove(&idx).is_some() {
            removed += 1;
            idx += 1;
        }
        removed
    }
}
