//! Typed access to the backup history of an archive
//!
//! The history of archive `name` lives in realm `name`, section `backup`.

use chrono::NaiveDate;

use crate::error::ArchiveError;
use crate::models::BackupHistory;

use super::store::FileStorage;

/// Section holding backup history variables
pub const HISTORY_SECTION: &str = "backup";

const MAX_BACKUP_LEVEL: &str = "max-backup-level";
const RESTART_COUNT: &str = "restart-count";
const LAST_RESTART: &str = "last-restart";
const LAST_FULL_RESTART: &str = "last-full-restart";
const BACKUP_SIZE_PREFIX: &str = "backup-size.";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads and writes [`BackupHistory`] values in a [`FileStorage`]
pub struct HistoryStore<'a> {
    storage: &'a FileStorage,
}

impl<'a> HistoryStore<'a> {
    pub fn new(storage: &'a FileStorage) -> Self {
        Self { storage }
    }

    /// Load the history of `archive`; unknown archives get an empty history
    pub fn load(&self, archive: &str) -> Result<BackupHistory, ArchiveError> {
        let section = self.storage.section(archive, HISTORY_SECTION)?;
        let mut history = BackupHistory::default();

        for (variable, value) in &section {
            match variable.as_str() {
                MAX_BACKUP_LEVEL => history.max_backup_level = Some(parse_number(variable, value)?),
                RESTART_COUNT => history.restart_count = Some(parse_number(variable, value)?),
                LAST_RESTART => history.last_restart_date = Some(parse_date(variable, value)?),
                LAST_FULL_RESTART => {
                    history.last_full_restart_date = Some(parse_date(variable, value)?)
                }
                other => {
                    if let Some(level) = other.strip_prefix(BACKUP_SIZE_PREFIX) {
                        let level = parse_number(variable, level)?;
                        history.record_backup_size(level, parse_number(variable, value)?);
                    } else {
                        tracing::debug!(archive, variable = other, "ignoring unknown history variable");
                    }
                }
            }
        }

        Ok(history)
    }

    /// Replace the stored history of `archive` and persist it
    pub fn save(&self, archive: &str, history: &BackupHistory) -> Result<(), ArchiveError> {
        let stale: Vec<String> = self
            .storage
            .section(archive, HISTORY_SECTION)?
            .into_keys()
            .collect();
        for variable in stale {
            self.storage.remove(archive, HISTORY_SECTION, &variable)?;
        }

        if let Some(level) = history.max_backup_level {
            self.set(archive, MAX_BACKUP_LEVEL, level)?;
        }
        if let Some(count) = history.restart_count {
            self.set(archive, RESTART_COUNT, count)?;
        }
        if let Some(date) = history.last_restart_date {
            self.set(archive, LAST_RESTART, date.format(DATE_FORMAT))?;
        }
        if let Some(date) = history.last_full_restart_date {
            self.set(archive, LAST_FULL_RESTART, date.format(DATE_FORMAT))?;
        }
        for (level, size) in &history.backup_size_by_level {
            self.set(archive, &format!("{}{}", BACKUP_SIZE_PREFIX, level), size)?;
        }

        self.storage.save()
    }

    fn set(&self, archive: &str, variable: &str, value: impl ToString) -> Result<(), ArchiveError> {
        self.storage.set(archive, HISTORY_SECTION, variable, value)
    }
}

fn parse_number<T: std::str::FromStr>(variable: &str, value: &str) -> Result<T, ArchiveError> {
    value.trim().parse().map_err(|_| {
        ArchiveError::Storage(format!(
            "Stored value \"{}\" of \"{}\" is not a number",
            value, variable
        ))
    })
}

fn parse_date(variable: &str, value: &str) -> Result<NaiveDate, ArchiveError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ArchiveError::Storage(format!(
            "Stored value \"{}\" of \"{}\" is not a date",
            value, variable
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("storage.json"));
        storage.load().unwrap();
        (temp_dir, storage)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_unknown_archive_has_empty_history() {
        let (_temp_dir, storage) = create_test_storage();
        let history = HistoryStore::new(&storage).load("home").unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let (temp_dir, storage) = create_test_storage();
        let mut history = BackupHistory {
            max_backup_level: Some(3),
            restart_count: Some(2),
            last_restart_date: Some(date(2024, 3, 1)),
            last_full_restart_date: Some(date(2024, 1, 15)),
            ..Default::default()
        };
        history.record_backup_size(0, 1000);
        history.record_backup_size(2, 40);
        HistoryStore::new(&storage).save("home", &history).unwrap();

        let reopened = FileStorage::new(temp_dir.path().join("storage.json"));
        reopened.load().unwrap();
        let loaded = HistoryStore::new(&reopened).load("home").unwrap();
        assert_eq!(loaded, history);
        assert_eq!(
            reopened.get("home", HISTORY_SECTION, "last-restart").unwrap(),
            Some("2024-03-01".to_string())
        );
    }

    #[test]
    fn test_save_drops_removed_fields() {
        let (_temp_dir, storage) = create_test_storage();
        let store = HistoryStore::new(&storage);
        let mut history = BackupHistory {
            restart_count: Some(1),
            ..Default::default()
        };
        history.record_backup_size(1, 10);
        history.record_backup_size(2, 20);
        store.save("home", &history).unwrap();

        history.clear_sizes_above(0);
        history.restart_count = None;
        store.save("home", &history).unwrap();

        assert!(!storage.contains("home", HISTORY_SECTION, "backup-size.1").unwrap());
        assert!(!storage.contains("home", HISTORY_SECTION, "restart-count").unwrap());
    }

    #[test]
    fn test_corrupt_value_is_storage_error() {
        let (_temp_dir, storage) = create_test_storage();
        storage.set("home", HISTORY_SECTION, "restart-count", "many").unwrap();

        let result = HistoryStore::new(&storage).load("home");
        assert!(matches!(result, Err(ArchiveError::Storage(_))));
    }
}
