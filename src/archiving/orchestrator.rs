//! Backup creation for one archive
//!
//! [`BackupOrchestrator`] decides the backup level, runs the archiver and
//! records what the next decision needs.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::decision::{decide, restart_level};
use super::keeping::BackupKeeper;
use crate::archiver::{
    Archiver, ArchiverEvent, ArchiverRegistry, BackupDefinition, BackupOperationError as Error,
    BackupSubOperation as Op,
};
use crate::config::{ArchiveOption, Verbosity};
use crate::error::ArchiveResult;
use crate::models::{ArchiveSpec, ArchiverFeature, BackupHistory, RestartDecision};
use crate::storage::{FileStorage, HistoryStore};
use crate::ui::{MessageKind, MessageSink};

/// Level decision for the next backup of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPlan {
    /// Level the archiver would create next
    pub max_level: u32,
    pub decision: RestartDecision,
    /// Where a non-full restart would go, if restarting is enabled
    pub restart_level: Option<u32>,
    /// Problems found in the stored history
    pub warnings: Vec<String>,
}

/// A backup written by [`BackupOrchestrator::create_backup`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedBackup {
    pub path: PathBuf,
    /// Level decision, for incremental backups
    pub decision: Option<RestartDecision>,
    /// Whether per-file errors were reported
    pub had_errors: bool,
}

/// Creates backups of one archive and keeps its restart bookkeeping
pub struct BackupOrchestrator<'a> {
    spec: &'a ArchiveSpec,
    archiver: &'a dyn Archiver,
    storage: &'a FileStorage,
    sink: &'a dyn MessageSink,
    today: NaiveDate,
}

impl<'a> BackupOrchestrator<'a> {
    /// Create an orchestrator; warns about options the archiver ignores
    pub fn new(
        spec: &'a ArchiveSpec,
        archiver: &'a dyn Archiver,
        storage: &'a FileStorage,
        sink: &'a dyn MessageSink,
        today: NaiveDate,
    ) -> Self {
        let orchestrator = Self {
            spec,
            archiver,
            storage,
            sink,
            today,
        };
        orchestrator.report_unsupported_options();
        orchestrator
    }

    /// Whether the archiver honours `option` for this archive's format
    pub fn is_option_supported(&self, option: ArchiveOption) -> bool {
        let feature = match option {
            ArchiveOption::CompressionLevel => ArchiverFeature::CompressionStrength,
            ArchiveOption::Incremental => ArchiverFeature::Incremental,
            _ => return true,
        };
        self.archiver
            .supported_features(Some(self.spec.archiver.backup_type()))
            .contains(&feature)
    }

    /// Whether backups of this archive are incremental
    pub fn is_incremental(&self) -> bool {
        self.spec.incremental && self.is_option_supported(ArchiveOption::Incremental)
    }

    fn history(&self) -> HistoryStore<'_> {
        HistoryStore::new(self.storage)
    }

    /// Decide the level of the next incremental backup
    ///
    /// # Errors
    ///
    /// Fails if the archiver or the history storage cannot be read.
    pub fn plan_level(&self) -> ArchiveResult<LevelPlan> {
        let max_level = self.archiver.max_backup_level(&self.spec.name)?;
        let history = self.history().load(&self.spec.name)?;

        let mut warnings = Vec::new();
        let decision = decide(
            max_level,
            self.spec.level,
            self.spec,
            &history,
            self.today,
            &mut warnings,
        );
        let restart_target = self
            .spec
            .restarting
            .then(|| restart_level(max_level, self.spec, &history, &mut Vec::new()));

        Ok(LevelPlan {
            max_level,
            decision,
            restart_level: restart_target,
            warnings,
        })
    }

    /// Stored history of the archive
    pub fn load_history(&self) -> ArchiveResult<BackupHistory> {
        self.history().load(&self.spec.name)
    }

    /// Run the archiver and return the created backup
    ///
    /// Per-file problems are reported to the sink and do not fail the
    /// backup.
    ///
    /// # Errors
    ///
    /// `BackupFailed`, `BackupAborted` or `Io` when the backup could not be
    /// written; `Storage` when the history cannot be read.
    pub fn create_backup(&self) -> ArchiveResult<CreatedBackup> {
        let definition = self.definition();
        let compression_level = self
            .spec
            .compression_level
            .filter(|_| self.is_option_supported(ArchiveOption::CompressionLevel));

        let sink = self.sink;
        let verbose = sink.verbosity() == Verbosity::Verbose;
        let mut had_errors = false;
        let mut on_event = |event: &ArchiverEvent| {
            if let ArchiverEvent::FileAdded(_) = event {
                if !verbose {
                    return;
                }
            }
            if let Some((kind, message)) = classify_event(event) {
                had_errors |= kind == MessageKind::Error;
                sink.show_message(kind, &message);
            }
        };

        let (path, decision) = if self.is_incremental() {
            let plan = self.plan_level()?;
            for warning in &plan.warnings {
                sink.show_warning(warning);
            }
            let level = plan.decision.next_level;
            if let Some(warning) = plan.decision.reason.warning(level) {
                sink.show_warning(&warning);
            }
            if let Some(configured) = self.spec.level {
                if configured > level {
                    sink.show_warning(&format!(
                        "Backup level value {} is too high. Using level {} instead.",
                        configured, level
                    ));
                }
            }

            if self.spec.keep_old_backups {
                self.keep_old_backups(|keeper| keeper.keep_increments(level))?;
            }
            let path = self.archiver.backup_files_incrementally(
                &definition,
                compression_level,
                Some(level),
                &mut on_event,
            )?;
            if self.spec.remove_obsolete_backups {
                self.archiver
                    .remove_backup_increments(&definition, level + 1)?;
            }
            (path, Some(plan.decision))
        } else {
            if self.spec.keep_old_backups {
                self.keep_old_backups(|keeper| keeper.keep_backup())?;
            }
            let path = self
                .archiver
                .backup_files(&definition, compression_level, &mut on_event)?;
            (path, None)
        };

        if had_errors {
            sink.show_verbose("Error(s) occurred during the backup creation. Please check program's output.");
        }
        tracing::info!(
            archive = %self.spec.name,
            path = %path.display(),
            level = decision.map(|d| d.next_level),
            "backup created"
        );

        Ok(CreatedBackup {
            path,
            decision,
            had_errors,
        })
    }

    /// Record restart bookkeeping for a backup just created
    ///
    /// Call once per [`create_backup`](Self::create_backup). Does nothing
    /// unless the archive is incremental with restarting enabled.
    ///
    /// # Errors
    ///
    /// Fails if the backup file size cannot be read or the history cannot be
    /// saved.
    pub fn save_backup_level_info(&self, backup: &CreatedBackup) -> ArchiveResult<()> {
        let decision = match backup.decision {
            Some(decision) if self.is_incremental() && self.spec.restarting => decision,
            _ => return Ok(()),
        };
        let level = decision.next_level;
        let restarted = decision.reason.is_restart();

        let mut history = self.history().load(&self.spec.name)?;
        if restarted {
            history.restart_count = Some(history.restart_count.unwrap_or(0) + 1);
        }
        if level < 2 || restarted {
            history.last_restart_date = Some(self.today);
            if level == 0 {
                history.last_full_restart_date = Some(self.today);
                history.restart_count = Some(0);
            }
        }

        let size = backup_size(&backup.path)?;
        history.record_backup_size(level, size);
        history.clear_sizes_above(level);
        history.max_backup_level = Some(self.archiver.max_backup_level(&self.spec.name)?);

        tracing::debug!(archive = %self.spec.name, level, size, "saving backup level info");
        self.history().save(&self.spec.name, &history)
    }

    /// Move the backups about to be replaced out of the way
    fn keep_old_backups<F>(&self, keep: F) -> ArchiveResult<()>
    where
        F: FnOnce(&BackupKeeper<'_>) -> ArchiveResult<Option<String>>,
    {
        let definition = self.definition();
        let keeper = BackupKeeper::new(&definition, self.spec.number_of_old_backups);
        if let Some(keeping_id) = keep(&keeper)? {
            self.sink.show_verbose(&format!(
                "Old backup kept under keeping id \"{}\".",
                keeping_id
            ));
        }
        Ok(())
    }

    fn definition(&self) -> BackupDefinition {
        BackupDefinition {
            backup_id: self.spec.name.clone(),
            backup_type: self.spec.archiver.backup_type(),
            destination: self.spec.destination_dir.clone(),
            root: self.spec.root_path.clone(),
            include_files: self.spec.include_files.clone(),
            exclude_files: self.spec.exclude_files.clone(),
            overwrite_at_start: self.spec.overwrite_at_start,
        }
    }

    fn report_unsupported_options(&self) {
        let requested = [
            (
                ArchiveOption::CompressionLevel,
                self.spec.compression_level.is_some(),
            ),
            (ArchiveOption::Incremental, self.spec.incremental),
        ];
        for (option, set) in requested {
            if set && !self.is_option_supported(option) {
                self.sink.show_warning(&format!(
                    "Option \"{}\" is not supported by the archiver of type \"{}\".",
                    option, self.spec.archiver
                ));
            }
        }
    }
}

/// Delete everything stored for `name`: archiver data and backup history
///
/// Returns whether anything was found.
pub fn purge_stored_archive_data(
    name: &str,
    registry: &ArchiverRegistry,
    storage: &FileStorage,
) -> ArchiveResult<bool> {
    let archiver_data = registry.purge_stored_backup_data(name)?;
    let history = storage.remove_realm(name)?;
    if history {
        storage.save()?;
    }
    tracing::debug!(archive = name, archiver_data, history, "purged stored data");
    Ok(archiver_data || history)
}

fn backup_size(path: &Path) -> ArchiveResult<u64> {
    Ok(std::fs::metadata(path)?.len())
}

/// User message for an archiver event
///
/// Permission and unknown errors are errors, ignored files and changes are
/// warnings, renamed directories and added files are verbose.
pub fn classify_event(event: &ArchiverEvent) -> Option<(MessageKind, String)> {
    let (operation, error, path, detail) = match event {
        ArchiverEvent::FileAdded(name) => return Some((MessageKind::Verbose, name.clone())),
        ArchiverEvent::OperationError {
            operation,
            error,
            path,
            detail,
        } => (
            *operation,
            *error,
            path.as_deref().unwrap_or(""),
            detail.as_deref().unwrap_or(""),
        ),
    };

    let message = match (operation, error) {
        (Op::Stat, Error::PermissionDenied) => (
            MessageKind::Error,
            format!("Cannot access \"{}\". Permission denied.", path),
        ),
        (Op::Open, Error::PermissionDenied) => (
            MessageKind::Error,
            format!("Cannot open file \"{}\". Permission denied.", path),
        ),
        (Op::Read, Error::PermissionDenied) => (
            MessageKind::Error,
            format!("Cannot read file \"{}\". Permission denied.", path),
        ),
        (Op::Stat | Op::Open | Op::Read, Error::UnknownError | Error::UnknownOsError) => (
            MessageKind::Error,
            format!(
                "Error occurred while accessing file \"{}\". {}",
                path, detail
            ),
        ),
        (Op::Read, Error::FileChanged) => (
            MessageKind::Warning,
            format!("File changed as we read it: \"{}\".", path),
        ),
        (_, Error::SocketIgnored) => (
            MessageKind::Warning,
            format!("Socket ignored: \"{}\".", path),
        ),
        (_, Error::UnknownTypeIgnored) => (
            MessageKind::Warning,
            format!("Unknown file type ignored: \"{}\".", path),
        ),
        (Op::Read, Error::DirectoryRenamed) => (
            MessageKind::Verbose,
            format!("Directory has been renamed: \"{}\".", path),
        ),
        (Op::Finish, Error::SomeFilesChanged) => (
            MessageKind::Warning,
            "Some files were changed during the backup creation.".to_string(),
        ),
        (Op::UnknownFileOperation, Error::UnknownOsError) if !path.is_empty() => (
            MessageKind::Error,
            format!(
                "A system error occurred while accessing file \"{}\": {}",
                path, detail
            ),
        ),
        (Op::UnknownFileOperation, Error::UnknownError) if !path.is_empty() => (
            MessageKind::Error,
            format!(
                "An error occurred while accessing file \"{}\": {}",
                path, detail
            ),
        ),
        (_, Error::UnknownOsError) => (
            MessageKind::Error,
            format!("A system error occurred: {}", detail),
        ),
        (_, Error::UnknownError) => (MessageKind::Error, format!("An error occurred: {}", detail)),
        (operation, error) => (
            MessageKind::Error,
            format!(
                "An unknown error occurred: {:?}, {:?}, {}, {}!",
                operation, error, path, detail
            ),
        ),
    };
    Some(message)
}
