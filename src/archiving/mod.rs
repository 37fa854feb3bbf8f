//! Archiving operations over configured and stored archives
//!
//! [`Archiving`] is what the command-line actions talk to. It loads archive
//! specifications, runs backups through a [`BackupOrchestrator`] and reports
//! every problem to the message sink, so one broken archive never stops a
//! batch.

pub mod commands;
pub mod decision;
pub mod keeping;
pub mod orchestrator;

pub use commands::run_command;
pub use decision::{decide, restart_level};
pub use keeping::{keeping_id, BackupKeeper};
pub use orchestrator::{classify_event, BackupOrchestrator, CreatedBackup, LevelPlan};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use crate::archiver::ArchiverRegistry;
use crate::config::paths::ARCHIVE_SPEC_EXT;
use crate::config::{ArchiveOption, Configuration};
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{ArchiveInfo, ArchiveSpec, ArchiveSpecInfo, DEFAULT_RESTART_AFTER_LEVEL};
use crate::spec;
use crate::storage::{FileStorage, HistoryStore};
use crate::ui::{MessageSink, RecordingSink};

/// Entry point for backup, listing and purge operations
pub struct Archiving<'a> {
    config: &'a Configuration,
    storage: &'a FileStorage,
    registry: ArchiverRegistry,
    sink: &'a dyn MessageSink,
    today: NaiveDate,
}

impl<'a> Archiving<'a> {
    pub fn new(
        config: &'a Configuration,
        storage: &'a FileStorage,
        registry: ArchiverRegistry,
        sink: &'a dyn MessageSink,
    ) -> Self {
        Self::with_today(config, storage, registry, sink, Local::now().date_naive())
    }

    /// Like [`new`](Self::new) with a fixed current day
    pub fn with_today(
        config: &'a Configuration,
        storage: &'a FileStorage,
        registry: ArchiverRegistry,
        sink: &'a dyn MessageSink,
        today: NaiveDate,
    ) -> Self {
        Self {
            config,
            storage,
            registry,
            sink,
            today,
        }
    }

    /// Day used for backup dates and ages
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Specification file for a command-line argument
    ///
    /// Arguments ending in `.aa` are paths; anything else names a file in the
    /// archive specifications directory.
    pub fn spec_file_for(&self, argument: &str) -> PathBuf {
        if Path::new(argument).extension().map_or(false, |ext| ext == ARCHIVE_SPEC_EXT) {
            PathBuf::from(argument)
        } else {
            self.config
                .archive_specs_dir
                .join(format!("{}.{}", argument, ARCHIVE_SPEC_EXT))
        }
    }

    /// Create the next backup of the archive declared in `spec_file`
    ///
    /// The archive's `command-before-backup` runs first; when it fails the
    /// backup is skipped. `command-after-backup` runs after every backup
    /// attempt. Failures are reported to the sink; `None` is returned when
    /// no backup was written.
    pub fn make_backup(&self, spec_file: &Path) -> Option<CreatedBackup> {
        let spec = self.load_spec(spec_file)?;

        if let Some(command) = &spec.command_before_backup {
            if let Err(e) = run_command(command) {
                self.sink.show_error(&format!(
                    "Unable to run the command before the backup: {}",
                    e
                ));
                return None;
            }
        }

        let result = self
            .registry
            .archiver_for(spec.archiver)
            .and_then(|archiver| {
                let orchestrator = BackupOrchestrator::new(
                    &spec,
                    archiver.as_ref(),
                    self.storage,
                    self.sink,
                    self.today,
                );
                let backup = orchestrator.create_backup()?;
                orchestrator.save_backup_level_info(&backup)?;
                Ok(backup)
            });

        let backup = match result {
            Ok(backup) => Some(backup),
            Err(e) => {
                tracing::debug!(
                    spec_file = %spec_file.display(),
                    backup_failure = e.is_backup_failure(),
                    "backup not created"
                );
                self.sink
                    .show_error(&format!("Unable to create the backup: {}", e));
                None
            }
        };

        if let Some(command) = &spec.command_after_backup {
            if let Err(e) = run_command(command) {
                self.sink.show_error(&format!(
                    "Unable to run the command after the backup: {}",
                    e
                ));
            }
        }
        backup
    }

    /// Run `command-before-all-backups`, if configured
    ///
    /// Returns `false` when the command failed; the failure is reported.
    pub fn run_command_before_all_backups(&self) -> bool {
        self.run_batch_command(self.config.command_before_all_backups.as_deref(), "before")
    }

    /// Run `command-after-all-backups`, if configured
    ///
    /// Returns `false` when the command failed; the failure is reported.
    pub fn run_command_after_all_backups(&self) -> bool {
        self.run_batch_command(self.config.command_after_all_backups.as_deref(), "after")
    }

    fn run_batch_command(&self, command: Option<&str>, when: &str) -> bool {
        let command = match command {
            Some(command) => command,
            None => return true,
        };
        match run_command(command) {
            Ok(()) => true,
            Err(e) => {
                self.sink.show_error(&format!(
                    "Unable to run the command {} all backups: {}",
                    when, e
                ));
                false
            }
        }
    }

    /// Every specification file in the archive specifications directory
    ///
    /// # Errors
    ///
    /// Fails if the directory does not exist or cannot be read.
    pub fn archive_specs(&self) -> ArchiveResult<Vec<ArchiveSpecInfo>> {
        let dir = &self.config.archive_specs_dir;
        if !dir.is_dir() {
            return Err(ArchiveError::Config(format!(
                "Archive specifications directory \"{}\" does not exist.",
                dir.display()
            )));
        }

        let mut specs: Vec<ArchiveSpecInfo> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().map_or(false, |ext| ext == ARCHIVE_SPEC_EXT)
            })
            .map(ArchiveSpecInfo::from_path)
            .collect();
        specs.sort();
        Ok(specs)
    }

    /// Names of the archives whose specification files are valid
    pub fn filter_valid_spec_files(&self, spec_files: &[PathBuf]) -> Vec<String> {
        spec_files
            .iter()
            .filter_map(|path| spec::load(path, self.config, &RecordingSink::new()).ok())
            .map(|spec| spec.name)
            .collect()
    }

    /// What is known about the archive declared in `spec_file`
    pub fn archive_info(&self, spec_file: &Path) -> Option<ArchiveInfo> {
        let spec = self.load_spec(spec_file)?;
        let archiver = match self.registry.archiver_for(spec.archiver) {
            Ok(archiver) => archiver,
            Err(e) => {
                self.sink
                    .show_error(&format!("Unable to get archive information: {}", e));
                return None;
            }
        };
        let orchestrator = BackupOrchestrator::new(
            &spec,
            archiver.as_ref(),
            self.storage,
            self.sink,
            self.today,
        );

        let mut info = ArchiveInfo::new(spec.name.clone());
        info.root_path = Some(spec.root_path.clone());
        info.archiver = Some(spec.archiver);
        info.destination_dir = Some(spec.destination_dir.clone());

        if orchestrator.is_option_supported(ArchiveOption::Incremental) {
            if let Err(e) = self.fill_level_info(&spec, &orchestrator, &mut info) {
                self.sink.show_error(&format!(
                    "Unable to get some of the archive information: {}",
                    e
                ));
            }
        }
        Some(info)
    }

    fn fill_level_info(
        &self,
        spec: &ArchiveSpec,
        orchestrator: &BackupOrchestrator<'_>,
        info: &mut ArchiveInfo,
    ) -> ArchiveResult<()> {
        info.incremental = Some(spec.incremental);
        info.restarting = Some(spec.restarting);
        info.restart_after_level = Some(spec.restart_after_level);
        info.full_restart_after_count = spec.full_restart_after_count;
        info.restart_after_age_days = spec.restart_after_age_days;
        info.full_restart_after_age_days = spec.full_restart_after_age_days;

        let plan = orchestrator.plan_level()?;
        info.backup_level = plan.max_level.checked_sub(1);
        let decision = plan.decision;
        info.next_backup_level = spec.incremental.then_some(decision.next_level);
        info.restart_reason = Some(decision.reason);
        info.restart_level = plan.restart_level;

        let history = orchestrator.load_history()?;
        info.restart_count = history.restart_count;
        info.last_restart = history.last_restart_date;
        info.last_full_restart = history.last_full_restart_date;
        Ok(())
    }

    /// Names of archives with data kept by an archiver or in the history
    pub fn stored_archive_names(&self) -> BTreeSet<String> {
        let names = self.registry.stored_backup_ids().and_then(|mut names| {
            names.extend(self.storage.realms()?);
            Ok(names)
        });
        match names {
            Ok(names) => names,
            Err(e) => {
                self.sink.show_error(&format!(
                    "Unable to get list of stored archive names: {}",
                    e
                ));
                BTreeSet::new()
            }
        }
    }

    /// What can be recovered about `name` from stored data alone
    ///
    /// Returns `None` when nothing is stored for it.
    pub fn stored_archive_info(&self, name: &str) -> Option<ArchiveInfo> {
        if !self.stored_archive_names().contains(name) {
            return None;
        }

        let normal = &self.config.normal;
        let mut info = ArchiveInfo::new(name);
        info.archiver = Some(normal.archiver.unwrap_or_default());
        info.destination_dir = normal.dest_dir.clone();

        match self.stored_backup_level(name) {
            Ok(level) => info.backup_level = level,
            Err(e) => self
                .sink
                .show_error(&format!("Unable to determine the backup level: {}", e)),
        }

        if info.backup_level.is_some() {
            info.incremental = Some(normal.incremental.unwrap_or(false));
            info.restart_after_level =
                Some(normal.restart_after_level.unwrap_or(DEFAULT_RESTART_AFTER_LEVEL));
            info.full_restart_after_count = normal.full_restart_after_count;

            match HistoryStore::new(self.storage).load(name) {
                Ok(history) => {
                    info.restart_count = history.restart_count;
                    info.last_restart = history.last_restart_date;
                    info.last_full_restart = history.last_full_restart_date;
                }
                Err(e) => self.sink.show_error(&e.to_string()),
            }
        }
        Some(info)
    }

    fn stored_backup_level(&self, name: &str) -> ArchiveResult<Option<u32>> {
        let mut max_level = 0;
        for archiver in self.registry.all_providers() {
            max_level = max_level.max(archiver.max_backup_level(name)?);
        }
        Ok(max_level.checked_sub(1))
    }

    /// Delete everything stored for `name`
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing was stored for it.
    pub fn purge_stored_archive_data(&self, name: &str) -> ArchiveResult<()> {
        if orchestrator::purge_stored_archive_data(name, &self.registry, self.storage)? {
            Ok(())
        } else {
            Err(ArchiveError::stored_data_not_found(name))
        }
    }

    fn load_spec(&self, spec_file: &Path) -> Option<ArchiveSpec> {
        match spec::load(spec_file, self.config, self.sink) {
            Ok(spec) => Some(spec),
            Err(e) => {
                self.sink.show_error(&e.to_string());
                None
            }
        }
    }
}
