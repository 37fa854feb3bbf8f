//! Layered configuration
//!
//! Option values come from several places. For each option the first of
//! these that applies wins:
//!
//! 1. a forced value (`--force-<option>` on the command line)
//! 2. a negation (`--no-<option>`), which turns flags off and clears values
//! 3. the archive's own declaration file
//! 4. the normal configuration (`config.json`, then plain command-line flags)
//! 5. the built-in default

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::options::{ArchiveOption, ArchiveOptions};
use super::paths::AppPaths;
use super::settings::{Settings, Verbosity};
use crate::models::{ArchiverKind, DEFAULT_NUMBER_OF_OLD_BACKUPS, DEFAULT_RESTART_AFTER_LEVEL};

/// Fully typed configuration shared by every archive in a run
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    /// Normal option values
    pub normal: ArchiveOptions,
    /// Values that override archive declarations
    pub forced: ArchiveOptions,
    /// Options switched off
    pub negated: BTreeSet<ArchiveOption>,
    /// Directory with archive specification files
    pub archive_specs_dir: PathBuf,
    /// User configuration directory
    pub user_config_dir: PathBuf,
    /// Output verbosity
    pub verbosity: Verbosity,
    /// Process every configured archive
    pub all: bool,
    /// Shell command run once before a batch of backups
    pub command_before_all_backups: Option<String>,
    /// Shell command run once after a batch of backups
    pub command_after_all_backups: Option<String>,
}

/// Policy options after all layers were applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub archiver: ArchiverKind,
    pub dest_dir: PathBuf,
    pub compression_level: Option<u8>,
    pub level: Option<u32>,
    pub incremental: bool,
    pub restarting: bool,
    pub restart_after_level: u32,
    pub restart_after_age: Option<u32>,
    pub full_restart_after_count: Option<u32>,
    pub full_restart_after_age: Option<u32>,
    pub max_restart_level_size: Option<u8>,
    pub remove_obsolete_backups: bool,
    pub overwrite_at_start: bool,
    pub keep_old_backups: bool,
    pub number_of_old_backups: u32,
    pub command_before_backup: Option<String>,
    pub command_after_backup: Option<String>,
}

impl Configuration {
    /// Build the configuration from persisted settings
    pub fn from_settings(settings: &Settings, paths: &AppPaths) -> Self {
        Self {
            normal: settings.options.clone(),
            forced: ArchiveOptions::default(),
            negated: BTreeSet::new(),
            archive_specs_dir: settings.archive_specs_dir(paths),
            user_config_dir: paths.base_dir().clone(),
            verbosity: settings.verbosity,
            all: false,
            command_before_all_backups: settings.command_before_all_backups.clone(),
            command_after_all_backups: settings.command_after_all_backups.clone(),
        }
    }

    /// Whether `option` was negated
    pub fn is_negated(&self, option: ArchiveOption) -> bool {
        self.negated.contains(&option)
    }

    /// Apply all layers on top of an archive's declared options
    pub fn resolve(&self, declared: &ArchiveOptions) -> ResolvedOptions {
        let n = &self.normal;
        let f = &self.forced;

        ResolvedOptions {
            archiver: self
                .pick(ArchiveOption::Archiver, &f.archiver, &declared.archiver, &n.archiver)
                .unwrap_or_default(),
            dest_dir: self
                .pick(ArchiveOption::DestDir, &f.dest_dir, &declared.dest_dir, &n.dest_dir)
                .unwrap_or_else(default_dest_dir),
            compression_level: self.pick(
                ArchiveOption::CompressionLevel,
                &f.compression_level,
                &declared.compression_level,
                &n.compression_level,
            ),
            level: self.pick(ArchiveOption::Level, &f.level, &declared.level, &n.level),
            incremental: self
                .pick(
                    ArchiveOption::Incremental,
                    &f.incremental,
                    &declared.incremental,
                    &n.incremental,
                )
                .unwrap_or(false),
            restarting: self
                .pick(
                    ArchiveOption::Restarting,
                    &f.restarting,
                    &declared.restarting,
                    &n.restarting,
                )
                .unwrap_or(false),
            restart_after_level: self
                .pick(
                    ArchiveOption::RestartAfterLevel,
                    &f.restart_after_level,
                    &declared.restart_after_level,
                    &n.restart_after_level,
                )
                .unwrap_or(DEFAULT_RESTART_AFTER_LEVEL),
            restart_after_age: self.pick(
                ArchiveOption::RestartAfterAge,
                &f.restart_after_age,
                &declared.restart_after_age,
                &n.restart_after_age,
            ),
            full_restart_after_count: self.pick(
                ArchiveOption::FullRestartAfterCount,
                &f.full_restart_after_count,
                &declared.full_restart_after_count,
                &n.full_restart_after_count,
            ),
            full_restart_after_age: self.pick(
                ArchiveOption::FullRestartAfterAge,
                &f.full_restart_after_age,
                &declared.full_restart_after_age,
                &n.full_restart_after_age,
            ),
            max_restart_level_size: self.pick(
                ArchiveOption::MaxRestartLevelSize,
                &f.max_restart_level_size,
                &declared.max_restart_level_size,
                &n.max_restart_level_size,
            ),
            remove_obsolete_backups: self
                .pick(
                    ArchiveOption::RemoveObsoleteBackups,
                    &f.remove_obsolete_backups,
                    &declared.remove_obsolete_backups,
                    &n.remove_obsolete_backups,
                )
                .unwrap_or(false),
            overwrite_at_start: self
                .pick(
                    ArchiveOption::OverwriteAtStart,
                    &f.overwrite_at_start,
                    &declared.overwrite_at_start,
                    &n.overwrite_at_start,
                )
                .unwrap_or(false),
            keep_old_backups: self
                .pick(
                    ArchiveOption::KeepOldBackups,
                    &f.keep_old_backups,
                    &declared.keep_old_backups,
                    &n.keep_old_backups,
                )
                .unwrap_or(false),
            number_of_old_backups: self
                .pick(
                    ArchiveOption::NumberOfOldBackups,
                    &f.number_of_old_backups,
                    &declared.number_of_old_backups,
                    &n.number_of_old_backups,
                )
                .unwrap_or(DEFAULT_NUMBER_OF_OLD_BACKUPS),
            command_before_backup: self.pick(
                ArchiveOption::CommandBeforeBackup,
                &f.command_before_backup,
                &declared.command_before_backup,
                &n.command_before_backup,
            ),
            command_after_backup: self.pick(
                ArchiveOption::CommandAfterBackup,
                &f.command_after_backup,
                &declared.command_after_backup,
                &n.command_after_backup,
            ),
        }
    }

    fn pick<T: Clone>(
        &self,
        option: ArchiveOption,
        forced: &Option<T>,
        declared: &Option<T>,
        normal: &Option<T>,
    ) -> Option<T> {
        if let Some(value) = forced {
            return Some(value.clone());
        }
        if self.is_negated(option) {
            return None;
        }
        declared.clone().or_else(|| normal.clone())
    }
}

fn default_dest_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration() -> Configuration {
        Configuration {
            normal: ArchiveOptions {
                incremental: Some(true),
                restart_after_level: Some(5),
                dest_dir: Some(PathBuf::from("/backups")),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let resolved = Configuration::default().resolve(&ArchiveOptions::default());
        assert_eq!(resolved.archiver, ArchiverKind::TarGz);
        assert_eq!(resolved.restart_after_level, DEFAULT_RESTART_AFTER_LEVEL);
        assert!(!resolved.incremental);
        assert!(resolved.restart_after_age.is_none());
    }

    #[test]
    fn test_declaration_beats_normal_configuration() {
        let declared = ArchiveOptions {
            restart_after_level: Some(2),
            ..Default::default()
        };
        let resolved = configuration().resolve(&declared);
        assert_eq!(resolved.restart_after_level, 2);
        assert_eq!(resolved.dest_dir, PathBuf::from("/backups"));
        assert!(resolved.incremental);
    }

    #[test]
    fn test_negation_beats_declaration() {
        let mut config = configuration();
        config.negated.insert(ArchiveOption::Incremental);
        config.negated.insert(ArchiveOption::RestartAfterAge);
        let declared = ArchiveOptions {
            incremental: Some(true),
            restart_after_age: Some(7),
            ..Default::default()
        };

        let resolved = config.resolve(&declared);
        assert!(!resolved.incremental);
        assert!(resolved.restart_after_age.is_none());
    }

    #[test]
    fn test_force_beats_negation() {
        let mut config = configuration();
        config.negated.insert(ArchiveOption::Restarting);
        config.forced.restarting = Some(true);
        let declared = ArchiveOptions {
            restarting: Some(false),
            ..Default::default()
        };

        assert!(config.resolve(&declared).restarting);
    }

    #[test]
    fn test_keeping_and_commands() {
        let mut config = configuration();
        config.normal.keep_old_backups = Some(true);
        config.forced.command_after_backup = Some("sync".into());
        let declared = ArchiveOptions {
            number_of_old_backups: Some(3),
            command_after_backup: Some("umount /mnt".into()),
            ..Default::default()
        };

        let resolved = config.resolve(&declared);
        assert!(resolved.keep_old_backups);
        assert_eq!(resolved.number_of_old_backups, 3);
        assert_eq!(resolved.command_after_backup.as_deref(), Some("sync"));
        assert_eq!(resolved.command_before_backup, None);

        config.negated.insert(ArchiveOption::KeepOldBackups);
        let resolved = config.resolve(&ArchiveOptions::default());
        assert!(!resolved.keep_old_backups);
        assert_eq!(resolved.number_of_old_backups, DEFAULT_NUMBER_OF_OLD_BACKUPS);
    }
}
