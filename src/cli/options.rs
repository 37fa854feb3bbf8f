//! Command-line archive option overrides
//!
//! Each policy option can be given plainly (`--restart-after-age 30`),
//! forced over archive declarations (`--force-restart-after-age 30`) or
//! switched off (`--no-restart-after-age`). Values are parsed by
//! [`ArchiveOptions::set_from_str`] so they are validated exactly like
//! declaration files.

use clap::Args;

use crate::config::{ArchiveOption, ArchiveOptions, Configuration};
use crate::error::ArchiveResult;

/// Archive option overrides shared by all actions
#[derive(Args, Debug, Default, Clone)]
pub struct OptionArgs {
    /// Archiver type (tar, targz, tarbz2, tarxz, tar_internal, targz_internal, tarbz2_internal)
    #[arg(long, global = true, value_name = "TYPE")]
    pub archiver: Option<String>,
    /// Archiver type, overriding archive specifications
    #[arg(long, global = true, value_name = "TYPE")]
    pub force_archiver: Option<String>,

    /// Directory where backups are written
    #[arg(long, global = true, value_name = "DIR")]
    pub dest_dir: Option<String>,
    /// Destination directory, overriding archive specifications
    #[arg(long, global = true, value_name = "DIR")]
    pub force_dest_dir: Option<String>,

    /// Compression strength, 0-9
    #[arg(long, global = true, value_name = "LEVEL")]
    pub compression_level: Option<String>,
    /// Compression strength, overriding archive specifications
    #[arg(long, global = true, value_name = "LEVEL")]
    pub force_compression_level: Option<String>,

    /// Create a backup of this level instead of the automatic one
    #[arg(short, long, global = true, value_name = "LEVEL")]
    pub level: Option<String>,

    /// Create incremental backups
    #[arg(long, global = true)]
    pub incremental: bool,
    #[arg(long, global = true, hide = true)]
    pub force_incremental: bool,
    /// Create full backups only
    #[arg(long, global = true, conflicts_with_all = ["incremental", "force_incremental"])]
    pub no_incremental: bool,

    /// Restart backup levels automatically
    #[arg(long, global = true)]
    pub restarting: bool,
    #[arg(long, global = true, hide = true)]
    pub force_restarting: bool,
    /// Never restart backup levels
    #[arg(long, global = true, conflicts_with_all = ["restarting", "force_restarting"])]
    pub no_restarting: bool,

    /// Restart after this backup level is reached
    #[arg(long, global = true, value_name = "LEVEL")]
    pub restart_after_level: Option<String>,
    #[arg(long, global = true, hide = true, value_name = "LEVEL")]
    pub force_restart_after_level: Option<String>,

    /// Restart after this many days
    #[arg(long, global = true, value_name = "DAYS")]
    pub restart_after_age: Option<String>,
    #[arg(long, global = true, hide = true, value_name = "DAYS")]
    pub force_restart_after_age: Option<String>,
    #[arg(long, global = true, conflicts_with = "restart_after_age")]
    pub no_restart_after_age: bool,

    /// Restart to level 0 after this many restarts
    #[arg(long, global = true, value_name = "COUNT")]
    pub full_restart_after_count: Option<String>,
    #[arg(long, global = true, hide = true, value_name = "COUNT")]
    pub force_full_restart_after_count: Option<String>,
    #[arg(long, global = true, conflicts_with = "full_restart_after_count")]
    pub no_full_restart_after_count: bool,

    /// Restart to level 0 after this many days
    #[arg(long, global = true, value_name = "DAYS")]
    pub full_restart_after_age: Option<String>,
    #[arg(long, global = true, hide = true, value_name = "DAYS")]
    pub force_full_restart_after_age: Option<String>,
    #[arg(long, global = true, conflicts_with = "full_restart_after_age")]
    pub no_full_restart_after_age: bool,

    /// Largest restart level size, in percent of the level 0 backup
    #[arg(long, global = true, value_name = "PERCENT")]
    pub max_restart_level_size: Option<String>,
    #[arg(long, global = true, hide = true, value_name = "PERCENT")]
    pub force_max_restart_level_size: Option<String>,
    #[arg(long, global = true, conflicts_with = "max_restart_level_size")]
    pub no_max_restart_level_size: bool,

    /// Remove backups of higher levels after a restart
    #[arg(long, global = true)]
    pub remove_obsolete_backups: bool,
    #[arg(long, global = true, conflicts_with = "remove_obsolete_backups")]
    pub no_remove_obsolete_backups: bool,

    /// Remove the old backup before the new one is written
    #[arg(long, global = true)]
    pub overwrite_at_start: bool,
    #[arg(long, global = true, conflicts_with = "overwrite_at_start")]
    pub no_overwrite_at_start: bool,

    /// Keep the backups a new backup replaces
    #[arg(short = 'k', long, global = true)]
    pub keep_old_backups: bool,
    #[arg(long, global = true, hide = true)]
    pub force_keep_old_backups: bool,
    #[arg(
        long,
        global = true,
        conflicts_with_all = ["keep_old_backups", "force_keep_old_backups"]
    )]
    pub no_keep_old_backups: bool,

    /// How many generations of old backups to keep, 1-676
    #[arg(long, global = true, value_name = "COUNT")]
    pub number_of_old_backups: Option<String>,
    #[arg(long, global = true, hide = true, value_name = "COUNT")]
    pub force_number_of_old_backups: Option<String>,

    /// Shell command run before each backup
    #[arg(long, global = true, value_name = "COMMAND")]
    pub command_before_backup: Option<String>,
    #[arg(long, global = true, hide = true, value_name = "COMMAND")]
    pub force_command_before_backup: Option<String>,

    /// Shell command run after each backup
    #[arg(long, global = true, value_name = "COMMAND")]
    pub command_after_backup: Option<String>,
    #[arg(long, global = true, hide = true, value_name = "COMMAND")]
    pub force_command_after_backup: Option<String>,

    /// Shell command run once before all backups
    #[arg(long, global = true, value_name = "COMMAND")]
    pub command_before_all_backups: Option<String>,

    /// Shell command run once after all backups
    #[arg(long, global = true, value_name = "COMMAND")]
    pub command_after_all_backups: Option<String>,
}

fn flag(set: bool) -> Option<&'static str> {
    set.then_some("yes")
}

impl OptionArgs {
    fn normal_values(&self) -> Vec<(ArchiveOption, Option<&str>)> {
        vec![
            (ArchiveOption::Archiver, self.archiver.as_deref()),
            (ArchiveOption::DestDir, self.dest_dir.as_deref()),
            (ArchiveOption::CompressionLevel, self.compression_level.as_deref()),
            (ArchiveOption::Level, self.level.as_deref()),
            (ArchiveOption::Incremental, flag(self.incremental)),
            (ArchiveOption::Restarting, flag(self.restarting)),
            (ArchiveOption::RestartAfterLevel, self.restart_after_level.as_deref()),
            (ArchiveOption::RestartAfterAge, self.restart_after_age.as_deref()),
            (
                ArchiveOption::FullRestartAfterCount,
                self.full_restart_after_count.as_deref(),
            ),
            (
                ArchiveOption::FullRestartAfterAge,
                self.full_restart_after_age.as_deref(),
            ),
            (
                ArchiveOption::MaxRestartLevelSize,
                self.max_restart_level_size.as_deref(),
            ),
            (
                ArchiveOption::RemoveObsoleteBackups,
                flag(self.remove_obsolete_backups),
            ),
            (ArchiveOption::OverwriteAtStart, flag(self.overwrite_at_start)),
            (ArchiveOption::KeepOldBackups, flag(self.keep_old_backups)),
            (
                ArchiveOption::NumberOfOldBackups,
                self.number_of_old_backups.as_deref(),
            ),
            (
                ArchiveOption::CommandBeforeBackup,
                self.command_before_backup.as_deref(),
            ),
            (
                ArchiveOption::CommandAfterBackup,
                self.command_after_backup.as_deref(),
            ),
        ]
    }

    fn forced_values(&self) -> Vec<(ArchiveOption, Option<&str>)> {
        vec![
            (ArchiveOption::Archiver, self.force_archiver.as_deref()),
            (ArchiveOption::DestDir, self.force_dest_dir.as_deref()),
            (
                ArchiveOption::CompressionLevel,
                self.force_compression_level.as_deref(),
            ),
            (ArchiveOption::Incremental, flag(self.force_incremental)),
            (ArchiveOption::Restarting, flag(self.force_restarting)),
            (
                ArchiveOption::RestartAfterLevel,
                self.force_restart_after_level.as_deref(),
            ),
            (
                ArchiveOption::RestartAfterAge,
                self.force_restart_after_age.as_deref(),
            ),
            (
                ArchiveOption::FullRestartAfterCount,
                self.force_full_restart_after_count.as_deref(),
            ),
            (
                ArchiveOption::FullRestartAfterAge,
                self.force_full_restart_after_age.as_deref(),
            ),
            (
                ArchiveOption::MaxRestartLevelSize,
                self.force_max_restart_level_size.as_deref(),
            ),
            (ArchiveOption::KeepOldBackups, flag(self.force_keep_old_backups)),
            (
                ArchiveOption::NumberOfOldBackups,
                self.force_number_of_old_backups.as_deref(),
            ),
            (
                ArchiveOption::CommandBeforeBackup,
                self.force_command_before_backup.as_deref(),
            ),
            (
                ArchiveOption::CommandAfterBackup,
                self.force_command_after_backup.as_deref(),
            ),
        ]
    }

    fn negations(&self) -> Vec<(ArchiveOption, bool)> {
        vec![
            (ArchiveOption::Incremental, self.no_incremental),
            (ArchiveOption::Restarting, self.no_restarting),
            (ArchiveOption::RestartAfterAge, self.no_restart_after_age),
            (
                ArchiveOption::FullRestartAfterCount,
                self.no_full_restart_after_count,
            ),
            (ArchiveOption::FullRestartAfterAge, self.no_full_restart_after_age),
            (ArchiveOption::MaxRestartLevelSize, self.no_max_restart_level_size),
            (
                ArchiveOption::RemoveObsoleteBackups,
                self.no_remove_obsolete_backups,
            ),
            (ArchiveOption::OverwriteAtStart, self.no_overwrite_at_start),
            (ArchiveOption::KeepOldBackups, self.no_keep_old_backups),
        ]
    }

    /// Layer the overrides onto `config`
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpec` for a value that does not parse.
    pub fn apply(&self, config: &mut Configuration) -> ArchiveResult<()> {
        set_values(&mut config.normal, self.normal_values())?;
        set_values(&mut config.forced, self.forced_values())?;
        config.negated.extend(
            self.negations()
                .into_iter()
                .filter(|(_, negated)| *negated)
                .map(|(option, _)| option),
        );
        if let Some(command) = &self.command_before_all_backups {
            config.command_before_all_backups = Some(command.clone());
        }
        if let Some(command) = &self.command_after_all_backups {
            config.command_after_all_backups = Some(command.clone());
        }
        Ok(())
    }
}

fn set_values(
    options: &mut ArchiveOptions,
    values: Vec<(ArchiveOption, Option<&str>)>,
) -> ArchiveResult<()> {
    for (option, value) in values {
        if let Some(value) = value {
            options.set_from_str(option, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArchiverKind;
    use std::path::PathBuf;

    #[test]
    fn test_apply_layers() {
        let args = OptionArgs {
            archiver: Some("tarbz2".into()),
            force_dest_dir: Some("/mnt/backup".into()),
            incremental: true,
            force_restarting: true,
            no_restart_after_age: true,
            ..Default::default()
        };
        let mut config = Configuration::default();
        args.apply(&mut config).unwrap();

        assert_eq!(config.normal.archiver, Some(ArchiverKind::TarBz2));
        assert_eq!(config.normal.incremental, Some(true));
        assert_eq!(config.normal.restarting, None);
        assert_eq!(config.forced.restarting, Some(true));
        assert_eq!(config.forced.dest_dir, Some(PathBuf::from("/mnt/backup")));
        assert!(config.is_negated(ArchiveOption::RestartAfterAge));
        assert!(!config.is_negated(ArchiveOption::Incremental));
    }

    #[test]
    fn test_apply_keeps_existing_values() {
        let mut config = Configuration::default();
        config.normal.restart_after_level = Some(3);

        OptionArgs::default().apply(&mut config).unwrap();

        assert_eq!(config.normal.restart_after_level, Some(3));
        assert!(config.negated.is_empty());
    }

    #[test]
    fn test_apply_keeping_and_commands() {
        let mut config = Configuration::default();
        config.command_after_all_backups = Some("from settings".into());
        let args = OptionArgs {
            keep_old_backups: true,
            force_number_of_old_backups: Some("3".into()),
            command_before_backup: Some("mount /mnt/backup".into()),
            command_before_all_backups: Some("date".into()),
            ..Default::default()
        };
        args.apply(&mut config).unwrap();

        assert_eq!(config.normal.keep_old_backups, Some(true));
        assert_eq!(config.forced.number_of_old_backups, Some(3));
        assert_eq!(
            config.normal.command_before_backup.as_deref(),
            Some("mount /mnt/backup")
        );
        assert_eq!(config.command_before_all_backups.as_deref(), Some("date"));
        assert_eq!(config.command_after_all_backups.as_deref(), Some("from settings"));
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let args = OptionArgs {
            max_restart_level_size: Some("150".into()),
            ..Default::default()
        };
        let err = args.apply(&mut Configuration::default()).unwrap_err();
        assert!(err.to_string().contains("max-restart-level-size"));
    }
}
