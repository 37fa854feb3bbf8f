//! Typed option schema
//!
//! Every policy option an archive can set is listed in [`ArchiveOption`].
//! [`ArchiveOptions`] holds an optional value for each of them; it is used
//! for the `[Archive]` section of declaration files, for `config.json` and
//! for command-line overrides alike.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{ArchiverKind, MAX_OLD_BACKUPS};

/// Name of an archive policy option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArchiveOption {
    Archiver,
    DestDir,
    CompressionLevel,
    Level,
    Incremental,
    Restarting,
    RestartAfterLevel,
    RestartAfterAge,
    FullRestartAfterCount,
    FullRestartAfterAge,
    MaxRestartLevelSize,
    RemoveObsoleteBackups,
    OverwriteAtStart,
    KeepOldBackups,
    NumberOfOldBackups,
    CommandBeforeBackup,
    CommandAfterBackup,
}

impl ArchiveOption {
    /// All options in declaration order
    pub fn all() -> &'static [ArchiveOption] {
        &[
            Self::Archiver,
            Self::DestDir,
            Self::CompressionLevel,
            Self::Level,
            Self::Incremental,
            Self::Restarting,
            Self::RestartAfterLevel,
            Self::RestartAfterAge,
            Self::FullRestartAfterCount,
            Self::FullRestartAfterAge,
            Self::MaxRestartLevelSize,
            Self::RemoveObsoleteBackups,
            Self::OverwriteAtStart,
            Self::KeepOldBackups,
            Self::NumberOfOldBackups,
            Self::CommandBeforeBackup,
            Self::CommandAfterBackup,
        ]
    }

    /// Option name as written in declaration files
    pub fn name(&self) -> &'static str {
        match self {
            Self::Archiver => "archiver",
            Self::DestDir => "dest-dir",
            Self::CompressionLevel => "compression-level",
            Self::Level => "level",
            Self::Incremental => "incremental",
            Self::Restarting => "restarting",
            Self::RestartAfterLevel => "restart-after-level",
            Self::RestartAfterAge => "restart-after-age",
            Self::FullRestartAfterCount => "full-restart-after-count",
            Self::FullRestartAfterAge => "full-restart-after-age",
            Self::MaxRestartLevelSize => "max-restart-level-size",
            Self::RemoveObsoleteBackups => "remove-obsolete-backups",
            Self::OverwriteAtStart => "overwrite-at-start",
            Self::KeepOldBackups => "keep-old-backups",
            Self::NumberOfOldBackups => "number-of-old-backups",
            Self::CommandBeforeBackup => "command-before-backup",
            Self::CommandAfterBackup => "command-after-backup",
        }
    }

    /// Look an option up by its declaration-file name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|o| o.name() == name)
    }
}

impl fmt::Display for ArchiveOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An optional value for every archive option
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArchiveOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archiver: Option<ArchiverKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restarting: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_after_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_after_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_restart_after_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_restart_after_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_restart_level_size: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_obsolete_backups: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrite_at_start: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_old_backups: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_old_backups: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_before_backup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_after_backup: Option<String>,
}

impl ArchiveOptions {
    /// Parse `value` and store it as the value of `option`
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpec` if the value does not parse or is out of range.
    pub fn set_from_str(&mut self, option: ArchiveOption, value: &str) -> ArchiveResult<()> {
        let value = value.trim();
        match option {
            ArchiveOption::Archiver => {
                self.archiver = Some(ArchiverKind::parse(value).ok_or_else(|| {
                    bad_value(option, value, "unknown archiver type")
                })?);
            }
            ArchiveOption::DestDir => {
                if value.is_empty() {
                    return Err(bad_value(option, value, "path must not be empty"));
                }
                self.dest_dir = Some(PathBuf::from(value));
            }
            ArchiveOption::CompressionLevel => {
                let level = parse_number(option, value)?;
                if level > 9 {
                    return Err(bad_value(option, value, "must be between 0 and 9"));
                }
                self.compression_level = Some(level as u8);
            }
            ArchiveOption::Level => self.level = Some(parse_number(option, value)?),
            ArchiveOption::Incremental => self.incremental = Some(parse_flag(option, value)?),
            ArchiveOption::Restarting => self.restarting = Some(parse_flag(option, value)?),
            ArchiveOption::RestartAfterLevel => {
                self.restart_after_level = Some(parse_number(option, value)?)
            }
            ArchiveOption::RestartAfterAge => {
                self.restart_after_age = Some(parse_number(option, value)?)
            }
            ArchiveOption::FullRestartAfterCount => {
                self.full_restart_after_count = Some(parse_number(option, value)?)
            }
            ArchiveOption::FullRestartAfterAge => {
                self.full_restart_after_age = Some(parse_number(option, value)?)
            }
            ArchiveOption::MaxRestartLevelSize => {
                let percent = parse_number(option, value)?;
                if !(1..=100).contains(&percent) {
                    return Err(bad_value(option, value, "must be between 1 and 100"));
                }
                self.max_restart_level_size = Some(percent as u8);
            }
            ArchiveOption::RemoveObsoleteBackups => {
                self.remove_obsolete_backups = Some(parse_flag(option, value)?)
            }
            ArchiveOption::OverwriteAtStart => {
                self.overwrite_at_start = Some(parse_flag(option, value)?)
            }
            ArchiveOption::KeepOldBackups => {
                self.keep_old_backups = Some(parse_flag(option, value)?)
            }
            ArchiveOption::NumberOfOldBackups => {
                let count = parse_number(option, value)?;
                if !(1..=MAX_OLD_BACKUPS).contains(&count) {
                    return Err(bad_value(
                        option,
                        value,
                        &format!("must be between 1 and {}", MAX_OLD_BACKUPS),
                    ));
                }
                self.number_of_old_backups = Some(count);
            }
            ArchiveOption::CommandBeforeBackup => {
                self.command_before_backup = Some(parse_command(option, value)?)
            }
            ArchiveOption::CommandAfterBackup => {
                self.command_after_backup = Some(parse_command(option, value)?)
            }
        }
        Ok(())
    }
}

fn bad_value(option: ArchiveOption, value: &str, why: &str) -> ArchiveError {
    ArchiveError::InvalidSpec(format!(
        "Bad value \"{}\" of option \"{}\": {}",
        value, option, why
    ))
}

fn parse_number(option: ArchiveOption, value: &str) -> ArchiveResult<u32> {
    value
        .parse::<u32>()
        .map_err(|_| bad_value(option, value, "not a non-negative integer"))
}

fn parse_command(option: ArchiveOption, value: &str) -> ArchiveResult<String> {
    if value.trim().is_empty() {
        return Err(bad_value(option, value, "command must not be empty"));
    }
    Ok(value.to_string())
}

/// Parse a yes/no value the way INI-style files usually spell it
pub fn parse_flag(option: ArchiveOption, value: &str) -> ArchiveResult<bool> {
    match value.to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(bad_value(option, value, "not a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_names_round_trip() {
        for option in ArchiveOption::all() {
            assert_eq!(ArchiveOption::from_name(option.name()), Some(*option));
        }
        assert_eq!(ArchiveOption::from_name("no-such-option"), None);
    }

    #[test]
    fn test_set_from_str_typed_values() {
        let mut options = ArchiveOptions::default();
        options.set_from_str(ArchiveOption::Archiver, "tarbz2").unwrap();
        options.set_from_str(ArchiveOption::Incremental, "yes").unwrap();
        options
            .set_from_str(ArchiveOption::RestartAfterLevel, " 4 ")
            .unwrap();

        assert_eq!(options.archiver, Some(ArchiverKind::TarBz2));
        assert_eq!(options.incremental, Some(true));
        assert_eq!(options.restart_after_level, Some(4));
        assert_eq!(options.restarting, None);
    }

    #[test]
    fn test_set_from_str_rejects_out_of_range() {
        let mut options = ArchiveOptions::default();
        assert!(options
            .set_from_str(ArchiveOption::CompressionLevel, "10")
            .is_err());
        assert!(options
            .set_from_str(ArchiveOption::MaxRestartLevelSize, "0")
            .is_err());
        assert!(options
            .set_from_str(ArchiveOption::Restarting, "maybe")
            .is_err());
        assert!(options.set_from_str(ArchiveOption::Level, "-1").is_err());
        assert!(options
            .set_from_str(ArchiveOption::NumberOfOldBackups, "0")
            .is_err());
        assert!(options
            .set_from_str(ArchiveOption::NumberOfOldBackups, "677")
            .is_err());
        assert!(options
            .set_from_str(ArchiveOption::CommandBeforeBackup, "  ")
            .is_err());
    }

    #[test]
    fn test_keeping_and_command_values() {
        let mut options = ArchiveOptions::default();
        options
            .set_from_str(ArchiveOption::KeepOldBackups, "on")
            .unwrap();
        options
            .set_from_str(ArchiveOption::NumberOfOldBackups, "676")
            .unwrap();
        options
            .set_from_str(ArchiveOption::CommandBeforeBackup, " mount /mnt/backup ")
            .unwrap();

        assert_eq!(options.keep_old_backups, Some(true));
        assert_eq!(options.number_of_old_backups, Some(676));
        assert_eq!(
            options.command_before_backup.as_deref(),
            Some("mount /mnt/backup")
        );
        assert_eq!(options.command_after_backup, None);
    }

    #[test]
    fn test_json_uses_declaration_names() {
        let options: ArchiveOptions =
            serde_json::from_str(r#"{"restart-after-age": 30, "archiver": "tar"}"#).unwrap();
        assert_eq!(options.restart_after_age, Some(30));
        assert_eq!(options.archiver, Some(ArchiverKind::Tar));
    }
}
