//! Global settings for autoarch
//!
//! Settings are read from `config.json` in the user configuration directory.
//! Archive options set here apply to every archive that does not set them in
//! its own declaration file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::options::ArchiveOptions;
use super::paths::AppPaths;
use crate::error::ArchiveError;

/// How much output the user wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Errors, warnings and informational messages
    #[default]
    Normal,
    /// Everything, including each file added to a backup
    Verbose,
}

/// User settings for autoarch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Directory with archive specification files, if not the default one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_specs_dir: Option<PathBuf>,

    /// Output verbosity
    #[serde(default)]
    pub verbosity: Verbosity,

    /// Shell command run once before a batch of backups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_before_all_backups: Option<String>,

    /// Shell command run once after a batch of backups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_after_all_backups: Option<String>,

    /// Default archive options
    #[serde(flatten)]
    pub options: ArchiveOptions,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            archive_specs_dir: None,
            verbosity: Verbosity::default(),
            command_before_all_backups: None,
            command_after_all_backups: None,
            options: ArchiveOptions::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or use defaults if the file doesn't exist
    pub fn load_or_create(paths: &AppPaths) -> Result<Self, ArchiveError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                ArchiveError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                ArchiveError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &AppPaths) -> Result<(), ArchiveError> {
        paths.ensure_directories()?;

        let settings_path = paths.settings_file();
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            ArchiveError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(&settings_path, contents).map_err(|e| {
            ArchiveError::Io(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }

    /// Directory with archive specification files
    pub fn archive_specs_dir(&self, paths: &AppPaths) -> PathBuf {
        self.archive_specs_dir
            .clone()
            .unwrap_or_else(|| paths.archive_specs_dir())
    }
}
