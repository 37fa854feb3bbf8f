//! Path management for autoarch
//!
//! Provides XDG-compliant path resolution for the user configuration
//! directory and everything kept inside it.
//!
//! ## Path Resolution Order
//!
//! 1. `AUTOARCH_CONFIG_DIR` environment variable (if set)
//! 2. `$XDG_CONFIG_HOME/autoarch`
//! 3. `~/.config/autoarch`

use std::path::PathBuf;

use directories::BaseDirs;

use crate::error::ArchiveError;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "AUTOARCH_CONFIG_DIR";

/// File extension of archive specification files
pub const ARCHIVE_SPEC_EXT: &str = "aa";

/// Manages all paths used by autoarch
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// User configuration directory
    base_dir: PathBuf,
}

impl AppPaths {
    /// Create a new AppPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, ArchiveError> {
        let base_dir = if let Ok(custom) = std::env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create AppPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the user configuration directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the global configuration file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the default directory holding archive specification files
    pub fn archive_specs_dir(&self) -> PathBuf {
        self.base_dir.join("archive_specs")
    }

    /// Get the path to the backup history storage
    pub fn storage_file(&self) -> PathBuf {
        self.base_dir.join("storage.json")
    }

    /// Get the directory archivers use for their own bookkeeping
    pub fn archiver_work_dir(&self) -> PathBuf {
        self.base_dir.join("archiver")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), ArchiveError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| ArchiveError::Io(format!("Failed to create config directory: {}", e)))?;

        std::fs::create_dir_all(self.archiver_work_dir()).map_err(|e| {
            ArchiveError::Io(format!("Failed to create archiver directory: {}", e))
        })?;

        Ok(())
    }
}

/// Resolve the default configuration directory
fn resolve_default_path() -> Result<PathBuf, ArchiveError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("autoarch"));
        }
    }

    let base_dirs = BaseDirs::new()
        .ok_or_else(|| ArchiveError::Config("Could not determine home directory".into()))?;
    Ok(base_dirs.home_dir().join(".config").join("autoarch"))
}
