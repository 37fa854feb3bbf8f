//! Archiver kinds and backup types
//!
//! An archiver kind selects both the backend that writes the backup and the
//! format it writes. Each kind maps onto exactly one backup type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Archiver selected in the configuration or an archive specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiverKind {
    /// GNU tar, uncompressed
    #[serde(rename = "tar")]
    Tar,
    /// GNU tar with gzip
    #[serde(rename = "targz")]
    TarGz,
    /// GNU tar with bzip2
    #[serde(rename = "tarbz2")]
    TarBz2,
    /// GNU tar with xz
    #[serde(rename = "tarxz")]
    TarXz,
    /// Built-in tar writer, uncompressed
    #[serde(rename = "tar_internal")]
    TarInternal,
    /// Built-in tar writer with gzip
    #[serde(rename = "targz_internal")]
    TarGzInternal,
    /// Built-in tar writer with bzip2
    #[serde(rename = "tarbz2_internal")]
    TarBz2Internal,
}

impl ArchiverKind {
    /// All archiver kinds
    pub fn all() -> &'static [ArchiverKind] {
        &[
            Self::Tar,
            Self::TarGz,
            Self::TarBz2,
            Self::TarXz,
            Self::TarInternal,
            Self::TarGzInternal,
            Self::TarBz2Internal,
        ]
    }

    /// Parse archiver kind from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tar" => Some(Self::Tar),
            "targz" | "tar.gz" => Some(Self::TarGz),
            "tarbz2" | "tar.bz2" => Some(Self::TarBz2),
            "tarxz" | "tar.xz" => Some(Self::TarXz),
            "tar_internal" => Some(Self::TarInternal),
            "targz_internal" => Some(Self::TarGzInternal),
            "tarbz2_internal" => Some(Self::TarBz2Internal),
            _ => None,
        }
    }

    /// The backup type this archiver produces
    pub fn backup_type(&self) -> BackupType {
        match self {
            Self::Tar => BackupType::Tar,
            Self::TarGz => BackupType::TarGz,
            Self::TarBz2 => BackupType::TarBz2,
            Self::TarXz => BackupType::TarXz,
            Self::TarInternal => BackupType::Tar,
            Self::TarGzInternal => BackupType::TarGz,
            Self::TarBz2Internal => BackupType::TarBz2,
        }
    }

    /// The backend that implements this archiver
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::Tar | Self::TarGz | Self::TarBz2 | Self::TarXz => ProviderKind::ExternalTar,
            Self::TarInternal | Self::TarGzInternal | Self::TarBz2Internal => {
                ProviderKind::InternalTar
            }
        }
    }
}

impl Default for ArchiverKind {
    fn default() -> Self {
        Self::TarGz
    }
}

impl fmt::Display for ArchiverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tar => write!(f, "tar"),
            Self::TarGz => write!(f, "targz"),
            Self::TarBz2 => write!(f, "tarbz2"),
            Self::TarXz => write!(f, "tarxz"),
            Self::TarInternal => write!(f, "tar_internal"),
            Self::TarGzInternal => write!(f, "targz_internal"),
            Self::TarBz2Internal => write!(f, "tarbz2_internal"),
        }
    }
}

/// Format of a produced backup file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
}

impl BackupType {
    /// File name extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
        }
    }

    /// Whether the format is compressed at all
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::Tar)
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Optional capabilities an archiver may advertise per backup type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArchiverFeature {
    /// Compression strength can be chosen
    CompressionStrength,
    /// Incremental (leveled) backups
    Incremental,
}

impl fmt::Display for ArchiverFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompressionStrength => write!(f, "compression strength"),
            Self::Incremental => write!(f, "incremental backup"),
        }
    }
}

/// Archiver backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// GNU tar run as a child process
    ExternalTar,
    /// In-process tar writer
    InternalTar,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_type_mapping() {
        let expected = [
            (ArchiverKind::Tar, BackupType::Tar),
            (ArchiverKind::TarGz, BackupType::TarGz),
            (ArchiverKind::TarBz2, BackupType::TarBz2),
            (ArchiverKind::TarXz, BackupType::TarXz),
            (ArchiverKind::TarInternal, BackupType::Tar),
            (ArchiverKind::TarGzInternal, BackupType::TarGz),
            (ArchiverKind::TarBz2Internal, BackupType::TarBz2),
        ];
        for (kind, backup_type) in expected {
            assert_eq!(kind.backup_type(), backup_type, "{}", kind);
        }
        assert_eq!(ArchiverKind::all().len(), expected.len());
    }

    #[test]
    fn test_provider_mapping() {
        assert_eq!(ArchiverKind::TarXz.provider(), ProviderKind::ExternalTar);
        assert_eq!(
            ArchiverKind::TarGzInternal.provider(),
            ProviderKind::InternalTar
        );
    }

    #[test]
    fn test_parse_round_trips_display() {
        for kind in ArchiverKind::all() {
            assert_eq!(ArchiverKind::parse(&kind.to_string()), Some(*kind));
        }
        assert_eq!(ArchiverKind::parse("TarGz"), Some(ArchiverKind::TarGz));
        assert_eq!(ArchiverKind::parse("zip"), None);
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&ArchiverKind::TarBz2Internal).unwrap();
        assert_eq!(json, "\"tarbz2_internal\"");
    }

    #[test]
    fn test_extensions() {
        assert_eq!(BackupType::TarXz.extension(), "tar.xz");
        assert!(!BackupType::Tar.is_compressed());
    }
}
