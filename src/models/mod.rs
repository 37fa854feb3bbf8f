//! Core data models for autoarch
//!
//! This module contains the data structures that describe archives, the
//! backends that write them, and the backup-level decisions made for them.

pub mod archive_info;
pub mod archive_spec;
pub mod archiver_kind;
pub mod history;
pub mod restart;

pub use archive_info::ArchiveInfo;
pub use archive_spec::{
    ArchiveSpec, ArchiveSpecInfo, DEFAULT_NUMBER_OF_OLD_BACKUPS, DEFAULT_RESTART_AFTER_LEVEL,
    MAX_OLD_BACKUPS,
};
pub use archiver_kind::{ArchiverFeature, ArchiverKind, BackupType, ProviderKind};
pub use history::BackupHistory;
pub use restart::{RestartDecision, RestartReason};
