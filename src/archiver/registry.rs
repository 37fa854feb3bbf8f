//! Archiver kind to backend mapping

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::{Archiver, ExternalTarArchiver, InternalTarArchiver};
use crate::error::ArchiveResult;
use crate::models::{ArchiverKind, ProviderKind};

/// Creates the archiver backend for an archiver kind
#[derive(Debug, Clone)]
pub struct ArchiverRegistry {
    work_dir: PathBuf,
}

impl ArchiverRegistry {
    /// `work_dir` receives the archivers' own bookkeeping data
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Backend for `kind`
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be set up, e.g. when no tar binary is
    /// installed.
    pub fn archiver_for(&self, kind: ArchiverKind) -> ArchiveResult<Box<dyn Archiver>> {
        self.provider(kind.provider())
    }

    /// Backend of a provider family
    pub fn provider(&self, provider: ProviderKind) -> ArchiveResult<Box<dyn Archiver>> {
        Ok(match provider {
            ProviderKind::ExternalTar => Box::new(ExternalTarArchiver::new(self.work_dir.clone())?),
            ProviderKind::InternalTar => Box::new(InternalTarArchiver),
        })
    }

    /// Every backend that can be set up on this system
    ///
    /// Backends that fail to initialise are skipped.
    pub fn all_providers(&self) -> Vec<Box<dyn Archiver>> {
        [ProviderKind::ExternalTar, ProviderKind::InternalTar]
            .into_iter()
            .filter_map(|provider| match self.provider(provider) {
                Ok(archiver) => Some(archiver),
                Err(e) => {
                    tracing::debug!(?provider, error = %e, "archiver backend unavailable");
                    None
                }
            })
            .collect()
    }

    /// Ids every backend keeps private data for
    pub fn stored_backup_ids(&self) -> ArchiveResult<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        for archiver in self.all_providers() {
            ids.extend(archiver.stored_backup_ids()?);
        }
        Ok(ids)
    }

    /// Drop private data of `backup_id` in every backend
    ///
    /// Returns whether any backend had data for it.
    pub fn purge_stored_backup_data(&self, backup_id: &str) -> ArchiveResult<bool> {
        let mut found = false;
        for archiver in self.all_providers() {
            found |= archiver.stored_backup_ids()?.contains(backup_id);
            archiver.purge_stored_backup_data(backup_id)?;
        }
        Ok(found)
    }
}
