//! In-process tar writer
//!
//! Writes plain, gzip or bzip2 compressed tar files without an external
//! program. Has no snapshot bookkeeping, so only standalone backups are
//! possible.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;

use super::{
    check_backup_request, io_error_kind, Archiver, ArchiverEvent, BackupDefinition,
    BackupOperationError, BackupSubOperation, EventCallback,
};
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{ArchiverFeature, BackupType};

const DEFAULT_GZIP_LEVEL: u8 = 6;
const DEFAULT_BZIP2_LEVEL: u8 = 9;

/// Tar writer built into the program
#[derive(Debug, Default, Clone)]
pub struct InternalTarArchiver;

impl InternalTarArchiver {
    pub fn new() -> Self {
        Self
    }

    fn write_backup(
        &self,
        definition: &BackupDefinition,
        compression_level: Option<u8>,
        on_event: EventCallback<'_>,
    ) -> ArchiveResult<PathBuf> {
        let backup_path = definition.backup_file_path(None);
        let working_path = definition.working_path(&backup_path);

        fs::create_dir_all(&definition.destination).map_err(|e| {
            ArchiveError::BackupFailed(format!(
                "Unable to create directory \"{}\": {}",
                definition.destination.display(),
                e
            ))
        })?;

        let file = File::create(&working_path).map_err(|e| write_failed(&working_path, e))?;
        let output = Output::new(file, definition.backup_type, compression_level);

        let mut writer = TarWriter {
            builder: tar::Builder::new(output),
            root: &definition.root,
            excludes: &definition.exclude_files,
            on_event,
        };
        for include in &definition.include_files {
            writer
                .add(Path::new(include))
                .map_err(|e| write_failed(&working_path, e))?;
        }

        let file = writer
            .builder
            .into_inner()
            .and_then(Output::finish)
            .map_err(|e| write_failed(&working_path, e))?;
        file.sync_all().map_err(|e| write_failed(&working_path, e))?;
        drop(file);

        if working_path != backup_path {
            fs::rename(&working_path, &backup_path).map_err(|e| write_failed(&backup_path, e))?;
        }

        tracing::debug!(path = %backup_path.display(), "internal tar backup written");
        Ok(backup_path)
    }
}

impl Archiver for InternalTarArchiver {
    fn supported_backup_types(&self) -> BTreeSet<BackupType> {
        [BackupType::Tar, BackupType::TarGz, BackupType::TarBz2]
            .into_iter()
            .collect()
    }

    fn supported_features(&self, backup_type: Option<BackupType>) -> BTreeSet<ArchiverFeature> {
        match backup_type {
            Some(backup_type) if !backup_type.is_compressed() => BTreeSet::new(),
            _ => [ArchiverFeature::CompressionStrength].into_iter().collect(),
        }
    }

    fn backup_files(
        &self,
        definition: &BackupDefinition,
        compression_level: Option<u8>,
        on_event: EventCallback<'_>,
    ) -> ArchiveResult<PathBuf> {
        check_backup_request(self, definition, compression_level, false)?;
        self.write_backup(definition, compression_level, on_event)
    }

    fn backup_files_incrementally(
        &self,
        definition: &BackupDefinition,
        compression_level: Option<u8>,
        _level: Option<u32>,
        _on_event: EventCallback<'_>,
    ) -> ArchiveResult<PathBuf> {
        check_backup_request(self, definition, compression_level, true)?;
        Err(incremental_unsupported())
    }

    fn remove_backup_increments(
        &self,
        _definition: &BackupDefinition,
        _from_level: u32,
    ) -> ArchiveResult<()> {
        Err(incremental_unsupported())
    }

    fn max_backup_level(&self, _backup_id: &str) -> ArchiveResult<u32> {
        Err(incremental_unsupported())
    }

    fn stored_backup_ids(&self) -> ArchiveResult<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }

    fn purge_stored_backup_data(&self, _backup_id: &str) -> ArchiveResult<()> {
        Ok(())
    }
}

fn incremental_unsupported() -> ArchiveError {
    ArchiveError::Unsupported("The internal tar archiver does not create incremental backups.".into())
}

fn write_failed(path: &Path, err: io::Error) -> ArchiveError {
    ArchiveError::BackupFailed(format!("Unable to write \"{}\": {}", path.display(), err))
}

/// Compressed or plain output file
enum Output {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Bzip2(BzEncoder<BufWriter<File>>),
}

impl Output {
    fn new(file: File, backup_type: BackupType, compression_level: Option<u8>) -> Self {
        let inner = BufWriter::new(file);
        match backup_type {
            BackupType::TarGz => {
                let level = compression_level.unwrap_or(DEFAULT_GZIP_LEVEL);
                Self::Gzip(GzEncoder::new(inner, flate2::Compression::new(u32::from(level))))
            }
            BackupType::TarBz2 => {
                // bzip2 knows no level 0
                let level = compression_level.unwrap_or(DEFAULT_BZIP2_LEVEL).max(1);
                Self::Bzip2(BzEncoder::new(inner, bzip2::Compression::new(u32::from(level))))
            }
            BackupType::Tar | BackupType::TarXz => Self::Plain(inner),
        }
    }

    fn finish(self) -> io::Result<File> {
        let inner = match self {
            Self::Plain(w) => w,
            Self::Gzip(e) => e.finish()?,
            Self::Bzip2(e) => e.finish()?,
        };
        inner.into_inner().map_err(|e| e.into_error())
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
            Self::Bzip2(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
            Self::Bzip2(w) => w.flush(),
        }
    }
}

/// Reads exactly `remaining` bytes, padding with zeros if the source ends
/// early
struct ExactReader<R> {
    inner: io::Take<R>,
    remaining: u64,
}

impl<R: Read> ExactReader<R> {
    fn new(inner: R, len: u64) -> Self {
        Self {
            inner: inner.take(len),
            remaining: len,
        }
    }
}

impl<R: Read> Read for ExactReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let mut n = self.inner.read(buf)?;
        if n == 0 {
            n = buf.len().min(self.remaining as usize);
            buf[..n].fill(0);
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Walks the file set and appends entries to the tar stream
///
/// Problems with source files are reported as events and the file is
/// skipped. Only failures writing the output are returned as errors.
struct TarWriter<'a, 'cb> {
    builder: tar::Builder<Output>,
    root: &'a Path,
    excludes: &'a BTreeSet<String>,
    on_event: EventCallback<'cb>,
}

impl TarWriter<'_, '_> {
    fn add(&mut self, relative: &Path) -> io::Result<()> {
        if self.is_excluded(relative) {
            return Ok(());
        }

        let full = self.root.join(relative);
        let name = relative.to_string_lossy().into_owned();

        let meta = match fs::symlink_metadata(&full) {
            Ok(meta) => meta,
            Err(e) => {
                self.report(BackupSubOperation::Stat, io_error_kind(&e), &name, Some(&e));
                return Ok(());
            }
        };
        let file_type = meta.file_type();

        if file_type.is_dir() {
            self.builder.append_dir(relative, &full)?;
            self.file_added(&name);
            self.add_children(relative, &full)
        } else if file_type.is_file() {
            self.add_file(relative, &full, &name, &meta)
        } else if file_type.is_symlink() {
            let target = match fs::read_link(&full) {
                Ok(target) => target,
                Err(e) => {
                    self.report(BackupSubOperation::Read, io_error_kind(&e), &name, Some(&e));
                    return Ok(());
                }
            };
            let mut header = tar::Header::new_gnu();
            header.set_metadata(&meta);
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            self.builder.append_link(&mut header, relative, &target)?;
            self.file_added(&name);
            Ok(())
        } else {
            let error = if is_socket(&meta) {
                BackupOperationError::SocketIgnored
            } else {
                BackupOperationError::UnknownTypeIgnored
            };
            self.report(BackupSubOperation::Open, error, &name, None);
            Ok(())
        }
    }

    fn add_children(&mut self, relative: &Path, full: &Path) -> io::Result<()> {
        let entries = match fs::read_dir(full) {
            Ok(entries) => entries,
            Err(e) => {
                let name = relative.to_string_lossy().into_owned();
                self.report(BackupSubOperation::Open, io_error_kind(&e), &name, Some(&e));
                return Ok(());
            }
        };

        let mut children = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => children.push(entry.file_name()),
                Err(e) => {
                    let name = relative.to_string_lossy().into_owned();
                    self.report(BackupSubOperation::Read, io_error_kind(&e), &name, Some(&e));
                }
            }
        }
        children.sort();

        for child in children {
            self.add(&relative.join(child))?;
        }
        Ok(())
    }

    fn add_file(
        &mut self,
        relative: &Path,
        full: &Path,
        name: &str,
        meta: &fs::Metadata,
    ) -> io::Result<()> {
        let file = match File::open(full) {
            Ok(file) => file,
            Err(e) => {
                self.report(BackupSubOperation::Open, io_error_kind(&e), name, Some(&e));
                return Ok(());
            }
        };

        let mut header = tar::Header::new_gnu();
        header.set_metadata(meta);
        header.set_size(meta.len());
        self.builder
            .append_data(&mut header, relative, ExactReader::new(file, meta.len()))?;

        let changed = match fs::symlink_metadata(full) {
            Ok(after) => after.len() != meta.len() || after.modified().ok() != meta.modified().ok(),
            Err(_) => true,
        };
        if changed {
            self.report(
                BackupSubOperation::Read,
                BackupOperationError::FileChanged,
                name,
                None,
            );
        }

        self.file_added(name);
        Ok(())
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        self.excludes
            .iter()
            .any(|exclude| relative.starts_with(Path::new(exclude)))
    }

    fn file_added(&mut self, name: &str) {
        (self.on_event)(&ArchiverEvent::FileAdded(name.to_string()));
    }

    fn report(
        &mut self,
        operation: BackupSubOperation,
        error: BackupOperationError,
        name: &str,
        cause: Option<&io::Error>,
    ) {
        let detail = cause.map(|e| e.to_string());
        (self.on_event)(&ArchiverEvent::error(
            operation,
            error,
            Some(name),
            detail.as_deref(),
        ));
    }
}

#[cfg(unix)]
fn is_socket(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    meta.file_type().is_socket()
}

#[cfg(not(unix))]
fn is_socket(_meta: &fs::Metadata) -> bool {
    false
}
