//! GNU tar driven as a child process
//!
//! Incremental backups use tar's `--listed-incremental` snapshot files,
//! kept in `<work dir>/snapshots` as `<id>[.<level>].snar`. The snapshot of
//! level `n` is the starting point of the backup at level `n + 1`.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{
    check_backup_request, level_of_stem, partial_path, Archiver, ArchiverEvent,
    BackupDefinition, BackupOperationError, BackupSubOperation, EventCallback,
};
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{ArchiverFeature, BackupType};

const TAR_BINARY: &str = "tar";
const TAR_FALLBACK_DIRS: &[&str] = &["/bin", "/usr/bin", "/usr/local/bin"];
const SNAPSHOTS_SUBDIR: &str = "snapshots";
const SNAPSHOT_SUFFIX: &str = ".snar";

/// Archiver running the system's GNU tar
#[derive(Debug, Clone)]
pub struct ExternalTarArchiver {
    work_dir: PathBuf,
    tar_binary: PathBuf,
}

/// How one line of tar's diagnostics is handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TarMessage {
    Ignore,
    Event(ArchiverEvent),
    /// The backup cannot continue
    Fatal(String),
}

impl ExternalTarArchiver {
    /// Create the archiver, locating `tar` on the `PATH`
    ///
    /// # Errors
    ///
    /// Fails if no tar binary is found or the snapshot directory cannot be
    /// created.
    pub fn new(work_dir: PathBuf) -> ArchiveResult<Self> {
        let tar_binary = locate_tar().ok_or_else(|| {
            ArchiveError::BackupFailed(format!(
                "Unable to locate the archiver binary: {}.",
                TAR_BINARY
            ))
        })?;
        Self::with_binary(work_dir, tar_binary)
    }

    /// Create the archiver with an explicit tar binary
    pub fn with_binary(work_dir: PathBuf, tar_binary: PathBuf) -> ArchiveResult<Self> {
        let archiver = Self {
            work_dir,
            tar_binary,
        };
        fs::create_dir_all(archiver.snapshots_dir()).map_err(|e| {
            ArchiveError::Io(format!(
                "Failed to create snapshot directory {}: {}",
                archiver.snapshots_dir().display(),
                e
            ))
        })?;
        Ok(archiver)
    }

    fn snapshots_dir(&self) -> PathBuf {
        self.work_dir.join(SNAPSHOTS_SUBDIR)
    }

    fn snapshot_path(&self, backup_id: &str, level: u32) -> PathBuf {
        let level_token = if level > 0 {
            format!(".{}", level)
        } else {
            String::new()
        };
        self.snapshots_dir()
            .join(format!("{}{}{}", backup_id, level_token, SNAPSHOT_SUFFIX))
    }

    /// Stored snapshot files keyed by their name without the suffix
    fn snapshot_stems(&self) -> ArchiveResult<BTreeMap<String, PathBuf>> {
        let dir = self.snapshots_dir();
        let entries = fs::read_dir(&dir).map_err(|e| {
            ArchiveError::Io(format!(
                "Snapshot directory {} is not accessible: {}",
                dir.display(),
                e
            ))
        })?;

        let mut stems = BTreeMap::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stem) = file_name.strip_suffix(SNAPSHOT_SUFFIX) {
                stems.insert(stem.to_string(), entry.path());
            }
        }
        Ok(stems)
    }

    /// `(level, path)` of the snapshots of one backup
    fn snapshots(&self, backup_id: &str) -> ArchiveResult<Vec<(u32, PathBuf)>> {
        Ok(snapshot_chain(&self.snapshot_stems()?, backup_id)
            .into_iter()
            .map(|(level, _, path)| (level, path.to_path_buf()))
            .collect())
    }

    fn remove_snapshots_from(&self, backup_id: &str, from_level: u32) -> ArchiveResult<()> {
        for (level, path) in self.snapshots(backup_id)? {
            if level >= from_level {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn run_tar(
        &self,
        arguments: Vec<OsString>,
        env: Option<(&'static str, String)>,
        on_event: EventCallback<'_>,
    ) -> ArchiveResult<()> {
        let mut command = Command::new(&self.tar_binary);
        command
            .args(&arguments)
            .env("LC_MESSAGES", "C")
            .env_remove("LC_ALL");
        if let Some((name, value)) = env {
            command.env(name, value);
        }

        tracing::debug!(binary = %self.tar_binary.display(), ?arguments, "running tar");
        let output = command.output().map_err(|e| {
            ArchiveError::BackupFailed(format!(
                "Error while executing external archiving program {}: {}",
                self.tar_binary.display(),
                e
            ))
        })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if !line.is_empty() {
                on_event(&ArchiverEvent::FileAdded(line.to_string()));
            }
        }

        let mut error_occurred = false;
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            match parse_tar_message(line, &self.tar_binary) {
                TarMessage::Ignore => {}
                TarMessage::Fatal(message) => return Err(ArchiveError::BackupAborted(message)),
                TarMessage::Event(event) => {
                    error_occurred |= is_serious(&event);
                    on_event(&event);
                }
            }
        }

        match output.status.code() {
            Some(0) => Ok(()),
            Some(1) => {
                on_event(&ArchiverEvent::error(
                    BackupSubOperation::Finish,
                    BackupOperationError::SomeFilesChanged,
                    None,
                    None,
                ));
                Ok(())
            }
            // Failures already reported per file
            Some(_) if error_occurred => Ok(()),
            Some(code) => Err(ArchiveError::BackupAborted(format!(
                "Unexpected failure of the archiver program; exit code: {}",
                code
            ))),
            None => Err(ArchiveError::BackupAborted(
                "The archiver program was terminated by a signal".into(),
            )),
        }
    }

    fn finish_backup(&self, definition: &BackupDefinition, working: &Path, backup: &Path) -> ArchiveResult<()> {
        if working != backup {
            fs::rename(working, backup).map_err(|e| {
                ArchiveError::BackupFailed(format!(
                    "Unable to move \"{}\" to \"{}\": {}",
                    working.display(),
                    backup.display(),
                    e
                ))
            })?;
        }
        tracing::debug!(archive = %definition.backup_id, path = %backup.display(), "tar backup written");
        Ok(())
    }
}

impl Archiver for ExternalTarArchiver {
    fn supported_backup_types(&self) -> BTreeSet<BackupType> {
        [BackupType::Tar, BackupType::TarGz, BackupType::TarBz2, BackupType::TarXz]
            .into_iter()
            .collect()
    }

    fn supported_features(&self, backup_type: Option<BackupType>) -> BTreeSet<ArchiverFeature> {
        let mut features: BTreeSet<_> = [ArchiverFeature::Incremental].into_iter().collect();
        if backup_type.map_or(true, |t| t.is_compressed()) {
            features.insert(ArchiverFeature::CompressionStrength);
        }
        features
    }

    fn backup_files(
        &self,
        definition: &BackupDefinition,
        compression_level: Option<u8>,
        on_event: EventCallback<'_>,
    ) -> ArchiveResult<PathBuf> {
        check_backup_request(self, definition, compression_level, false)?;

        let backup_path = definition.backup_file_path(None);
        let working_path = definition.working_path(&backup_path);
        let arguments = tar_arguments(definition, &working_path, None);
        let env = compression_env(
            definition.backup_type,
            compression_level,
            |name| std::env::var(name).ok(),
        );

        self.run_tar(arguments, env, on_event)?;
        self.finish_backup(definition, &working_path, &backup_path)?;
        Ok(backup_path)
    }

    fn backup_files_incrementally(
        &self,
        definition: &BackupDefinition,
        compression_level: Option<u8>,
        level: Option<u32>,
        on_event: EventCallback<'_>,
    ) -> ArchiveResult<PathBuf> {
        check_backup_request(self, definition, compression_level, true)?;

        let id = &definition.backup_id;
        let max_level = self.max_backup_level(id)?;
        let level = level.unwrap_or(max_level);
        if level > max_level {
            return Err(ArchiveError::Config(format!(
                "Backup level {} is out of range 0-{}",
                level, max_level
            )));
        }

        let snapshot = self.snapshot_path(id, level);
        let working_snapshot = partial_path(&snapshot);
        if level > 0 {
            fs::copy(self.snapshot_path(id, level - 1), &working_snapshot)?;
        } else if working_snapshot.exists() {
            fs::remove_file(&working_snapshot)?;
        }

        let backup_path = definition.backup_file_path(Some(level));
        let working_path = definition.working_path(&backup_path);
        let arguments = tar_arguments(definition, &working_path, Some(&working_snapshot));
        let env = compression_env(
            definition.backup_type,
            compression_level,
            |name| std::env::var(name).ok(),
        );

        let result = self
            .run_tar(arguments, env, on_event)
            .and_then(|_| self.finish_backup(definition, &working_path, &backup_path))
            .and_then(|_| {
                self.remove_snapshots_from(id, level + 1)?;
                fs::rename(&working_snapshot, &snapshot)?;
                Ok(())
            });

        if working_snapshot.exists() {
            if let Err(e) = fs::remove_file(&working_snapshot) {
                tracing::warn!(path = %working_snapshot.display(), error = %e, "unable to remove working snapshot");
            }
        }

        result.map(|_| backup_path)
    }

    fn remove_backup_increments(
        &self,
        definition: &BackupDefinition,
        from_level: u32,
    ) -> ArchiveResult<()> {
        if !self
            .supported_backup_types()
            .contains(&definition.backup_type)
        {
            return Err(ArchiveError::Unsupported(format!(
                "Unsupported backup type: {}",
                definition.backup_type
            )));
        }

        let id = &definition.backup_id;
        let mut level = from_level;
        loop {
            let backup = definition.backup_file_path(Some(level));
            if !backup.exists() {
                break;
            }
            fs::remove_file(&backup)?;
            let snapshot = self.snapshot_path(id, level);
            if snapshot.exists() {
                fs::remove_file(snapshot)?;
            }
            level += 1;
        }

        if self.max_backup_level(id)? > from_level {
            self.remove_snapshots_from(id, from_level)?;
        }
        Ok(())
    }

    fn max_backup_level(&self, backup_id: &str) -> ArchiveResult<u32> {
        Ok(self
            .snapshots(backup_id)?
            .last()
            .map_or(0, |(level, _)| level + 1))
    }

    fn stored_backup_ids(&self) -> ArchiveResult<BTreeSet<String>> {
        let stems = self.snapshot_stems()?;
        let increments: BTreeSet<&str> = stems
            .keys()
            .flat_map(|id| snapshot_chain(&stems, id).into_iter().skip(1))
            .map(|(_, stem, _)| stem)
            .collect();
        Ok(stems
            .keys()
            .filter(|stem| !increments.contains(stem.as_str()))
            .cloned()
            .collect())
    }

    fn purge_stored_backup_data(&self, backup_id: &str) -> ArchiveResult<()> {
        self.remove_snapshots_from(backup_id, 0)
    }
}

/// Snapshots of `backup_id` as `(level, stem, path)`, lowest level first
///
/// Levels are written in order from 0, so only the unbroken run starting at
/// level 0 belongs to the backup. A stem like `photos.2023` without a
/// `photos` level 0 snapshot is therefore a backup of its own.
fn snapshot_chain<'a>(
    stems: &'a BTreeMap<String, PathBuf>,
    backup_id: &str,
) -> Vec<(u32, &'a str, &'a Path)> {
    let levels: BTreeMap<u32, (&str, &Path)> = stems
        .iter()
        .filter_map(|(stem, path)| {
            level_of_stem(stem, backup_id).map(|level| (level, (stem.as_str(), path.as_path())))
        })
        .collect();
    levels
        .into_iter()
        .zip(0u32..)
        .take_while(|((level, _), expected)| level == expected)
        .map(|((level, (stem, path)), _)| (level, stem, path))
        .collect()
}

/// Find the tar binary on the `PATH` or in the usual places
pub fn locate_tar() -> Option<PathBuf> {
    let path_dirs = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();

    path_dirs
        .into_iter()
        .chain(TAR_FALLBACK_DIRS.iter().map(PathBuf::from))
        .map(|dir| dir.join(TAR_BINARY))
        .find(|candidate| candidate.is_file())
}

/// Command line for one tar run
pub fn tar_arguments(
    definition: &BackupDefinition,
    archive_path: &Path,
    snapshot: Option<&Path>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--create".into(), "--format=posix".into(), "--verbose".into()];

    match definition.backup_type {
        BackupType::Tar => {}
        BackupType::TarGz => args.push("--gzip".into()),
        BackupType::TarBz2 => args.push("--bzip2".into()),
        BackupType::TarXz => args.push("--xz".into()),
    }

    if let Some(snapshot) = snapshot {
        args.push(prefixed("--listed-incremental=", snapshot.as_os_str()));
    }
    args.push(prefixed("--file=", archive_path.as_os_str()));
    args.push(prefixed("--directory=", definition.root.as_os_str()));

    if !definition.exclude_files.is_empty() {
        args.push("--anchored".into());
    }
    for exclude in &definition.exclude_files {
        args.push(format!("--exclude={}", exclude).into());
    }

    args.push("--".into());
    args.extend(definition.include_files.iter().map(OsString::from));
    args
}

fn prefixed(prefix: &str, value: &std::ffi::OsStr) -> OsString {
    let mut arg = OsString::from(prefix);
    arg.push(value);
    arg
}

/// Environment variable passing the compression level to the compressor
///
/// An existing value of the variable is kept in front of the level.
pub fn compression_env(
    backup_type: BackupType,
    compression_level: Option<u8>,
    current: impl Fn(&str) -> Option<String>,
) -> Option<(&'static str, String)> {
    let level = compression_level?;
    let (name, level) = match backup_type {
        BackupType::Tar => return None,
        BackupType::TarGz => ("GZIP", level.max(1)),
        BackupType::TarBz2 => ("BZIP2", level.max(1)),
        BackupType::TarXz => ("XZ_OPT", level),
    };
    let value = match current(name) {
        Some(existing) if !existing.is_empty() => format!("{} -{}", existing, level),
        _ => format!("-{}", level),
    };
    Some((name, value))
}

/// Classify one line tar wrote to stderr
pub fn parse_tar_message(line: &str, binary: &Path) -> TarMessage {
    let line = line.trim_end();
    if line.is_empty() {
        return TarMessage::Ignore;
    }

    // Drop the leading "tar: "
    let message = line.split_once(": ").map_or(line, |(_, rest)| rest);
    // Byte offsets found in `lower` are used to slice `message`
    let lower = message.to_ascii_lowercase();

    if lower.contains("exiting with failure status due to previous errors")
        || lower.ends_with(": directory is new")
    {
        return TarMessage::Ignore;
    }

    for (marker, operation) in [
        (": cannot stat: ", BackupSubOperation::Stat),
        (": cannot open: ", BackupSubOperation::Open),
    ] {
        if let Some(idx) = lower.find(marker) {
            let path = &message[..idx];
            let detail = &message[idx + marker.len()..];
            let error = if detail.contains("Permission denied") {
                BackupOperationError::PermissionDenied
            } else {
                BackupOperationError::UnknownOsError
            };
            let detail = (error == BackupOperationError::UnknownOsError).then_some(detail);
            return TarMessage::Event(ArchiverEvent::error(operation, error, Some(path), detail));
        }
    }

    for (marker, operation, error) in [
        (
            ": socket ignored",
            BackupSubOperation::Open,
            BackupOperationError::SocketIgnored,
        ),
        (
            ": file changed as we read it",
            BackupSubOperation::Read,
            BackupOperationError::FileChanged,
        ),
        (
            ": directory has been renamed",
            BackupSubOperation::Read,
            BackupOperationError::DirectoryRenamed,
        ),
        (
            ": unknown file type; file ignored",
            BackupSubOperation::Open,
            BackupOperationError::UnknownTypeIgnored,
        ),
    ] {
        if let Some(idx) = lower.find(marker) {
            return TarMessage::Event(ArchiverEvent::error(
                operation,
                error,
                Some(&message[..idx]),
                None,
            ));
        }
    }

    if lower.contains("no space left on device") {
        return TarMessage::Fatal("No space left on device.".into());
    }
    if lower.contains("unrecognized option") || (lower.contains("try") && lower.contains("--help")) {
        return TarMessage::Fatal(format!(
            "Incompatible external archiver binary: {} ({}).",
            binary.display(),
            message
        ));
    }
    if lower.contains("error is not recoverable: exiting now") {
        return TarMessage::Fatal("External archiver aborted.".into());
    }

    match message.rsplit_once(": ") {
        Some((path, detail)) => TarMessage::Event(ArchiverEvent::error(
            BackupSubOperation::UnknownFileOperation,
            BackupOperationError::UnknownError,
            Some(path),
            Some(detail),
        )),
        None => TarMessage::Event(ArchiverEvent::error(
            BackupSubOperation::UnknownFileOperation,
            BackupOperationError::UnknownError,
            None,
            Some(message),
        )),
    }
}

/// Whether an event means some data is missing from the backup
fn is_serious(event: &ArchiverEvent) -> bool {
    match event {
        ArchiverEvent::OperationError {
            operation, error, ..
        } => {
            *operation != BackupSubOperation::Finish
                && matches!(
                    error,
                    BackupOperationError::PermissionDenied
                        | BackupOperationError::UnknownOsError
                        | BackupOperationError::UnknownError
                )
        }
        ArchiverEvent::FileAdded(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn definition(root: &Path, dest: &Path) -> BackupDefinition {
        BackupDefinition {
            backup_id: "home".into(),
            backup_type: BackupType::TarGz,
            destination: dest.to_path_buf(),
            root: root.to_path_buf(),
            include_files: ["docs".to_string(), "-odd".to_string()].into_iter().collect(),
            exclude_files: ["docs/tmp".to_string()].into_iter().collect(),
            overwrite_at_start: false,
        }
    }

    fn archiver(work: &TempDir) -> ExternalTarArchiver {
        ExternalTarArchiver::with_binary(work.path().to_path_buf(), PathBuf::from("/bin/tar"))
            .unwrap()
    }

    fn event(message: &str) -> ArchiverEvent {
        match parse_tar_message(message, Path::new("/bin/tar")) {
            TarMessage::Event(event) => event,
            other => panic!("expected event for {:?}, got {:?}", message, other),
        }
    }

    #[test]
    fn test_arguments() {
        let def = definition(Path::new("/home/user"), Path::new("/backups"));
        let args = tar_arguments(
            &def,
            Path::new("/backups/home.2.tar.gz._partial"),
            Some(Path::new("/work/snapshots/home.2.snar._partial")),
        );
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(
            args,
            vec![
                "--create",
                "--format=posix",
                "--verbose",
                "--gzip",
                "--listed-incremental=/work/snapshots/home.2.snar._partial",
                "--file=/backups/home.2.tar.gz._partial",
                "--directory=/home/user",
                "--anchored",
                "--exclude=docs/tmp",
                "--",
                "-odd",
                "docs",
            ]
        );
    }

    #[test]
    fn test_compression_env() {
        let none = |_: &str| None;
        assert_eq!(
            compression_env(BackupType::TarGz, Some(0), none),
            Some(("GZIP", "-1".to_string()))
        );
        assert_eq!(
            compression_env(BackupType::TarXz, Some(0), none),
            Some(("XZ_OPT", "-0".to_string()))
        );
        assert_eq!(compression_env(BackupType::Tar, Some(5), none), None);
        assert_eq!(compression_env(BackupType::TarBz2, None, none), None);
        assert_eq!(
            compression_env(BackupType::TarBz2, Some(7), |_| Some("-q".to_string())),
            Some(("BZIP2", "-q -7".to_string()))
        );
    }

    #[test]
    fn test_parse_file_errors() {
        assert_eq!(
            event("tar: docs/secret: Cannot open: Permission denied"),
            ArchiverEvent::error(
                BackupSubOperation::Open,
                BackupOperationError::PermissionDenied,
                Some("docs/secret"),
                None
            )
        );
        assert_eq!(
            event("tar: gone: Cannot stat: No such file or directory"),
            ArchiverEvent::error(
                BackupSubOperation::Stat,
                BackupOperationError::UnknownOsError,
                Some("gone"),
                Some("No such file or directory")
            )
        );
        assert_eq!(
            event("tar: run/app.sock: socket ignored"),
            ArchiverEvent::error(
                BackupSubOperation::Open,
                BackupOperationError::SocketIgnored,
                Some("run/app.sock"),
                None
            )
        );
        assert_eq!(
            event("tar: log.txt: file changed as we read it"),
            ArchiverEvent::error(
                BackupSubOperation::Read,
                BackupOperationError::FileChanged,
                Some("log.txt"),
                None
            )
        );
        assert_eq!(
            event("tar: new: Directory has been renamed from `old'"),
            ArchiverEvent::error(
                BackupSubOperation::Read,
                BackupOperationError::DirectoryRenamed,
                Some("new"),
                None
            )
        );
    }

    #[test]
    fn test_parse_ignored_and_fatal_lines() {
        let tar = Path::new("/bin/tar");
        assert_eq!(
            parse_tar_message("tar: Exiting with failure status due to previous errors", tar),
            TarMessage::Ignore
        );
        assert_eq!(
            parse_tar_message("tar: docs/new: Directory is new", tar),
            TarMessage::Ignore
        );
        assert_eq!(
            parse_tar_message("tar: home.tar.gz: Wrote only 4096 of 10240 bytes: No space left on device", tar),
            TarMessage::Fatal("No space left on device.".into())
        );
        assert!(matches!(
            parse_tar_message("tar: unrecognized option '--format=posix'", tar),
            TarMessage::Fatal(_)
        ));
        assert_eq!(
            parse_tar_message("tar: Error is not recoverable: exiting now", tar),
            TarMessage::Fatal("External archiver aborted.".into())
        );
    }

    #[test]
    fn test_parse_unknown_lines() {
        assert_eq!(
            event("tar: weird/file: Something odd"),
            ArchiverEvent::error(
                BackupSubOperation::UnknownFileOperation,
                BackupOperationError::UnknownError,
                Some("weird/file"),
                Some("Something odd")
            )
        );
        assert!(is_serious(&event("tar: something happened")));
    }

    #[test]
    fn test_parse_non_ascii_file_names() {
        assert_eq!(
            event("tar: \u{e9}\u{212A}: Cannot open: Permission denied"),
            ArchiverEvent::error(
                BackupSubOperation::Open,
                BackupOperationError::PermissionDenied,
                Some("\u{e9}\u{212A}"),
                None
            )
        );
        assert_eq!(
            event("tar: \u{130}stanbul/m\u{fc}zik.sock: socket ignored"),
            ArchiverEvent::error(
                BackupSubOperation::Open,
                BackupOperationError::SocketIgnored,
                Some("\u{130}stanbul/m\u{fc}zik.sock"),
                None
            )
        );
        assert_eq!(
            event("tar: \u{3a3}\u{3a3}/\u{212B}: File changed as we read it"),
            ArchiverEvent::error(
                BackupSubOperation::Read,
                BackupOperationError::FileChanged,
                Some("\u{3a3}\u{3a3}/\u{212B}"),
                None
            )
        );
    }

    #[test]
    fn test_snapshot_bookkeeping() {
        let work = TempDir::new().unwrap();
        let archiver = archiver(&work);
        assert_eq!(archiver.max_backup_level("home").unwrap(), 0);

        let snapshots = work.path().join("snapshots");
        for name in ["home.snar", "home.1.snar", "home.2.snar", "my.site.snar", "home.3.snar._partial"] {
            fs::write(snapshots.join(name), "").unwrap();
        }

        assert_eq!(archiver.max_backup_level("home").unwrap(), 3);
        assert_eq!(archiver.max_backup_level("my.site").unwrap(), 1);
        assert_eq!(archiver.max_backup_level("my").unwrap(), 0);
        assert_eq!(
            archiver.stored_backup_ids().unwrap(),
            ["home".to_string(), "my.site".to_string()].into_iter().collect()
        );

        archiver.purge_stored_backup_data("home").unwrap();
        assert_eq!(archiver.max_backup_level("home").unwrap(), 0);
        assert!(snapshots.join("my.site.snar").exists());
    }

    #[test]
    fn test_numeric_suffix_in_backup_id() {
        let work = TempDir::new().unwrap();
        let archiver = archiver(&work);
        let snapshots = work.path().join("snapshots");
        fs::write(snapshots.join("photos.2023.snar"), "").unwrap();

        assert_eq!(archiver.max_backup_level("photos.2023").unwrap(), 1);
        assert_eq!(archiver.max_backup_level("photos").unwrap(), 0);
        assert_eq!(
            archiver.stored_backup_ids().unwrap(),
            ["photos.2023".to_string()].into_iter().collect()
        );

        // Both archives side by side
        fs::write(snapshots.join("photos.snar"), "").unwrap();
        fs::write(snapshots.join("photos.1.snar"), "").unwrap();
        assert_eq!(archiver.max_backup_level("photos").unwrap(), 2);
        assert_eq!(archiver.max_backup_level("photos.2023").unwrap(), 1);
        assert_eq!(
            archiver.stored_backup_ids().unwrap(),
            ["photos".to_string(), "photos.2023".to_string()].into_iter().collect()
        );

        archiver.purge_stored_backup_data("photos").unwrap();
        assert!(snapshots.join("photos.2023.snar").exists());
        assert_eq!(archiver.max_backup_level("photos.2023").unwrap(), 1);
    }

    #[test]
    fn test_remove_backup_increments() {
        let work = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let archiver = archiver(&work);
        let def = definition(Path::new("/unused"), dest.path());
        let snapshots = work.path().join("snapshots");

        for level in 0..4u32 {
            fs::write(def.backup_file_path(Some(level)), "").unwrap();
            fs::write(archiver.snapshot_path("home", level), "").unwrap();
        }

        archiver.remove_backup_increments(&def, 2).unwrap();

        assert!(def.backup_file_path(Some(1)).exists());
        assert!(!def.backup_file_path(Some(2)).exists());
        assert!(!def.backup_file_path(Some(3)).exists());
        assert!(snapshots.join("home.1.snar").exists());
        assert_eq!(archiver.max_backup_level("home").unwrap(), 2);
    }

    fn gnu_tar() -> Option<PathBuf> {
        let tar = locate_tar()?;
        let output = Command::new(&tar).arg("--version").output().ok()?;
        String::from_utf8_lossy(&output.stdout)
            .contains("GNU tar")
            .then_some(tar)
    }

    #[test]
    fn test_incremental_backups_with_gnu_tar() {
        let tar = match gnu_tar() {
            Some(tar) => tar,
            None => return,
        };
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("docs")).unwrap();
        fs::write(root.path().join("docs/a.txt"), "a").unwrap();

        let archiver =
            ExternalTarArchiver::with_binary(work.path().to_path_buf(), tar).unwrap();
        let mut def = definition(root.path(), dest.path());
        def.include_files = ["docs".to_string()].into_iter().collect();
        def.exclude_files.clear();

        let mut added = Vec::new();
        let level0 = archiver
            .backup_files_incrementally(&def, Some(1), None, &mut |e| {
                if let ArchiverEvent::FileAdded(name) = e {
                    added.push(name.clone());
                }
            })
            .unwrap();
        assert_eq!(level0, dest.path().join("home.tar.gz"));
        assert!(added.iter().any(|n| n.contains("a.txt")));
        assert_eq!(archiver.max_backup_level("home").unwrap(), 1);

        fs::write(root.path().join("docs/b.txt"), "b").unwrap();
        let level1 = archiver
            .backup_files_incrementally(&def, None, None, &mut |_| {})
            .unwrap();
        assert_eq!(level1, dest.path().join("home.1.tar.gz"));
        assert_eq!(archiver.max_backup_level("home").unwrap(), 2);

        archiver
            .backup_files_incrementally(&def, None, Some(0), &mut |_| {})
            .unwrap();
        assert_eq!(archiver.max_backup_level("home").unwrap(), 1);
    }
}
