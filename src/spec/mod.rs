//! Archive specification loading
//!
//! Turns a declaration file plus the run's [`Configuration`] into an
//! immutable [`ArchiveSpec`].

pub mod declaration;
pub mod files;
pub mod tokens;

pub use declaration::{parse_declaration, ContentOption, Declaration};
pub use files::{expand_tokens, sanitize_token};
pub use tokens::split_tokens;

use std::path::{Path, PathBuf};

use crate::config::Configuration;
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{ArchiveSpec, ArchiveSpecInfo};
use crate::ui::{MessageSink, RecordingSink};

/// Load an archive specification file
///
/// Warnings about unmatched file patterns go to `sink`; they do not fail
/// the load.
///
/// # Errors
///
/// Returns `InvalidSpec` if the file cannot be read, does not parse, lacks
/// a required option or names a root that is not a directory.
pub fn load(
    path: &Path,
    config: &Configuration,
    sink: &dyn MessageSink,
) -> ArchiveResult<ArchiveSpec> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ArchiveError::InvalidSpec(format!(
            "Unable to read archive specification file \"{}\": {}",
            path.display(),
            e
        ))
    })?;

    let declaration = parse_declaration(&text).map_err(|e| match e {
        ArchiveError::InvalidSpec(msg) => {
            ArchiveError::InvalidSpec(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;

    if !declaration.has_content_section {
        return Err(ArchiveError::InvalidSpec(format!(
            "{}: section [Content] is missing",
            path.display()
        )));
    }

    let root_path = PathBuf::from(declaration.required(ContentOption::Path)?);
    if !root_path.is_dir() {
        return Err(ArchiveError::InvalidSpec(format!(
            "Archive root \"{}\" is not a directory",
            root_path.display()
        )));
    }

    let name = match declaration.content_value(ContentOption::Name) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ArchiveSpecInfo::from_path(path).name,
    };
    if name.is_empty() {
        return Err(ArchiveError::InvalidSpec(format!(
            "{}: archive name is empty",
            path.display()
        )));
    }

    let include_tokens = split_tokens(declaration.required(ContentOption::IncludeFiles)?)?;
    let exclude_tokens = split_tokens(declaration.required(ContentOption::ExcludeFiles)?)?;

    let resolved = config.resolve(&declaration.archive);

    let spec = ArchiveSpec {
        include_files: expand_tokens(&root_path, &include_tokens, sink),
        exclude_files: expand_tokens(&root_path, &exclude_tokens, sink),
        name,
        spec_file: path.to_path_buf(),
        root_path,
        archiver: resolved.archiver,
        destination_dir: resolved.dest_dir,
        compression_level: resolved.compression_level,
        level: resolved.level,
        incremental: resolved.incremental,
        restarting: resolved.restarting,
        restart_after_level: resolved.restart_after_level,
        restart_after_age_days: resolved.restart_after_age,
        full_restart_after_count: resolved.full_restart_after_count,
        full_restart_after_age_days: resolved.full_restart_after_age,
        max_restart_level_size_percent: resolved.max_restart_level_size,
        remove_obsolete_backups: resolved.remove_obsolete_backups,
        overwrite_at_start: resolved.overwrite_at_start,
        keep_old_backups: resolved.keep_old_backups,
        number_of_old_backups: resolved.number_of_old_backups,
        command_before_backup: resolved.command_before_backup,
        command_after_backup: resolved.command_after_backup,
    };

    tracing::debug!(
        archive = %spec.name,
        includes = spec.include_files.len(),
        excludes = spec.exclude_files.len(),
        "loaded archive specification"
    );
    Ok(spec)
}

/// Whether `path` loads as a valid archive specification
///
/// Messages produced while loading are discarded.
pub fn validate(path: &Path, config: &Configuration) -> bool {
    let sink = RecordingSink::new();
    match load(path, config, &sink) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "invalid archive specification");
            false
        }
    }
}
