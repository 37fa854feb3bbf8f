//! The `purge` action

use std::collections::BTreeSet;

use super::{configured_spec_files, ActionResult};
use crate::archiving::Archiving;
use crate::ui::MessageSink;

const NO_NAME_GIVEN: &str = "No archive name given. Please pass the name of an archive as the \
program's argument or use option --all if you want to purge all orphaned archive data.";

/// Delete stored data of orphaned archives
///
/// Named archives that still have a valid declaration are left alone.
/// With `all`, every orphaned archive is purged.
pub fn handle_purge_command(
    archiving: &Archiving<'_>,
    sink: &dyn MessageSink,
    names: &[String],
    all: bool,
) -> ActionResult {
    if names.is_empty() && !all {
        sink.show_error(NO_NAME_GIVEN);
        return ActionResult::Failed;
    }

    sink.reset_worst_kind();
    let mut known_files = configured_spec_files(archiving);
    known_files.extend(names.iter().map(|name| archiving.spec_file_for(name)));
    let valid: BTreeSet<String> = archiving
        .filter_valid_spec_files(&known_files)
        .into_iter()
        .collect();
    let orphaned: BTreeSet<String> = archiving
        .stored_archive_names()
        .into_iter()
        .filter(|name| !valid.contains(name))
        .collect();

    let mut failed = false;
    let mut purged = BTreeSet::new();
    let purge = |name: &str| {
        sink.set_processed_archive(Some(name));
        sink.show_verbose(&format!("Purging {}.", name));
        if let Err(e) = archiving.purge_stored_archive_data(name) {
            sink.show_error(&format!("Purge failed: {}", e));
            return false;
        }
        true
    };

    for name in names {
        if orphaned.contains(name) {
            if !purge(name.as_str()) {
                failed = true;
            }
            purged.insert(name.clone());
        } else if valid.contains(name) {
            sink.set_processed_archive(Some(name.as_str()));
            sink.show_warning("Archive is not orphaned. Not purging.");
            failed = true;
        } else {
            sink.set_processed_archive(Some(name.as_str()));
            sink.show_info("Nothing to purge.");
        }
    }

    if all {
        for name in orphaned.difference(&purged) {
            if !purge(name.as_str()) {
                failed = true;
            }
        }
    }
    sink.set_processed_archive(None);

    if failed {
        ActionResult::Failed
    } else {
        ActionResult::from_worst_kind(sink.worst_kind())
    }
}
