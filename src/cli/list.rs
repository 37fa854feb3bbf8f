//! The `list` action
//!
//! Shows configured archives and, after them, orphaned ones: archives with
//! stored data whose declaration file is gone or invalid.

use std::collections::BTreeSet;

use super::{configured_spec_files, select_specs, ActionResult};
use crate::archiving::Archiving;
use crate::config::Verbosity;
use crate::display::archive::{format_archive_details, format_archive_list, ArchiveRow};
use crate::ui::MessageSink;

/// List the selected archives, or all of them when none is named
pub fn handle_list_command(
    archiving: &Archiving<'_>,
    sink: &dyn MessageSink,
    specs: &[String],
    all: bool,
) -> ActionResult {
    sink.reset_worst_kind();
    let list_all = all || specs.is_empty();
    let selected = select_specs(archiving, sink, specs, list_all);

    let mut known_files: Vec<_> = selected.iter().map(|spec| spec.path.clone()).collect();
    known_files.extend(configured_spec_files(archiving));
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
    let mut rows = Vec::new();
    for spec in &selected {
        if orphaned.contains(&spec.name) {
            continue;
        }
        sink.set_processed_archive(Some(spec.name.as_str()));
        match archiving.archive_info(&spec.path) {
            Some(info) => rows.push(ArchiveRow {
                info,
                orphaned: false,
            }),
            None => failed = true,
        }
    }

    let selected_names: BTreeSet<&str> = selected.iter().map(|spec| spec.name.as_str()).collect();
    for name in &orphaned {
        if !list_all && !selected_names.contains(name.as_str()) {
            continue;
        }
        sink.set_processed_archive(Some(name.as_str()));
        if let Some(info) = archiving.stored_archive_info(name) {
            rows.push(ArchiveRow {
                info,
                orphaned: true,
            });
        }
    }
    sink.set_processed_archive(None);

    if sink.verbosity() == Verbosity::Verbose {
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                sink.present_line("");
            }
            for line in format_archive_details(row, archiving.today()).lines() {
                sink.present_line(line);
            }
        }
    } else if !rows.is_empty() {
        for line in format_archive_list(&rows).lines() {
            sink.present_line(line);
        }
    }

    let result = ActionResult::from_worst_kind(sink.worst_kind());
    if failed {
        ActionResult::Failed
    } else {
        result
    }
}
