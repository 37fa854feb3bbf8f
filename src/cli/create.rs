//! The `create` action

use super::{select_specs, ActionResult};
use crate::archiving::Archiving;
use crate::ui::MessageSink;

const NO_SPEC_GIVEN: &str = "No archive specification given. Please pass the name or path to an \
archive specification file as the program's argument; or use option --all if you want to process \
all configured archive specifications.";

/// Create backups of the selected archives
///
/// Every archive is attempted even if an earlier one failed. The batch is
/// framed by `command-before-all-backups` and `command-after-all-backups`;
/// nothing is backed up when the first one fails.
pub fn handle_create_command(
    archiving: &Archiving<'_>,
    sink: &dyn MessageSink,
    specs: &[String],
    all: bool,
) -> ActionResult {
    if specs.is_empty() && !all {
        sink.show_error(NO_SPEC_GIVEN);
        return ActionResult::Failed;
    }

    sink.reset_worst_kind();
    if !archiving.run_command_before_all_backups() {
        return ActionResult::Failed;
    }
    for spec in select_specs(archiving, sink, specs, all) {
        sink.set_processed_archive(Some(spec.name.as_str()));
        sink.show_verbose(&format!("\nProcessing \"{}\"...", spec.name));
        if let Some(backup) = archiving.make_backup(&spec.path) {
            tracing::info!(archive = %spec.name, path = %backup.path.display(), "backup created");
        }
    }
    sink.set_processed_archive(None);
    archiving.run_command_after_all_backups();

    let result = ActionResult::from_worst_kind(sink.worst_kind());
    sink.show_verbose("");
    sink.show_verbose(match result {
        ActionResult::Successful => "Backup creation completed successfully.",
        ActionResult::Issues => {
            "Backup creation completed successfully. One or more warnings were shown. \
             Check program's output for details."
        }
        ActionResult::Failed => {
            "Backup creation for one or more archives finished with error(s)! \
             Check program's output for details."
        }
    });
    result
}
