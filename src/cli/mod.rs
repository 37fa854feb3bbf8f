//! CLI command handlers
//!
//! Bridges clap argument parsing with [`Archiving`]. Each action reports
//! through the message sink and returns an [`ActionResult`] instead of
//! stopping at the first broken archive.

pub mod create;
pub mod list;
pub mod options;
pub mod purge;

pub use create::handle_create_command;
pub use list::handle_list_command;
pub use options::OptionArgs;
pub use purge::handle_purge_command;

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::archiving::Archiving;
use crate::models::ArchiveSpecInfo;
use crate::ui::{MessageKind, MessageSink};

/// Overall outcome of an action, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionResult {
    /// Nothing worse than informational messages
    Successful,
    /// Warnings were shown
    Issues,
    /// At least one archive failed
    Failed,
}

impl ActionResult {
    /// Result implied by the worst message kind shown
    pub fn from_worst_kind(kind: Option<MessageKind>) -> Self {
        match kind {
            Some(MessageKind::Error) => Self::Failed,
            Some(MessageKind::Warning) => Self::Issues,
            _ => Self::Successful,
        }
    }

    /// Process exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Successful | Self::Issues => 0,
            Self::Failed => 1,
        }
    }
}

/// Resolve command-line arguments to specification files
///
/// With `all`, every configured specification is added. Duplicates are
/// dropped, keeping the order of first appearance.
pub(crate) fn select_specs(
    archiving: &Archiving<'_>,
    sink: &dyn MessageSink,
    arguments: &[String],
    all: bool,
) -> Vec<ArchiveSpecInfo> {
    let mut specs: Vec<ArchiveSpecInfo> = arguments
        .iter()
        .map(|argument| ArchiveSpecInfo::from_path(archiving.spec_file_for(argument)))
        .collect();

    if all {
        match archiving.archive_specs() {
            Ok(configured) => {
                if configured.is_empty() {
                    sink.show_warning("No configured archive specification files were found.");
                }
                specs.extend(configured);
            }
            Err(e) => sink.show_error(&format!(
                "An error occurred while obtaining the list of all archive specification files: {}",
                e
            )),
        }
    }

    let mut seen = BTreeSet::new();
    specs.retain(|spec| seen.insert(spec.path.clone()));
    specs
}

/// Configured specification files, or none when they cannot be listed
pub(crate) fn configured_spec_files(archiving: &Archiving<'_>) -> Vec<PathBuf> {
    archiving
        .archive_specs()
        .map(|specs| specs.into_iter().map(|spec| spec.path).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_result_from_worst_kind() {
        assert_eq!(ActionResult::from_worst_kind(None), ActionResult::Successful);
        assert_eq!(
            ActionResult::from_worst_kind(Some(MessageKind::Verbose)),
            ActionResult::Successful
        );
        assert_eq!(
            ActionResult::from_worst_kind(Some(MessageKind::Warning)),
            ActionResult::Issues
        );
        assert_eq!(
            ActionResult::from_worst_kind(Some(MessageKind::Error)),
            ActionResult::Failed
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ActionResult::Successful.exit_code(), 0);
        assert_eq!(ActionResult::Issues.exit_code(), 0);
        assert_eq!(ActionResult::Failed.exit_code(), 1);
        assert!(ActionResult::Failed > ActionResult::Issues);
    }
}
