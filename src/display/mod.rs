//! Display formatting for terminal output

pub mod archive;

pub use archive::{format_archive_details, format_archive_list, format_levels, ArchiveRow};
