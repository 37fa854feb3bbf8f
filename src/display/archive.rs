//! Archive display formatting
//!
//! Formats archive information for the `list` action, either as a table or
//! as a detailed block per archive.
//!
//! Values that do not apply to an archive (e.g. restart figures of a
//! non-incremental one) are shown in brackets; unknown values as `-`, or as
//! `?` when they should be known but are not.

use chrono::NaiveDate;
use std::fmt::Display;

use crate::models::ArchiveInfo;

/// One row of the archive table
#[derive(Debug, Clone)]
pub struct ArchiveRow {
    pub info: ArchiveInfo,
    /// Stored data without a declaration file
    pub orphaned: bool,
}

fn dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn question<T: Display>(value: Option<T>, expected: bool) -> String {
    match value {
        None if expected => "?".to_string(),
        value => dash(value),
    }
}

fn bracket(token: String, inapplicable: bool) -> String {
    if inapplicable {
        format!("[{}]", token)
    } else {
        token
    }
}

/// Current, next and maximal backup level as `current/next/max`
pub fn format_levels(info: &ArchiveInfo) -> String {
    let incremental = info.incremental.unwrap_or(false);
    format!(
        "{}/{}/{}",
        bracket(dash(info.backup_level), !incremental),
        bracket(
            question(
                info.next_backup_level,
                info.incremental.is_some() && info.backup_level.is_some()
            ),
            !incremental
        ),
        bracket(dash(info.restart_after_level), !info.restart_enabled()),
    )
}

fn display_name(row: &ArchiveRow) -> String {
    bracket(row.info.name.clone(), row.orphaned)
}

fn display_root(info: &ArchiveInfo) -> String {
    question(
        info.root_path.as_ref().map(|p| p.display().to_string()),
        true,
    )
}

fn display_dest(info: &ArchiveInfo) -> String {
    dash(info.destination_dir.as_ref().map(|p| p.display().to_string()))
}

/// Format archives as a table
pub fn format_archive_list(rows: &[ArchiveRow]) -> String {
    if rows.is_empty() {
        return "No archives found.".to_string();
    }

    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|row| {
            [
                display_name(row),
                display_root(&row.info),
                display_dest(&row.info),
                format_levels(&row.info),
            ]
        })
        .collect();

    let width = |column: usize, header: &str| {
        cells
            .iter()
            .map(|c| c[column].len())
            .max()
            .unwrap_or(header.len())
            .max(header.len())
    };
    let name_width = width(0, "Name");
    let root_width = width(1, "Root");
    let dest_width = width(2, "Destination");

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:<root_width$}  {:<dest_width$}  {}\n",
        "Name",
        "Root",
        "Destination",
        "Levels",
        name_width = name_width,
        root_width = root_width,
        dest_width = dest_width,
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:-<root_width$}  {:-<dest_width$}  {:-<6}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
        root_width = root_width,
        dest_width = dest_width,
    ));

    for [name, root, dest, levels] in &cells {
        output.push_str(&format!(
            "{:<name_width$}  {:<root_width$}  {:<dest_width$}  {}\n",
            name,
            root,
            dest,
            levels,
            name_width = name_width,
            root_width = root_width,
            dest_width = dest_width,
        ));
    }

    output
}

/// Format everything known about one archive
pub fn format_archive_details(row: &ArchiveRow, today: NaiveDate) -> String {
    let info = &row.info;
    let inapplicable = !info.restart_enabled();

    let mut output = String::new();
    output.push_str(&format!("Name: {}\n", display_name(row)));
    output.push_str(&format!("Root: {}\n", display_root(info)));
    output.push_str(&format!("Archiver type: {}\n", dash(info.archiver)));
    output.push_str(&format!("Destination directory: {}\n", display_dest(info)));
    output.push_str(&format!(
        "Current backup level/next/max.: {}\n",
        format_levels(info)
    ));
    output.push_str(&format!(
        "Target backup level for non-full restart: {}\n",
        bracket(
            question(info.restart_level, info.incremental.is_some()),
            inapplicable
        )
    ));
    output.push_str(&format!(
        "Upcoming restart reason: {}\n",
        bracket(dash(info.restart_reason), inapplicable)
    ));
    output.push_str(&format!(
        "Restart count/max.: {}\n",
        bracket(
            format!(
                "{}/{}",
                dash(info.restart_count),
                dash(info.full_restart_after_count)
            ),
            inapplicable
        )
    ));
    output.push_str(&format!(
        "Days since last restart/max.: {}\n",
        bracket(
            format!(
                "{}/{}",
                dash(info.days_since_restart(today)),
                dash(info.restart_after_age_days)
            ),
            inapplicable
        )
    ));
    output.push_str(&format!(
        "Days since last full restart/max.: {}\n",
        bracket(
            format!(
                "{}/{}",
                dash(info.days_since_full_restart(today)),
                dash(info.full_restart_after_age_days)
            ),
            inapplicable
        )
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArchiverKind, RestartReason};
    use std::path::PathBuf;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn incremental_info() -> ArchiveInfo {
        ArchiveInfo {
            root_path: Some(PathBuf::from("/home/user")),
            archiver: Some(ArchiverKind::TarGz),
            destination_dir: Some(PathBuf::from("/backup")),
            incremental: Some(true),
            restarting: Some(true),
            backup_level: Some(2),
            next_backup_level: Some(3),
            restart_after_level: Some(5),
            restart_reason: Some(RestartReason::NoRestart),
            restart_level: Some(1),
            restart_count: Some(4),
            full_restart_after_count: Some(6),
            last_restart: Some(NaiveDate::from_ymd_opt(2024, 6, 5).unwrap()),
            ..ArchiveInfo::new("home")
        }
    }

    #[test]
    fn test_levels_of_restarting_archive() {
        assert_eq!(format_levels(&incremental_info()), "2/3/5");
    }

    #[test]
    fn test_levels_of_plain_archive_are_bracketed() {
        let info = ArchiveInfo {
            incremental: Some(false),
            restart_after_level: Some(10),
            ..ArchiveInfo::new("plain")
        };
        assert_eq!(format_levels(&info), "[-]/[-]/[10]");
    }

    #[test]
    fn test_unknown_next_level_is_questioned() {
        let info = ArchiveInfo {
            next_backup_level: None,
            ..incremental_info()
        };
        assert_eq!(format_levels(&info), "2/?/5");

        let stored = ArchiveInfo {
            backup_level: None,
            next_backup_level: None,
            ..incremental_info()
        };
        assert_eq!(format_levels(&stored), "-/-/5");
    }

    #[test]
    fn test_format_archive_list() {
        let rows = vec![
            ArchiveRow {
                info: incremental_info(),
                orphaned: false,
            },
            ArchiveRow {
                info: ArchiveInfo::new("gone"),
                orphaned: true,
            },
        ];
        let output = format_archive_list(&rows);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Name"));
        assert!(lines[1].starts_with("------"));
        assert!(lines[2].starts_with("home  "));
        assert!(lines[2].contains("/home/user"));
        assert!(lines[2].ends_with("2/3/5"));
        assert!(lines[3].starts_with("[gone]"));
        assert!(lines[3].contains(" ?"));
    }

    #[test]
    fn test_format_empty_list() {
        assert_eq!(format_archive_list(&[]), "No archives found.");
    }

    #[test]
    fn test_format_archive_details() {
        let row = ArchiveRow {
            info: incremental_info(),
            orphaned: false,
        };
        let output = format_archive_details(&row, today());

        assert!(output.contains("Name: home\n"));
        assert!(output.contains("Archiver type: targz\n"));
        assert!(output.contains("Current backup level/next/max.: 2/3/5\n"));
        assert!(output.contains("Target backup level for non-full restart: 1\n"));
        assert!(output.contains("Restart count/max.: 4/6\n"));
        assert!(output.contains("Days since last restart/max.: 10/-\n"));
        assert!(output.contains("Days since last full restart/max.: -/-\n"));
    }

    #[test]
    fn test_details_bracket_restart_figures_when_not_restarting() {
        let row = ArchiveRow {
            info: ArchiveInfo {
                restarting: Some(false),
                restart_level: None,
                ..incremental_info()
            },
            orphaned: true,
        };
        let output = format_archive_details(&row, today());

        assert!(output.contains("Name: [home]\n"));
        assert!(output.contains("Target backup level for non-full restart: [?]\n"));
        assert!(output.contains("Restart count/max.: [4/6]\n"));
    }
}
