//! Archive declaration file parser
//!
//! A declaration has two sections:
//!
//! ```text
//! [Content]
//! name = home
//! path = /home/user
//! include-files = "My Documents" .bashrc src/*
//! exclude-files = src/target
//!
//! [Archive]
//! archiver = targz
//! incremental = yes
//! restarting = yes
//! restart-after-level = 5
//! ```
//!
//! Options are written `key = value` or `key: value`. A value continues on
//! following indented lines, so long file lists can be split:
//!
//! ```text
//! include-files = Documents
//!     Pictures
//!     "Old Mail"
//! ```
//!
//! Blank lines and lines starting with `#` or `;` are ignored. Anything
//! not listed above is rejected.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{ArchiveOption, ArchiveOptions};
use crate::error::{ArchiveError, ArchiveResult};

/// Options of the `[Content]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentOption {
    Name,
    Path,
    IncludeFiles,
    ExcludeFiles,
}

impl ContentOption {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Path => "path",
            Self::IncludeFiles => "include-files",
            Self::ExcludeFiles => "exclude-files",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Name, Self::Path, Self::IncludeFiles, Self::ExcludeFiles]
            .into_iter()
            .find(|o| o.name() == name)
    }
}

impl fmt::Display for ContentOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Content,
    Archive,
}

impl Section {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "Content" => Some(Self::Content),
            "Archive" => Some(Self::Archive),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Content => "Content",
            Self::Archive => "Archive",
        }
    }
}

/// Raw content of a declaration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    /// `[Content]` values, unparsed
    pub content: BTreeMap<ContentOption, String>,
    /// `[Archive]` values, typed
    pub archive: ArchiveOptions,
    /// Whether a `[Content]` section header was seen
    pub has_content_section: bool,
}

impl Declaration {
    /// Value of a `[Content]` option
    pub fn content_value(&self, option: ContentOption) -> Option<&str> {
        self.content.get(&option).map(String::as_str)
    }

    /// Value of a required `[Content]` option
    pub fn required(&self, option: ContentOption) -> ArchiveResult<&str> {
        self.content_value(option).ok_or_else(|| {
            ArchiveError::InvalidSpec(format!(
                "Option \"{}\" is missing in section [Content]",
                option
            ))
        })
    }
}

/// One `key = value` assignment with its continuation lines joined
struct Assignment {
    section: Section,
    key: String,
    value: String,
    line_no: usize,
}

/// Parse the text of a declaration file
///
/// # Errors
///
/// Returns `InvalidSpec` for unknown sections or options, options without
/// a value, duplicated options and bad option values.
pub fn parse_declaration(text: &str) -> ArchiveResult<Declaration> {
    let mut declaration = Declaration::default();
    let mut seen_archive: Vec<ArchiveOption> = Vec::new();

    for assignment in split_assignments(text, &mut declaration)? {
        let Assignment {
            section,
            key,
            value,
            line_no,
        } = assignment;
        let value = value.trim();

        match section {
            Section::Content => {
                let option = ContentOption::from_name(&key).ok_or_else(|| {
                    syntax_error(line_no, format!("Unknown option \"{}\" in section [Content]", key))
                })?;
                if declaration.content.insert(option, value.to_string()).is_some() {
                    return Err(syntax_error(
                        line_no,
                        format!("Option \"{}\" is set more than once", key),
                    ));
                }
            }
            Section::Archive => {
                let option = ArchiveOption::from_name(&key).ok_or_else(|| {
                    syntax_error(line_no, format!("Unknown option \"{}\" in section [Archive]", key))
                })?;
                if seen_archive.contains(&option) {
                    return Err(syntax_error(
                        line_no,
                        format!("Option \"{}\" is set more than once", key),
                    ));
                }
                seen_archive.push(option);
                declaration
                    .archive
                    .set_from_str(option, value)
                    .map_err(|e| match e {
                        ArchiveError::InvalidSpec(msg) => syntax_error(line_no, msg),
                        other => other,
                    })?;
            }
        }
    }

    Ok(declaration)
}

/// Split the text into assignments, recording section headers on the way
fn split_assignments(text: &str, declaration: &mut Declaration) -> ArchiveResult<Vec<Assignment>> {
    let mut assignments: Vec<Assignment> = Vec::new();
    let mut section: Option<Section> = None;
    // Whether the last assignment may still take continuation lines
    let mut open_value = false;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let indented = raw_line.starts_with(|c: char| c.is_whitespace());
        if indented && open_value {
            if let Some(last) = assignments.last_mut() {
                last.value.push('\n');
                last.value.push_str(line);
                continue;
            }
        }

        if let Some(header) = line.strip_prefix('[') {
            let name = header.strip_suffix(']').ok_or_else(|| {
                syntax_error(line_no, format!("Malformed section header \"{}\"", line))
            })?;
            let parsed = Section::parse(name.trim()).ok_or_else(|| {
                syntax_error(line_no, format!("Unknown section \"{}\"", name.trim()))
            })?;
            if parsed == Section::Content {
                declaration.has_content_section = true;
            }
            section = Some(parsed);
            open_value = false;
            continue;
        }

        let current = section.ok_or_else(|| {
            syntax_error(line_no, "Option found before any section header".to_string())
        })?;

        let (key, value) = split_option(line).ok_or_else(|| {
            syntax_error(
                line_no,
                format!(
                    "Option without a value found in section [{}]: {}",
                    current.name(),
                    line
                ),
            )
        })?;
        assignments.push(Assignment {
            section: current,
            key: key.trim().to_ascii_lowercase(),
            value: value.trim().to_string(),
            line_no,
        });
        open_value = true;
    }

    Ok(assignments)
}

/// Split at the first `=` or `:`
fn split_option(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(['=', ':'])?;
    Some((&line[..idx], &line[idx + 1..]))
}

fn syntax_error(line_no: usize, message: String) -> ArchiveError {
    ArchiveError::InvalidSpec(format!("line {}: {}", line_no, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArchiverKind;

    #[test]
    fn test_parse_both_sections() {
        let text = "\
# backup of my home
[Content]
name = home
path = /home/user
include-files = \"a b\" c*
exclude-files =

[Archive]
archiver = tarbz2
incremental = yes
restart-after-level = 3
";
        let declaration = parse_declaration(text).unwrap();

        assert!(declaration.has_content_section);
        assert_eq!(declaration.content_value(ContentOption::Name), Some("home"));
        assert_eq!(
            declaration.content_value(ContentOption::IncludeFiles),
            Some("\"a b\" c*")
        );
        assert_eq!(declaration.content_value(ContentOption::ExcludeFiles), Some(""));
        assert_eq!(declaration.archive.archiver, Some(ArchiverKind::TarBz2));
        assert_eq!(declaration.archive.incremental, Some(true));
        assert_eq!(declaration.archive.restart_after_level, Some(3));
    }

    #[test]
    fn test_archive_section_is_optional() {
        let declaration = parse_declaration("[Content]\npath = /tmp\n").unwrap();
        assert_eq!(declaration.archive, ArchiveOptions::default());
        assert!(declaration.required(ContentOption::IncludeFiles).is_err());
    }

    #[test]
    fn test_option_without_value_is_rejected() {
        let err = parse_declaration("[Content]\npath = /tmp\ninclude-files =\nexclude-files\n")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Option without a value"));
        assert!(message.contains("Content"));
        assert!(message.contains("exclude-files"));
    }

    #[test]
    fn test_colon_delimiter_and_continuation_lines() {
        let text = "\
[Content]
path: /home/user
include-files = Documents
    Pictures
\t\"Old Mail\"

    # not part of the list
    Music
exclude-files:
    Pictures/tmp
[Archive]
Archiver: targz
";
        let declaration = parse_declaration(text).unwrap();

        assert_eq!(declaration.content_value(ContentOption::Path), Some("/home/user"));
        assert_eq!(
            declaration.content_value(ContentOption::IncludeFiles),
            Some("Documents\nPictures\n\"Old Mail\"\nMusic")
        );
        assert_eq!(
            declaration.content_value(ContentOption::ExcludeFiles),
            Some("Pictures/tmp")
        );
        assert_eq!(declaration.archive.archiver, Some(ArchiverKind::TarGz));
    }

    #[test]
    fn test_continued_list_splits_into_tokens() {
        let declaration = parse_declaration(
            "[Content]\npath = /\ninclude-files =\n  a b\n  \"c d\"\nexclude-files =\n",
        )
        .unwrap();
        let value = declaration.content_value(ContentOption::IncludeFiles).unwrap();

        assert_eq!(
            crate::spec::tokens::split_tokens(value).unwrap(),
            vec!["a".to_string(), "b".to_string(), "c d".to_string()]
        );
    }

    #[test]
    fn test_indented_line_after_header_is_an_option() {
        let declaration = parse_declaration("[Content]\n  path = /srv\n").unwrap();
        assert_eq!(declaration.content_value(ContentOption::Path), Some("/srv"));
    }

    #[test]
    fn test_unknown_section_and_options_are_rejected() {
        assert!(parse_declaration("[Commands]\nbefore = ls\n")
            .unwrap_err()
            .is_invalid_spec());
        assert!(parse_declaration("[Content]\ncolour = red\n").is_err());
        assert!(parse_declaration("[Archive]\nspeed = fast\n").is_err());
        assert!(parse_declaration("path = /tmp\n").is_err());
    }

    #[test]
    fn test_bad_value_reports_line() {
        let err = parse_declaration("[Content]\npath = /\n[Archive]\ncompression-level = 12\n")
            .unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn test_duplicate_option_is_rejected() {
        assert!(parse_declaration("[Content]\npath = /a\npath = /b\n").is_err());
        assert!(parse_declaration("[Archive]\nlevel = 1\nlevel = 2\n").is_err());
    }
}
