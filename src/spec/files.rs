//! Expansion of include/exclude tokens into paths relative to the root

use std::collections::BTreeSet;
use std::path::Path;

use crate::ui::MessageSink;

/// Remove leading `..` components and root markers from a token
///
/// `../../x/y` becomes `x/y` and `/bar/baz` becomes `bar/baz`, so a token
/// can never point outside the archive root.
pub fn sanitize_token(token: &str) -> &str {
    let mut rest = token;
    loop {
        let before = rest.len();
        rest = rest.trim_start_matches('/');
        if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        } else if rest == ".." {
            rest = "";
        }
        if rest.len() == before {
            return rest;
        }
    }
}

/// Expand tokens relative to `root`
///
/// Each token is sanitized and then matched with shell-style globbing. A
/// token that matches nothing is dropped with a warning. If `root` is not
/// an accessible directory an error is reported and the result is empty.
pub fn expand_tokens(root: &Path, tokens: &[String], sink: &dyn MessageSink) -> BTreeSet<String> {
    let mut files = BTreeSet::new();

    if !root.is_dir() {
        sink.show_error(&format!(
            "Unable to expand file names: directory \"{}\" is not accessible.",
            root.display()
        ));
        return files;
    }

    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());

    for token in tokens {
        let relative = sanitize_token(token);
        if relative.is_empty() {
            continue;
        }

        let pattern = format!("{}/{}", escaped_root.trim_end_matches('/'), relative);
        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                sink.show_warning(&format!("Bad file pattern \"{}\": {}", token, e));
                continue;
            }
        };

        let mut matched = false;
        for entry in entries {
            match entry {
                Ok(path) => {
                    let name = path
                        .strip_prefix(root)
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_else(|_| path.to_string_lossy().into_owned());
                    if !name.is_empty() {
                        files.insert(name);
                        matched = true;
                    }
                }
                Err(e) => sink.show_warning(&format!("Unable to read \"{}\": {}", e.path().display(), e)),
            }
        }

        if !matched {
            tracing::debug!(root = %root.display(), token = %token, "pattern matched nothing");
            sink.show_warning(&format!("No files matching \"{}\" were found.", token));
        }
    }

    files
}
