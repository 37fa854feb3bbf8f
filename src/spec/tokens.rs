//! Splitting of file list values into tokens
//!
//! Tokens are separated by whitespace. Double or single quotes keep
//! whitespace inside a token, and a backslash outside single quotes takes
//! the next character literally.

use crate::error::{ArchiveError, ArchiveResult};

/// Split a file list value into tokens
///
/// # Errors
///
/// Returns `InvalidSpec` for an unterminated quote or a trailing backslash.
pub fn split_tokens(value: &str) -> ArchiveResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('\''), c) => current.push(c),
            (_, '\\') => {
                let escaped = chars.next().ok_or_else(|| {
                    ArchiveError::InvalidSpec(format!("Trailing backslash in \"{}\"", value))
                })?;
                current.push(escaped);
                in_token = true;
            }
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(ArchiveError::InvalidSpec(format!(
            "Unterminated quote in \"{}\"",
            value
        )));
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}
