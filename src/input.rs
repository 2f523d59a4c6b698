//! Identifier list parsing.
//!
//! The input is a plain text file of whitespace-separated identifiers, read
//! once and fully materialized before any fetch begins. A `#` starts a
//! comment that runs to the end of the line.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Opaque token naming one remote resource (normally a beatmap set id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Creates an identifier, returning `None` for blank input.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.len() == raw.len() {
            Some(Self(raw))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u32> for Identifier {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

/// Errors from loading an identifier list.
#[derive(Debug, Error)]
pub enum InputError {
    /// The identifier file could not be read.
    #[error("failed to read identifier list {path}: {source}")]
    Read {
        /// Path of the list file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Splits text into identifiers, preserving order and duplicates.
#[must_use]
pub fn parse_identifiers(text: &str) -> Vec<Identifier> {
    text.lines()
        .map(|line| line.split_once('#').map_or(line, |(before, _)| before))
        .flat_map(str::split_whitespace)
        .filter_map(Identifier::new)
        .collect()
}

/// Reads and parses an identifier list file.
///
/// # Errors
///
/// Returns [`InputError::Read`] if the file cannot be read as UTF-8 text.
#[instrument(fields(path = %path.display()))]
pub async fn read_identifier_file(path: &Path) -> Result<Vec<Identifier>, InputError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let identifiers = parse_identifiers(&text);
    debug!(count = identifiers.len(), "parsed identifier list");
    Ok(identifiers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<Identifier> {
        values.iter().map(|v| Identifier::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_parse_identifiers_newline_and_space_separated() {
        let parsed = parse_identifiers("100\n200 300\t400\r\n500\n");
        assert_eq!(parsed, ids(&["100", "200", "300", "400", "500"]));
    }

    #[test]
    fn test_parse_identifiers_preserves_order_and_duplicates() {
        let parsed = parse_identifiers("3 1 3 2");
        assert_eq!(parsed, ids(&["3", "1", "3", "2"]));
    }

    #[test]
    fn test_parse_identifiers_skips_comments_and_blank_lines() {
        let parsed = parse_identifiers("# ranked sets\n\n100 # first\n   \n200\n#300\n");
        assert_eq!(parsed, ids(&["100", "200"]));
    }

    #[test]
    fn test_parse_identifiers_empty_input() {
        assert!(parse_identifiers("").is_empty());
        assert!(parse_identifiers("  \n\t\n").is_empty());
    }

    #[test]
    fn test_identifier_new_rejects_blank() {
        assert!(Identifier::new("").is_none());
        assert!(Identifier::new("   ").is_none());
        assert_eq!(Identifier::new(" 42 ").unwrap().as_str(), "42");
    }

    #[test]
    fn test_identifier_from_u32_and_display() {
        let id = Identifier::from(1_234_567);
        assert_eq!(id.to_string(), "1234567");
    }

    #[tokio::test]
    async fn test_read_identifier_file_missing_returns_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.txt");
        let err = read_identifier_file(&missing).await.unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
        assert!(err.to_string().contains("nope.txt"));
    }

    #[tokio::test]
    async fn test_read_identifier_file_parses_contents() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("output");
        std::fs::write(&file, "1 2\n3\n").unwrap();
        let parsed = read_identifier_file(&file).await.unwrap();
        assert_eq!(parsed, ids(&["1", "2", "3"]));
    }
}
