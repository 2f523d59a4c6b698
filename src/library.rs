//! Detection of beatmap sets already present in the destination directory.
//!
//! osu! names imported set folders and mirror archives `"{id} {artist} - {title}"`,
//! and the fallback naming here is `"{id}.{ext}"`. Either form marks the
//! identifier as present.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use tracing::{debug, instrument};

use crate::input::Identifier;

/// Identifiers found in a destination directory.
#[derive(Debug, Clone, Default)]
pub struct LocalLibrary {
    present: HashSet<String>,
}

impl LocalLibrary {
    /// Scans `dir`; a missing directory yields an empty library.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory exists but cannot be listed.
    #[instrument(fields(dir = %dir.display()))]
    pub async fn scan(dir: &Path) -> io::Result<Self> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e),
        };

        let mut present = HashSet::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(id) = leading_identifier(name) {
                present.insert(id.to_string());
            }
        }

        debug!(count = present.len(), "scanned local library");
        Ok(Self { present })
    }

    /// Whether `identifier` is already present.
    #[must_use]
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.present.contains(identifier.as_str())
    }

    /// Number of distinct identifiers found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.present.len()
    }

    /// Whether nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Splits `identifiers` into (to fetch, already present), keeping order.
    #[must_use]
    pub fn partition(&self, identifiers: Vec<Identifier>) -> (Vec<Identifier>, Vec<Identifier>) {
        let (skipped, pending): (Vec<_>, Vec<_>) =
            identifiers.into_iter().partition(|id| self.contains(id));
        (pending, skipped)
    }
}

/// `"123 Artist - Title.osz"` → `123`, `"123.osz"` → `123`, `"123"` → `123`.
fn leading_identifier(name: &str) -> Option<&str> {
    let first = name.split_whitespace().next()?;
    let stem = match first.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => first,
    };
    (!stem.is_empty()).then_some(stem)
}
