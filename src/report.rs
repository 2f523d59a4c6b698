//! JSON run report written after a batch.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::download::{BatchReport, ItemReport};
use crate::input::Identifier;

/// Errors from writing a run report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization failed.
    #[error("failed to serialize run report: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The report file could not be written.
    #[error("failed to write run report to {path}: {source}")]
    Write {
        /// Report path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Totals section of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    /// Identifiers submitted to the engine.
    pub submitted: usize,
    /// Identifiers whose payload was written.
    pub completed: usize,
    /// Identifiers that exhausted their attempts.
    pub failed: usize,
    /// Identifiers skipped because they were already present.
    pub skipped: usize,
    /// Retries across the batch.
    pub retried: u32,
}

/// Serializable summary of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    /// Destination directory.
    pub destination: &'a Path,
    /// Counts.
    pub totals: RunTotals,
    /// Per-identifier outcomes in submission order.
    pub items: &'a [ItemReport],
    /// Identifiers not submitted because they were already present.
    pub skipped: &'a [Identifier],
}

impl<'a> RunReport<'a> {
    /// Builds a report from a batch result and the skipped identifiers.
    #[must_use]
    pub fn new(destination: &'a Path, batch: &'a BatchReport, skipped: &'a [Identifier]) -> Self {
        Self {
            destination,
            totals: RunTotals {
                submitted: batch.total(),
                completed: batch.completed(),
                failed: batch.failed(),
                skipped: skipped.len(),
                retried: batch.retried(),
            },
            items: batch.items(),
            skipped,
        }
    }

    /// Renders the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialize`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if serialization or the write fails.
    pub async fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| ReportError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_json_shape() {
        let batch = BatchReport::default();
        let skipped = vec![Identifier::from(7)];
        let report = RunReport::new(Path::new("/songs"), &batch, &skipped);

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["destination"], "/songs");
        assert_eq!(value["totals"]["submitted"], 0);
        assert_eq!(value["totals"]["skipped"], 1);
        assert_eq!(value["skipped"][0], "7");
        assert!(value["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_to_missing_directory_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let batch = BatchReport::default();
        let report = RunReport::new(dir.path(), &batch, &[]);
        let err = report
            .write_to(&dir.path().join("missing").join("report.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
    }
}
