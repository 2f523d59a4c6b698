//! Batch orchestrator: fans identifiers out through the concurrency gate.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use beatmap_fetch::{DownloadEngine, FetchConfig, HttpTransport, Identifier};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(Arc::new(HttpTransport::new()), FetchConfig::default())?;
//! let ids = vec![Identifier::from(100), Identifier::from(200)];
//! let report = engine.run(&ids, Path::new("./Songs")).await?;
//! println!("completed {}, failed {}", report.completed(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::client::Transport;
use super::fetcher::{AttemptFailure, FetchOutcome, ItemFetcher};
use super::gate::ConcurrencyGate;
use crate::config::FetchConfig;
use crate::input::Identifier;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Error type for orchestrator operations.
///
/// Individual fetch failures are never reported here; they are part of the
/// [`BatchReport`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Outcome for one submitted identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    /// The identifier as submitted.
    pub identifier: Identifier,
    /// Terminal outcome of its lifecycle.
    pub outcome: FetchOutcome,
}

/// Per-identifier results of a batch, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    items: Vec<ItemReport>,
}

impl BatchReport {
    /// All item reports in submission order.
    #[must_use]
    pub fn items(&self) -> &[ItemReport] {
        &self.items
    }

    /// Outcome for `identifier` (first occurrence if submitted twice).
    #[must_use]
    pub fn outcome(&self, identifier: &Identifier) -> Option<&FetchOutcome> {
        self.items
            .iter()
            .find(|item| &item.identifier == identifier)
            .map(|item| &item.outcome)
    }

    /// Number of identifiers whose payload was written.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_success()).count()
    }

    /// Number of identifiers that exhausted their attempts.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.items.len() - self.completed()
    }

    /// Total retries across the batch (attempts beyond the first).
    #[must_use]
    pub fn retried(&self) -> u32 {
        self.items
            .iter()
            .map(|i| i.outcome.attempts().saturating_sub(1))
            .sum()
    }

    /// Number of identifiers processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Identifiers that did not complete.
    pub fn failed_identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.items
            .iter()
            .filter(|i| !i.outcome.is_success())
            .map(|i| &i.identifier)
    }
}

/// Bounded concurrent fetch-with-retry engine.
///
/// # Concurrency Model
///
/// - Each identifier runs in its own Tokio task; all tasks are spawned in
///   input order before any is awaited
/// - A task acquires a gate permit before its first attempt and holds it
///   until its lifecycle is terminal (retries and backoff included)
/// - Retries of one identifier are sequential inside its task
#[derive(Clone)]
pub struct DownloadEngine {
    transport: Arc<dyn Transport>,
    config: Arc<FetchConfig>,
    gate: ConcurrencyGate,
}

impl std::fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("config", &self.config)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl DownloadEngine {
    /// Creates an engine over `transport` with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the configured
    /// concurrency is outside 1-100.
    #[instrument(level = "debug", skip(transport, config), fields(concurrency = config.max_concurrent()))]
    pub fn new(transport: Arc<dyn Transport>, config: FetchConfig) -> Result<Self, EngineError> {
        let concurrency = config.max_concurrent();
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = config.retry_policy().max_attempts(),
            retry_delay_secs = config.retry_policy().delay().as_secs_f64(),
            template = %config.url_template(),
            "creating download engine"
        );

        Ok(Self {
            transport,
            gate: ConcurrencyGate::new(concurrency),
            config: Arc::new(config),
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.gate.capacity()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Returns the gate, for instrumentation.
    #[must_use]
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Fetches every identifier into `dest_dir` and waits for all of them.
    ///
    /// Returns only after every lifecycle is terminal. Individual failures
    /// do NOT cause this method to error; they are recorded in the report.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the gate was closed.
    #[instrument(skip(self, identifiers), fields(count = identifiers.len(), dest = %dest_dir.display()))]
    pub async fn run(
        &self,
        identifiers: &[Identifier],
        dest_dir: &Path,
    ) -> Result<BatchReport, EngineError> {
        info!(
            count = identifiers.len(),
            concurrency = self.concurrency(),
            "starting batch"
        );

        let handles: Vec<_> = identifiers
            .iter()
            .cloned()
            .map(|identifier| {
                let transport = Arc::clone(&self.transport);
                let config = Arc::clone(&self.config);
                let gate = self.gate.clone();
                let dest_dir = dest_dir.to_path_buf();

                let handle = tokio::spawn({
                    let identifier = identifier.clone();
                    async move {
                        // Held for the whole lifecycle, released on drop.
                        let _permit = gate.acquire().await?;
                        let fetcher = ItemFetcher::new(transport.as_ref(), &config, &dest_dir);
                        Ok::<_, EngineError>(fetcher.run(&identifier).await)
                    }
                });
                (identifier, handle)
            })
            .collect();

        debug!(task_count = handles.len(), "waiting for downloads to complete");

        let mut items = Vec::with_capacity(handles.len());
        for (identifier, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => result?,
                Err(e) => {
                    warn!(id = %identifier, error = %e, "download task panicked");
                    FetchOutcome::Failed {
                        attempts: 0,
                        last_failure: AttemptFailure::Aborted {
                            cause: e.to_string(),
                        },
                    }
                }
            };
            items.push(ItemReport {
                identifier,
                outcome,
            });
        }

        let report = BatchReport { items };
        info!(
            completed = report.completed(),
            failed = report.failed(),
            retried = report.retried(),
            total = report.total(),
            "batch complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::download::HttpTransport;

    fn engine(concurrency: usize) -> Result<DownloadEngine, EngineError> {
        DownloadEngine::new(
            Arc::new(HttpTransport::new()),
            FetchConfig::default().with_max_concurrent(concurrency),
        )
    }

    #[test]
    fn test_engine_new_valid_concurrency() {
        assert_eq!(engine(1).unwrap().concurrency(), 1);
        assert_eq!(engine(5).unwrap().concurrency(), 5);
        assert_eq!(engine(100).unwrap().concurrency(), 100);
    }

    #[test]
    fn test_engine_new_invalid_concurrency() {
        assert!(matches!(
            engine(0),
            Err(EngineError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            engine(101),
            Err(EngineError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_engine_error_display() {
        let msg = EngineError::InvalidConcurrency { value: 0 }.to_string();
        assert!(msg.contains("invalid concurrency"));
        assert!(msg.contains("100"));
    }

    #[tokio::test]
    async fn test_run_empty_batch_returns_empty_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let report = engine(5).unwrap().run(&[], dir.path()).await.unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(report.completed(), 0);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.retried(), 0);
    }

    #[test]
    fn test_batch_report_counts() {
        let report = BatchReport {
            items: vec![
                ItemReport {
                    identifier: Identifier::from(1),
                    outcome: FetchOutcome::Downloaded {
                        path: PathBuf::from("1.osz"),
                        attempts: 2,
                    },
                },
                ItemReport {
                    identifier: Identifier::from(2),
                    outcome: FetchOutcome::Failed {
                        attempts: 3,
                        last_failure: AttemptFailure::HttpFailure { status: 500 },
                    },
                },
            ],
        };
        assert_eq!(report.completed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.retried(), 3);
        assert_eq!(report.total(), 2);
        assert_eq!(
            report.failed_identifiers().collect::<Vec<_>>(),
            vec![&Identifier::from(2)]
        );
        assert!(report.outcome(&Identifier::from(1)).unwrap().is_success());
        assert!(report.outcome(&Identifier::from(3)).is_none());
    }
}
