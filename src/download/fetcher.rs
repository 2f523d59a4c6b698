//! Single-item fetch lifecycle as an explicit state machine.
//!
//! ```text
//! Attempting(1) ──200──────────────▶ Succeeded(path)
//!      │
//!      └─failure, n < max──wait──▶ Attempting(n + 1)
//!      └─failure, n = max────────▶ ExhaustedFailed
//! ```
//!
//! Every failure kind (non-200 status, transport error, local write error)
//! follows the same retry path. [`transition`] is pure so the backoff and
//! terminal rules can be tested without a transport.

use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::client::{FetchRequest, Transport};
use super::error::DownloadError;
use super::filename::resolve_filename;
use super::retry::{RetryDecision, RetryPolicy, RetryState};
use crate::config::FetchConfig;
use crate::input::Identifier;

/// Lifecycle state of one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    /// Attempt `n` (1-indexed) is about to run.
    Attempting(u32),
    /// Payload persisted at the given path.
    Succeeded(PathBuf),
    /// All attempts failed.
    ExhaustedFailed,
}

impl FetchState {
    /// Whether this state ends the lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Attempting(_))
    }
}

/// Why one attempt did not produce a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptFailure {
    /// The server answered with a status other than 200.
    HttpFailure {
        /// HTTP status code.
        status: u16,
    },
    /// The request never produced a full response.
    TransportError {
        /// Error description.
        cause: String,
    },
    /// The payload arrived but could not be written.
    WriteError {
        /// Destination that failed.
        path: PathBuf,
        /// Error description.
        cause: String,
    },
    /// The lifecycle task died before reaching a terminal state.
    Aborted {
        /// Error description.
        cause: String,
    },
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpFailure { status } => write!(f, "HTTP status {status}"),
            Self::TransportError { cause } => write!(f, "transport error: {cause}"),
            Self::WriteError { path, cause } => {
                write!(f, "write error at {}: {cause}", path.display())
            }
            Self::Aborted { cause } => write!(f, "aborted: {cause}"),
        }
    }
}

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Payload written to this path.
    Success(PathBuf),
    /// Attempt failed.
    Failed(AttemptFailure),
}

/// Next state plus the wait required before entering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State to enter.
    pub next: FetchState,
    /// Backoff to sleep before entering `next`.
    pub wait: Option<Duration>,
}

/// Computes the state following `outcome` of attempt `attempt`.
#[must_use]
pub fn transition(attempt: u32, outcome: &AttemptOutcome, policy: &RetryPolicy) -> Transition {
    match outcome {
        AttemptOutcome::Success(path) => Transition {
            next: FetchState::Succeeded(path.clone()),
            wait: None,
        },
        AttemptOutcome::Failed(_) => match policy.should_retry(attempt) {
            RetryDecision::Retry { delay, attempt } => Transition {
                next: FetchState::Attempting(attempt),
                wait: Some(delay),
            },
            RetryDecision::DoNotRetry { .. } => Transition {
                next: FetchState::ExhaustedFailed,
                wait: None,
            },
        },
    }
}

/// Terminal result of one identifier's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The payload is on disk.
    Downloaded {
        /// Final file path.
        path: PathBuf,
        /// Attempts used, including the successful one.
        attempts: u32,
    },
    /// Every attempt failed.
    Failed {
        /// Attempts used.
        attempts: u32,
        /// Failure of the last attempt.
        last_failure: AttemptFailure,
    },
}

impl FetchOutcome {
    /// Whether the payload was persisted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }

    /// Attempts used by the lifecycle.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Downloaded { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }

    /// Path of the written file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Downloaded { path, .. } => Some(path),
            Self::Failed { .. } => None,
        }
    }
}

/// Runs one identifier's full lifecycle against a transport.
#[derive(Clone, Copy)]
pub struct ItemFetcher<'a> {
    transport: &'a dyn Transport,
    config: &'a FetchConfig,
    dest_dir: &'a Path,
}

impl<'a> ItemFetcher<'a> {
    /// Creates a fetcher writing into `dest_dir`.
    #[must_use]
    pub fn new(transport: &'a dyn Transport, config: &'a FetchConfig, dest_dir: &'a Path) -> Self {
        Self {
            transport,
            config,
            dest_dir,
        }
    }

    /// Drives the state machine to a terminal state.
    ///
    /// Failures never escape; they are reported in the returned outcome.
    #[instrument(skip(self, identifier), fields(id = %identifier))]
    pub async fn run(&self, identifier: &Identifier) -> FetchOutcome {
        let policy = self.config.retry_policy();
        let mut retry = RetryState::new();
        let mut last_failure = None;
        let mut state = FetchState::Attempting(1);

        loop {
            match state {
                FetchState::Attempting(attempt) => {
                    retry.record_attempt();
                    let request = self.config.url_template().bind(identifier);
                    debug!(attempt, url = %request.url(), "attempting download");

                    let outcome = self.attempt(&request).await;
                    let Transition { next, wait } = transition(attempt, &outcome, policy);
                    if let AttemptOutcome::Failed(failure) = outcome {
                        last_failure = Some(failure);
                    }

                    if let Some(delay) = wait {
                        warn!(
                            url = %request.url(),
                            delay_secs = delay.as_secs_f64(),
                            next_attempt = attempt + 1,
                            max_attempts = policy.max_attempts(),
                            "retrying {} in {} seconds",
                            request.url(),
                            delay.as_secs_f64()
                        );
                        tokio::time::sleep(delay).await;
                        retry.record_wait(delay);
                    }
                    state = next;
                }
                FetchState::Succeeded(path) => {
                    return FetchOutcome::Downloaded {
                        path,
                        attempts: retry.attempts(),
                    };
                }
                FetchState::ExhaustedFailed => {
                    let last_failure = last_failure.unwrap_or_else(|| AttemptFailure::Aborted {
                        cause: "no attempt was recorded".to_string(),
                    });
                    warn!(
                        attempts = retry.attempts(),
                        waited_secs = retry.waited().as_secs_f64(),
                        last_failure = %last_failure,
                        "giving up"
                    );
                    return FetchOutcome::Failed {
                        attempts: retry.attempts(),
                        last_failure,
                    };
                }
            }
        }
    }

    /// Performs one request and, on 200, persists the body.
    pub async fn attempt(&self, request: &FetchRequest) -> AttemptOutcome {
        let url = request.url();
        let response = match self.transport.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "error downloading {url}: {e}");
                return AttemptOutcome::Failed(AttemptFailure::TransportError {
                    cause: e.to_string(),
                });
            }
        };

        if response.status != 200 {
            warn!(
                url = %url,
                status = response.status,
                "failed to download {url}, status code: {}",
                response.status
            );
            return AttemptOutcome::Failed(AttemptFailure::HttpFailure {
                status: response.status,
            });
        }

        let filename = resolve_filename(
            &response.headers,
            request.identifier(),
            self.config.extension(),
            self.config.filename_policy(),
        );
        let path = self.dest_dir.join(&filename);
        let bytes = response.body.len();

        match persist(&path, response.body).await {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    bytes,
                    "downloaded {}",
                    path.display()
                );
                AttemptOutcome::Success(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to write payload");
                AttemptOutcome::Failed(AttemptFailure::WriteError {
                    path,
                    cause: e.to_string(),
                })
            }
        }
    }
}

/// Writes `body` to a uniquely named hidden sibling, then renames it over `path`.
///
/// An existing file at `path` is replaced. Concurrent writers of the same
/// name each get their own temporary file, so the last rename wins. The
/// temporary file is removed if any step fails.
pub(crate) async fn persist(path: &Path, body: Vec<u8>) -> Result<(), DownloadError> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomically(&target, &body))
        .await
        .map_err(|e| DownloadError::io(path.to_path_buf(), std::io::Error::other(e)))?
}

fn write_atomically(path: &Path, body: &[u8]) -> Result<(), DownloadError> {
    let Some(name) = path.file_name() else {
        return Err(DownloadError::io(
            path.to_path_buf(),
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "destination has no file name component",
            ),
        ));
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut prefix = OsString::from(".");
    prefix.push(name);
    prefix.push(".");

    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| DownloadError::io(path.to_path_buf(), e))?;
    temp.write_all(body)
        .map_err(|e| DownloadError::io(temp.path().to_path_buf(), e))?;
    temp.persist(path)
        .map_err(|e| DownloadError::io(path.to_path_buf(), e.error))?;
    Ok(())
}
