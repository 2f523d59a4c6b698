//! Bounded concurrent fetch-with-retry engine.
//!
//! # Features
//!
//! - One shared, pooled HTTP client behind the [`Transport`] trait
//! - Filename from `Content-Disposition`, falling back to `{id}.{ext}`
//! - Fixed-delay retries driven by an explicit state machine
//! - A concurrency gate whose permit spans an identifier's whole lifecycle
//! - Temp-file-then-rename writes, so no partial files are left behind
//! - A per-identifier [`BatchReport`]
//! - Optional per-download byte progress bars ([`ProgressDisplay`])
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use beatmap_fetch::download::{DownloadEngine, HttpTransport};
//! use beatmap_fetch::{FetchConfig, Identifier};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(Arc::new(HttpTransport::new()), FetchConfig::default())?;
//! let report = engine.run(&[Identifier::from(1)], Path::new("./Songs")).await?;
//! for item in report.items() {
//!     println!("{}: {:?}", item.identifier, item.outcome);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
mod fetcher;
mod filename;
mod gate;
mod progress;
mod retry;

pub use client::{FetchRequest, HttpTransport, HttpTransportBuilder, Transport, TransportResponse};
pub use engine::{BatchReport, DownloadEngine, EngineError, ItemReport};
pub use error::DownloadError;
pub use fetcher::{
    AttemptFailure, AttemptOutcome, FetchOutcome, FetchState, ItemFetcher, Transition, transition,
};
pub use filename::{FilenamePolicy, fallback_filename, resolve_filename};
pub use gate::{ConcurrencyGate, GatePermit};
pub use progress::ProgressDisplay;
pub use retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, RetryDecision, RetryPolicy, RetryState};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
