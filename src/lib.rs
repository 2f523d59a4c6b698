//! Beatmap Fetch Library
//!
//! Bulk-downloads osu! beatmap sets from a mirror, given a list of set ids.
//! Every identifier is fetched at most K at a time, retried with a fixed
//! delay, and saved under the server-suggested filename or `{id}.{ext}`.
//!
//! # Architecture
//!
//! - [`input`] - Identifier list parsing
//! - [`config`] - URL templates, mirror presets and the fetch configuration
//! - [`download`] - Transport, retry state machine, concurrency gate and engine
//! - [`library`] - Detection of sets already present in the destination
//! - [`report`] - JSON run report
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use beatmap_fetch::{DownloadEngine, FetchConfig, HttpTransport, Identifier, Mirror};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::new(Mirror::Catboy.url_template()).with_max_concurrent(3);
//! let engine = DownloadEngine::new(Arc::new(HttpTransport::new()), config)?;
//! let report = engine.run(&[Identifier::from(1)], Path::new("./Songs")).await?;
//! assert_eq!(report.total(), 1);
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod input;
pub mod library;
pub mod report;
mod user_agent;

// Re-export commonly used types
pub use config::{
    ConfigError, DEFAULT_CONCURRENCY, DEFAULT_EXTENSION, FetchConfig, ID_PLACEHOLDER, Mirror,
    UrlTemplate,
};
pub use download::{
    AttemptFailure, BatchReport, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DownloadEngine,
    DownloadError, EngineError, FetchOutcome, FilenamePolicy, HttpTransport, ItemReport,
    ProgressDisplay, RetryPolicy, Transport,
};
pub use input::{Identifier, InputError, parse_identifiers, read_identifier_file};
pub use library::LocalLibrary;
pub use report::{ReportError, RunReport};
