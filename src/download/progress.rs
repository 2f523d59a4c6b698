//! Per-download byte progress bars.
//!
//! Bars are drawn on stderr so log lines on stdout stay machine-readable.
//! indicatif hides them automatically when stderr is not a terminal.

use std::fmt;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::input::Identifier;

const BAR_TEMPLATE: &str = "{msg:>10} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})";
const SPINNER_TEMPLATE: &str = "{spinner} {msg:>8} {bytes} ({bytes_per_sec})";

/// Shared set of progress bars, one per in-flight body read.
#[derive(Clone)]
pub struct ProgressDisplay {
    multi: MultiProgress,
}

impl fmt::Debug for ProgressDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressDisplay").finish_non_exhaustive()
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressDisplay {
    /// Display drawing to stderr.
    #[must_use]
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Display that tracks progress without drawing anything.
    #[must_use]
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
        }
    }

    /// Adds a bar for `identifier`. An unknown length gets a byte spinner.
    #[must_use]
    pub fn start(&self, identifier: &Identifier, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(len) => ProgressBar::new(len).with_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            ),
            None => ProgressBar::new_spinner().with_style(
                ProgressStyle::with_template(SPINNER_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            ),
        };
        let bar = self.multi.add(bar);
        bar.set_message(identifier.to_string());
        bar
    }
}
