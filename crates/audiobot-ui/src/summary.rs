#![forbid(unsafe_code)]

//! Best-effort outcome summary shown as a toast after a successful submission.
//!
//! The results page does not report counts in a structured way, so the
//! default [`MarkupSummarizer`] scans the raw HTML for the markers the server
//! renders: one download link per processed file and one error block per
//! failure. Counts are a heuristic, not a guarantee.

use core::fmt;
use core::time::Duration;

/// Marker the results page renders once per successful file.
pub const SUCCESS_MARKER: &str = "<a href=\"/download/";

/// Marker the results page renders once per failed file.
pub const ERROR_MARKER: &str = "<div class=\"error\"";

/// Success / failure counts extracted from a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub ok: usize,
    pub failed: usize,
}

/// Extracts [`Counts`] from a response body.
pub trait Summarizer {
    fn count(&self, body: &str) -> Counts;
}

/// Counts occurrences of fixed markup markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupSummarizer {
    success_marker: String,
    error_marker: String,
}

impl Default for MarkupSummarizer {
    fn default() -> Self {
        Self::new(SUCCESS_MARKER, ERROR_MARKER)
    }
}

impl MarkupSummarizer {
    #[must_use]
    pub fn new(success_marker: impl Into<String>, error_marker: impl Into<String>) -> Self {
        Self {
            success_marker: success_marker.into(),
            error_marker: error_marker.into(),
        }
    }
}

impl Summarizer for MarkupSummarizer {
    fn count(&self, body: &str) -> Counts {
        Counts {
            ok: occurrences(body, &self.success_marker),
            failed: occurrences(body, &self.error_marker),
        }
    }
}

fn occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Whole seconds elapsed, rounded, never less than one.
#[must_use]
pub fn elapsed_secs(started: Duration, now: Duration) -> u64 {
    let elapsed = now.saturating_sub(started);
    let rounded = (elapsed.as_millis() + 500) / 1000;
    u64::try_from(rounded).unwrap_or(u64::MAX).max(1)
}

/// The toast summary of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub counts: Counts,
    pub elapsed_secs: u64,
}

impl Summary {
    #[must_use]
    pub fn new(counts: Counts, started: Duration, now: Duration) -> Self {
        Self {
            counts,
            elapsed_secs: elapsed_secs(started, now),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} OK, {} failed in {}s",
            self.counts.ok, self.counts.failed, self.elapsed_secs
        )
    }
}
