#![forbid(unsafe_code)]

//! Tracing layer that formats events as single text lines.
//!
//! Provides a `tracing_subscriber::Layer` that renders each event as
//! `HH:MM:SS LEVEL target: message k=v ...` and hands the line to a
//! [`LogSink`]. The web shell installs a sink that forwards to the browser
//! console; tests use [`CaptureSink`].
//!
//! # Quick Start
//!
//! ```no_run
//! use audiobot_ui::logging::{CaptureSink, TracingLineLayer};
//! use tracing_subscriber::prelude::*;
//!
//! let sink = CaptureSink::new();
//! tracing_subscriber::registry()
//!     .with(TracingLineLayer::new(sink.clone()))
//!     .init();
//! ```

use std::fmt::{self, Write as FmtWrite};
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

// ============================================================================
// Configuration
// ============================================================================

/// Which parts of an event are rendered.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Show timestamps. Default: true.
    pub show_time: bool,
    /// Show log level. Default: true.
    pub show_level: bool,
    /// Show the tracing target (module path). Default: true.
    pub show_target: bool,
    /// Show structured fields beyond `message`. Default: true.
    pub show_fields: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            show_time: true,
            show_level: true,
            show_target: true,
            show_fields: true,
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination for formatted lines.
pub trait LogSink: Send + Sync + 'static {
    fn write_line(&self, level: Level, line: &str);
}

/// Keeps every line in memory; clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of captured lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Captured lines joined with newlines.
    #[must_use]
    pub fn contents(&self) -> String {
        self.lines().join("\n")
    }
}

impl LogSink for CaptureSink {
    fn write_line(&self, _level: Level, line: &str) {
        let mut lines = match self.lines.lock() {
            Ok(l) => l,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push(line.to_string());
    }
}

/// Format level as a fixed-width string.
fn level_str(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN ",
        Level::INFO => "INFO ",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

// ============================================================================
// Event Visitor
// ============================================================================

/// Extracts message and structured fields from a tracing event.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        let rendered = strip_debug_quotes(&rendered);
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }
}

/// Remove surrounding quotes from Debug-formatted strings.
fn strip_debug_quotes(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Wall-clock `HH:MM:SS` (UTC).
fn timestamp_now() -> String {
    // std::time panics on wasm32-unknown-unknown.
    let now = web_time::SystemTime::now();
    let since_epoch = now.duration_since(web_time::UNIX_EPOCH).unwrap_or_default();
    let secs = since_epoch.as_secs();
    let h = (secs / 3600) % 24;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

// ============================================================================
// TracingLineLayer
// ============================================================================

/// A `tracing_subscriber::Layer` writing one formatted line per event.
pub struct TracingLineLayer<K: LogSink> {
    sink: K,
    config: LogConfig,
}

impl<K: LogSink> TracingLineLayer<K> {
    pub fn new(sink: K) -> Self {
        Self::with_config(sink, LogConfig::default())
    }

    pub fn with_config(sink: K, config: LogConfig) -> Self {
        Self { sink, config }
    }

    /// Builder: set whether to show timestamps.
    #[must_use]
    pub fn show_time(mut self, show: bool) -> Self {
        self.config.show_time = show;
        self
    }

    /// Builder: set whether to show the target module.
    #[must_use]
    pub fn show_target(mut self, show: bool) -> Self {
        self.config.show_target = show;
        self
    }

    fn format_event(&self, event: &Event<'_>) -> String {
        let metadata = event.metadata();
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let mut line = String::new();
        if self.config.show_time {
            line.push_str(&timestamp_now());
            line.push(' ');
        }
        if self.config.show_level {
            line.push_str(level_str(*metadata.level()));
            line.push(' ');
        }
        if self.config.show_target {
            let _ = write!(line, "{}: ", metadata.target());
        }
        line.push_str(&visitor.message.unwrap_or_default());
        if self.config.show_fields {
            for (k, v) in &visitor.fields {
                let _ = write!(line, " {k}={v}");
            }
        }
        line
    }
}

impl<S, K> Layer<S> for TracingLineLayer<K>
where
    S: Subscriber,
    K: LogSink,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let line = self.format_event(event);
        self.sink.write_line(*event.metadata().level(), &line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_subscriber::prelude::*;

    fn quiet() -> LogConfig {
        LogConfig {
            show_time: false,
            show_level: true,
            show_target: false,
            show_fields: true,
        }
    }

    fn capture(config: LogConfig, f: impl FnOnce()) -> CaptureSink {
        let sink = CaptureSink::new();
        let subscriber =
            tracing_subscriber::registry().with(TracingLineLayer::with_config(sink.clone(), config));
        let dispatch = tracing::Dispatch::new(subscriber);
        tracing::dispatcher::with_default(&dispatch, f);
        sink
    }

    #[test]
    fn formats_level_message_and_fields() {
        let sink = capture(quiet(), || {
            tracing::warn!(form = "clean-form", status = 502u64, "refused");
        });
        assert_eq!(sink.lines(), vec!["WARN  refused form=clean-form status=502".to_string()]);
    }

    #[test]
    fn includes_target_when_enabled() {
        let config = LogConfig {
            show_target: true,
            ..quiet()
        };
        let sink = capture(config, || tracing::error!("boom"));
        assert!(sink.contents().contains("audiobot_ui::logging::tests: boom"));
    }

    #[test]
    fn respects_level_filter() {
        let sink = CaptureSink::new();
        let subscriber = tracing_subscriber::registry()
            .with(TracingLineLayer::with_config(sink.clone(), quiet()))
            .with(tracing_subscriber::filter::LevelFilter::INFO);
        let dispatch = tracing::Dispatch::new(subscriber);
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::debug!("debug drop");
            tracing::info!("info keep");
        });
        let output = sink.contents();
        assert!(!output.contains("debug drop"), "output: {output}");
        assert!(output.contains("info keep"), "output: {output}");
    }

    #[test]
    fn strip_debug_quotes_basic() {
        assert_eq!(strip_debug_quotes("\"hello\""), "hello");
        assert_eq!(strip_debug_quotes("plain"), "plain");
        assert_eq!(strip_debug_quotes("\""), "\"");
    }

    #[test]
    fn timestamp_format_valid() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), 8);
        assert_eq!(&ts[2..3], ":");
        assert_eq!(&ts[5..6], ":");
    }
}
