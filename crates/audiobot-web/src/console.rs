#![forbid(unsafe_code)]

use audiobot_ui::logging::{LogSink, TracingLineLayer};
use tracing::Level;
use tracing_subscriber::prelude::*;
use wasm_bindgen::JsValue;

/// Writes formatted lines to the browser console at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write_line(&self, level: Level, line: &str) {
        let line = JsValue::from_str(line);
        match level {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            Level::INFO => web_sys::console::info_1(&line),
            Level::DEBUG | Level::TRACE => web_sys::console::debug_1(&line),
        }
    }
}

/// Install the console layer as the global subscriber. A second call (another
/// `AudiobotWeb` on the page) keeps the first subscriber.
pub fn install() {
    let layer = TracingLineLayer::new(ConsoleSink).show_target(false);
    if tracing_subscriber::registry()
        .with(layer)
        .with(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init()
        .is_err()
    {
        tracing::trace!("console logging already installed");
    }
}
