#![forbid(unsafe_code)]

//! Browser shell for the Audiobot web UI.
//!
//! Wraps the `audiobot-ui` controller with a `wasm-bindgen` API. The shell
//! owns everything host-specific:
//! - DOM access for form controls, overlay, toast and banner,
//! - `fetch` for submissions, advice, verses and ui config,
//! - `localStorage` for settings,
//! - a `setTimeout` wakeup at the controller's next deadline.
//!
//! ```js
//! import init, { AudiobotWeb } from "./pkg/audiobot_web.js";
//! await init();
//! const ui = new AudiobotWeb({ history_url: "/history" });
//! ui.init();
//! ```

pub mod options;

#[cfg(target_arch = "wasm32")]
mod console;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod fetch;
#[cfg(target_arch = "wasm32")]
mod wasm;

pub use options::ShellOptions;

#[cfg(target_arch = "wasm32")]
pub use wasm::AudiobotWeb;

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct AudiobotWeb {
    options: ShellOptions,
}

#[cfg(not(target_arch = "wasm32"))]
impl AudiobotWeb {
    pub fn new(options: Option<&str>) -> audiobot_ui::UiResult<Self> {
        Ok(Self {
            options: ShellOptions::parse(options)?,
        })
    }

    #[must_use]
    pub fn options(&self) -> &ShellOptions {
        &self.options
    }
}
