#![forbid(unsafe_code)]

//! Options accepted by the `AudiobotWeb` constructor.
//!
//! The JS caller passes an optional plain object. Every key except `seed` is
//! a [`ControllerConfig`] override; `seed` fixes the banner shuffle (useful
//! for screenshots), otherwise the shell seeds from `Math.random`.

use audiobot_ui::{ControllerConfig, UiResult};
use serde_json::Value;

/// Parsed constructor options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShellOptions {
    pub config: ControllerConfig,
    pub seed: Option<u64>,
}

impl ShellOptions {
    /// Parse the JSON text of the options object. Empty input means defaults.
    pub fn parse(raw: Option<&str>) -> UiResult<Self> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty() && *r != "null") else {
            return Ok(Self::default());
        };
        let mut value: Value = serde_json::from_str(raw)?;
        let seed = value
            .as_object_mut()
            .and_then(|map| map.remove("seed"))
            .and_then(|seed| seed.as_u64());
        let config = serde_json::from_value(value)?;
        Ok(Self { config, seed })
    }
}
