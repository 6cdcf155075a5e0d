#![forbid(unsafe_code)]

//! Controller configuration.
//!
//! [`ControllerConfig`] holds every identifier, endpoint and timing the
//! controller uses. The defaults match the server-rendered page; a host may
//! override any subset by passing a JSON object (missing keys keep their
//! defaults). [`UiConfig`] is the `/ui-config.json` payload served by the
//! backend.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UiResult;

/// Fallback banner text used when no verses are available and the banner
/// element carries no text of its own.
pub const DEFAULT_FALLBACK_VERSE: &str =
    "“Let everything that has breath praise the LORD.” — Psalm 150:6";

/// Every identifier, endpoint and delay the controller uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Ids of the forms whose submission is intercepted.
    pub forms: Vec<String>,
    pub advice_url: String,
    pub ui_config_url: String,
    pub verses_url: String,
    /// Navigation target after a non-HTML, non-file success.
    pub history_url: String,
    /// `localStorage` key of the settings blob.
    pub settings_key: String,
    /// Context sent with an advice request when the selector is missing.
    pub default_context: String,

    pub hint_period_ms: u64,
    pub toast_ms: u64,
    /// Pause after a transport failure or exception.
    pub failure_pause_ms: u64,
    /// Pause after a non-2xx response.
    pub http_error_pause_ms: u64,
    /// Pause before swapping in a results page or navigating.
    pub done_pause_ms: u64,
    /// Pause after a download starts.
    pub download_pause_ms: u64,
    /// Delay before a download's object URL is revoked.
    pub revoke_after_ms: u64,
    /// Characters of an error body shown in the overlay.
    pub error_preview_chars: usize,

    pub verse_fade_ms: u64,
    pub default_verse_interval_secs: f64,
    pub min_verse_interval_secs: f64,
    pub fallback_verse: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            forms: vec!["clean-form".to_string(), "separate-form".to_string()],
            advice_url: "/api/advice".to_string(),
            ui_config_url: "/ui-config.json".to_string(),
            verses_url: "/verses.json".to_string(),
            history_url: "/history".to_string(),
            settings_key: crate::settings::SETTINGS_KEY.to_string(),
            default_context: "clean".to_string(),
            hint_period_ms: 2500,
            toast_ms: 3000,
            failure_pause_ms: 2500,
            http_error_pause_ms: 4000,
            done_pause_ms: 600,
            download_pause_ms: 1000,
            revoke_after_ms: 5000,
            error_preview_chars: 140,
            verse_fade_ms: 250,
            default_verse_interval_secs: 10.0,
            min_verse_interval_secs: 3.0,
            fallback_verse: DEFAULT_FALLBACK_VERSE.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Parse a JSON override object; absent keys keep their defaults.
    pub fn from_json(raw: &str) -> UiResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Whether `form` is one of the intercepted forms.
    #[must_use]
    pub fn intercepts(&self, form: &str) -> bool {
        self.forms.iter().any(|f| f == form)
    }

    #[must_use]
    pub fn hint_period(&self) -> Duration {
        Duration::from_millis(self.hint_period_ms)
    }

    #[must_use]
    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_ms)
    }

    #[must_use]
    pub fn verse_fade(&self) -> Duration {
        Duration::from_millis(self.verse_fade_ms)
    }

    #[must_use]
    pub fn revoke_after(&self) -> Duration {
        Duration::from_millis(self.revoke_after_ms)
    }

    /// Pacing delays used by the submission controller.
    #[must_use]
    pub fn pacing(&self) -> Pacing {
        Pacing {
            failure: Duration::from_millis(self.failure_pause_ms),
            http_error: Duration::from_millis(self.http_error_pause_ms),
            done: Duration::from_millis(self.done_pause_ms),
            download: Duration::from_millis(self.download_pause_ms),
        }
    }

    /// Banner rotation interval for a configured value, clamped to the
    /// minimum; `None` yields the default.
    #[must_use]
    pub fn verse_interval(&self, configured_secs: Option<f64>) -> Duration {
        let secs = configured_secs
            .filter(|s| s.is_finite())
            .unwrap_or(self.default_verse_interval_secs)
            .max(self.min_verse_interval_secs);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// How long the terminal status stays readable before the overlay goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub failure: Duration,
    pub http_error: Duration,
    pub done: Duration,
    pub download: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        ControllerConfig::default().pacing()
    }
}

/// `/ui-config.json` payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UiConfig {
    /// Banner rotation interval as served; only numbers are accepted.
    pub verse_interval_sec: Option<f64>,
}

impl UiConfig {
    /// Lenient parse: anything that is not an object with a numeric
    /// `verse_interval_sec` yields `None` for that field.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "ui config is not json");
                return Self::default();
            }
        };
        Self {
            verse_interval_sec: value.get("verse_interval_sec").and_then(Value::as_f64),
        }
    }

    /// Text for the settings-panel interval label, shown only for a
    /// non-zero configured value.
    #[must_use]
    pub fn interval_label(&self) -> Option<String> {
        self.verse_interval_sec
            .filter(|s| *s != 0.0 && !s.is_nan())
            .map(crate::preset::format_number)
    }
}
