#![forbid(unsafe_code)]

//! Parameter presets and the single "apply" operation.
//!
//! A preset is a fixed set of knob values. [`apply_preset`] is shared with the
//! advice flow, which receives an arbitrary JSON object of parameters: keys
//! that are not knobs, and knobs missing from the page, are skipped.

use serde_json::{Map, Value};

use crate::page::{Field, FormPage};

/// A named, fixed parameter set selectable from the preset dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Music,
    Podcast,
    Aggressive,
}

const MUSIC: [(Field, f64); 7] = [
    (Field::NoiseReduce, 12.0),
    (Field::NoiseFloor, -28.0),
    (Field::DeessCenter, 0.25),
    (Field::DeessStrength, 1.0),
    (Field::Highpass, 30.0),
    (Field::Lowpass, 18000.0),
    (Field::Limiter, 0.98),
];

const PODCAST: [(Field, f64); 7] = [
    (Field::NoiseReduce, 14.0),
    (Field::NoiseFloor, -30.0),
    (Field::DeessCenter, 0.22),
    (Field::DeessStrength, 1.4),
    (Field::Highpass, 80.0),
    (Field::Lowpass, 17000.0),
    (Field::Limiter, 0.96),
];

const AGGRESSIVE: [(Field, f64); 7] = [
    (Field::NoiseReduce, 16.0),
    (Field::NoiseFloor, -32.0),
    (Field::DeessCenter, 0.27),
    (Field::DeessStrength, 1.6),
    (Field::Highpass, 70.0),
    (Field::Lowpass, 16000.0),
    (Field::Limiter, 0.95),
];

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Music, Preset::Podcast, Preset::Aggressive];

    /// Dropdown option value.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Preset::Music => "music",
            Preset::Podcast => "podcast",
            Preset::Aggressive => "aggressive",
        }
    }

    /// Parse a dropdown option value. Anything else selects nothing.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Preset> {
        Preset::ALL.into_iter().find(|p| p.name() == name)
    }

    #[must_use]
    pub const fn values(self) -> &'static [(Field, f64)] {
        match self {
            Preset::Music => &MUSIC,
            Preset::Podcast => &PODCAST,
            Preset::Aggressive => &AGGRESSIVE,
        }
    }

    /// Apply this preset to the page. Returns the number of fields written.
    pub fn apply<P: FormPage + ?Sized>(self, page: &mut P) -> usize {
        self.values()
            .iter()
            .filter(|(field, value)| page.set_value(*field, &format_number(*value)))
            .count()
    }
}

/// Apply a JSON object of knob values to the page.
///
/// For each key present in `values`, if it names a knob and the page has that
/// control, its value is set. Returns the number of fields written.
pub fn apply_preset<P: FormPage + ?Sized>(page: &mut P, values: &Map<String, Value>) -> usize {
    let mut applied = 0;
    for (key, value) in values {
        let Some(field) = Field::knob_from_name(key) else {
            tracing::trace!(key = %key, "ignoring unknown preset key");
            continue;
        };
        if page.set_value(field, &value_to_field_string(value)) {
            applied += 1;
        }
    }
    applied
}

/// Render a number the way a form control displays it (`1.0` → `1`).
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    format!("{value}")
}

/// String form of a JSON value as written into a form control.
#[must_use]
pub fn value_to_field_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), format_number),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
