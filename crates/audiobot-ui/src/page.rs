#![forbid(unsafe_code)]

//! Form-control access behind a trait, so the controller runs without a DOM.
//!
//! The page exposes a fixed set of controls: seven numeric knobs, two
//! checkboxes and the context selector. Every accessor tolerates a missing
//! control by returning `None` / `false`; a page that lacks an optional
//! widget makes the corresponding operation a no-op.

use std::collections::BTreeMap;

/// The kind of form control backing a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `<input>` whose string value is a number.
    Number,
    /// Checkbox `<input>`; only its checked state matters.
    Flag,
    /// `<select>` element.
    Select,
}

/// A tracked form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    NoiseReduce,
    NoiseFloor,
    DeessCenter,
    DeessStrength,
    Highpass,
    Lowpass,
    Limiter,
    FastMode,
    KeepFloat,
    Context,
}

impl Field {
    /// Every tracked control, in persisted-blob order.
    pub const ALL: [Field; 10] = [
        Field::NoiseReduce,
        Field::NoiseFloor,
        Field::DeessCenter,
        Field::DeessStrength,
        Field::Highpass,
        Field::Lowpass,
        Field::Limiter,
        Field::FastMode,
        Field::KeepFloat,
        Field::Context,
    ];

    /// The numeric processing knobs (the preset-addressable fields).
    pub const KNOBS: [Field; 7] = [
        Field::NoiseReduce,
        Field::NoiseFloor,
        Field::DeessCenter,
        Field::DeessStrength,
        Field::Highpass,
        Field::Lowpass,
        Field::Limiter,
    ];

    /// Form `name` (and persisted key) of this control.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Field::NoiseReduce => "noise_reduce",
            Field::NoiseFloor => "noise_floor",
            Field::DeessCenter => "deess_center",
            Field::DeessStrength => "deess_strength",
            Field::Highpass => "highpass",
            Field::Lowpass => "lowpass",
            Field::Limiter => "limiter",
            Field::FastMode => "fast_mode",
            Field::KeepFloat => "keep_float",
            Field::Context => "context",
        }
    }

    #[must_use]
    pub const fn kind(self) -> FieldKind {
        match self {
            Field::FastMode | Field::KeepFloat => FieldKind::Flag,
            Field::Context => FieldKind::Select,
            _ => FieldKind::Number,
        }
    }

    /// CSS selector locating the control in the page.
    #[must_use]
    pub const fn selector(self) -> &'static str {
        match self {
            Field::NoiseReduce => "input[name=\"noise_reduce\"]",
            Field::NoiseFloor => "input[name=\"noise_floor\"]",
            Field::DeessCenter => "input[name=\"deess_center\"]",
            Field::DeessStrength => "input[name=\"deess_strength\"]",
            Field::Highpass => "input[name=\"highpass\"]",
            Field::Lowpass => "input[name=\"lowpass\"]",
            Field::Limiter => "input[name=\"limiter\"]",
            Field::FastMode => "input[name=\"fast_mode\"]",
            Field::KeepFloat => "input[name=\"keep_float\"]",
            Field::Context => "#context-select",
        }
    }

    /// Look up a control by its form name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Look up a numeric knob by name; flags and the selector are not knobs.
    #[must_use]
    pub fn knob_from_name(name: &str) -> Option<Field> {
        Field::KNOBS.into_iter().find(|f| f.name() == name)
    }
}

/// Read/write access to the page's form controls.
///
/// Setters return `true` when the control exists and was updated.
pub trait FormPage {
    /// Current string value of a number input or select, `None` if absent.
    fn value(&self, field: Field) -> Option<String>;

    /// Set the string value of a number input or select.
    fn set_value(&mut self, field: Field, value: &str) -> bool;

    /// Checked state of a checkbox, `None` if absent.
    fn checked(&self, field: Field) -> Option<bool>;

    /// Set the checked state of a checkbox.
    fn set_checked(&mut self, field: Field, checked: bool) -> bool;
}

/// In-memory page used by tests and headless hosts.
///
/// Only controls that were added exist; everything else behaves like a
/// missing DOM element.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryPage {
    values: BTreeMap<Field, String>,
    flags: BTreeMap<Field, bool>,
}

impl MemoryPage {
    /// A page with no controls at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A page carrying every control with the server-rendered defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::empty()
            .with_value(Field::NoiseReduce, "12")
            .with_value(Field::NoiseFloor, "-28")
            .with_value(Field::DeessCenter, "0.25")
            .with_value(Field::DeessStrength, "1.0")
            .with_value(Field::Highpass, "60")
            .with_value(Field::Lowpass, "18000")
            .with_value(Field::Limiter, "0.98")
            .with_flag(Field::FastMode, false)
            .with_flag(Field::KeepFloat, false)
            .with_value(Field::Context, "clean")
    }

    /// Add (or overwrite) a value control.
    #[must_use]
    pub fn with_value(mut self, field: Field, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    /// Add (or overwrite) a checkbox control.
    #[must_use]
    pub fn with_flag(mut self, field: Field, checked: bool) -> Self {
        self.flags.insert(field, checked);
        self
    }

    /// Whether the page has a control for `field`.
    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.values.contains_key(&field) || self.flags.contains_key(&field)
    }
}

impl FormPage for MemoryPage {
    fn value(&self, field: Field) -> Option<String> {
        self.values.get(&field).cloned()
    }

    fn set_value(&mut self, field: Field, value: &str) -> bool {
        match self.values.get_mut(&field) {
            Some(slot) => {
                value.clone_into(slot);
                true
            }
            None => false,
        }
    }

    fn checked(&self, field: Field) -> Option<bool> {
        self.flags.get(&field).copied()
    }

    fn set_checked(&mut self, field: Field, checked: bool) -> bool {
        match self.flags.get_mut(&field) {
            Some(slot) => {
                *slot = checked;
                true
            }
            None => false,
        }
    }
}
