#![forbid(unsafe_code)]

//! Persisted user preferences.
//!
//! The tracked form controls are serialized as one JSON blob under a fixed
//! key ([`SETTINGS_KEY`]). The blob is read once at page load and rewritten
//! on every change of a tracked control.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────┐
//! │         SettingsStore         │
//! │  - snapshot page → Settings   │
//! │  - apply Settings → page      │
//! └───────────────────────────────┘
//!                 │
//!                 ▼
//! ┌───────────────────────────────┐
//! │         KeyValueStore         │
//! │  - MemoryStore (tests)        │
//! │  - localStorage (web shell)   │
//! └───────────────────────────────┘
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing blob | First visit | Page keeps its defaults |
//! | Corrupt blob | Hand-edited / foreign writer | Ignored, logged at debug |
//! | Odd field type | Bool or object in a knob | That knob written as text, others unaffected |
//! | `StorageError` on write | Quota, private mode | Returned; caller logs |

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::page::{Field, FormPage};

/// Key of the persisted settings blob.
pub const SETTINGS_KEY: &str = "AB_SETTINGS";

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while reading or writing the key-value slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Backend is not available (storage disabled, no window).
    Unavailable(String),
    /// The backend rejected the write (quota exceeded, security error).
    Rejected(String),
    /// Serialization of the blob failed.
    Serialization(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            StorageError::Rejected(msg) => write!(f, "storage write rejected: {msg}"),
            StorageError::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Key-Value Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A persistent string slot store (browser `localStorage` or equivalent).
pub trait KeyValueStore {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Read a slot. `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Overwrite a slot.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// In-memory key-value store for tests and headless hosts.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one slot.
    #[must_use]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut data = HashMap::new();
        data.insert(key.to_string(), value.to_string());
        Self {
            data: RwLock::new(data),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "MemoryStore"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.data.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStore")
            .field("entries", &count)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings Blob
// ─────────────────────────────────────────────────────────────────────────────

/// A knob value as found in the blob: written as the control's string, but
/// older or hand-written blobs may carry plain numbers or anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KnobValue {
    Text(String),
    Number(f64),
    Other(Value),
}

impl KnobValue {
    /// The string written back into the form control.
    #[must_use]
    pub fn to_field_string(&self) -> String {
        match self {
            KnobValue::Text(s) => s.clone(),
            KnobValue::Number(n) => crate::preset::format_number(*n),
            KnobValue::Other(v) => crate::preset::value_to_field_string(v),
        }
    }
}

/// The persisted preferences record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_reduce: Option<KnobValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_floor: Option<KnobValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deess_center: Option<KnobValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deess_strength: Option<KnobValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highpass: Option<KnobValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lowpass: Option<KnobValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limiter: Option<KnobValue>,
    #[serde(
        default,
        deserialize_with = "truthy",
        skip_serializing_if = "Option::is_none"
    )]
    pub fast_mode: Option<bool>,
    #[serde(
        default,
        deserialize_with = "truthy",
        skip_serializing_if = "Option::is_none"
    )]
    pub keep_float: Option<bool>,
    #[serde(
        default,
        deserialize_with = "text_only",
        skip_serializing_if = "Option::is_none"
    )]
    pub context: Option<String>,
}

/// Flags are stored as booleans but read back by truthiness.
fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }))
}

/// The context is a `<select>` value; non-string entries cannot name an option.
fn text_only<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

impl Settings {
    fn knob(&self, field: Field) -> Option<&KnobValue> {
        match field {
            Field::NoiseReduce => self.noise_reduce.as_ref(),
            Field::NoiseFloor => self.noise_floor.as_ref(),
            Field::DeessCenter => self.deess_center.as_ref(),
            Field::DeessStrength => self.deess_strength.as_ref(),
            Field::Highpass => self.highpass.as_ref(),
            Field::Lowpass => self.lowpass.as_ref(),
            Field::Limiter => self.limiter.as_ref(),
            Field::FastMode | Field::KeepFloat | Field::Context => None,
        }
    }

    fn knob_mut(&mut self, field: Field) -> Option<&mut Option<KnobValue>> {
        match field {
            Field::NoiseReduce => Some(&mut self.noise_reduce),
            Field::NoiseFloor => Some(&mut self.noise_floor),
            Field::DeessCenter => Some(&mut self.deess_center),
            Field::DeessStrength => Some(&mut self.deess_strength),
            Field::Highpass => Some(&mut self.highpass),
            Field::Lowpass => Some(&mut self.lowpass),
            Field::Limiter => Some(&mut self.limiter),
            Field::FastMode | Field::KeepFloat | Field::Context => None,
        }
    }

    /// Capture the current value of every tracked control present on the page.
    #[must_use]
    pub fn capture<P: FormPage + ?Sized>(page: &P) -> Self {
        let mut settings = Settings::default();
        for field in Field::KNOBS {
            if let (Some(value), Some(slot)) = (page.value(field), settings.knob_mut(field)) {
                *slot = Some(KnobValue::Text(value));
            }
        }
        settings.fast_mode = page.checked(Field::FastMode);
        settings.keep_float = page.checked(Field::KeepFloat);
        settings.context = page.value(Field::Context);
        settings
    }

    /// Write this record back into the page.
    ///
    /// Knobs are written only when present in the record. Checkboxes are
    /// always written (absent means unchecked). The context selector is
    /// written only when non-empty.
    pub fn restore<P: FormPage + ?Sized>(&self, page: &mut P) {
        for field in Field::KNOBS {
            if let Some(value) = self.knob(field) {
                page.set_value(field, &value.to_field_string());
            }
        }
        page.set_checked(Field::FastMode, self.fast_mode.unwrap_or(false));
        page.set_checked(Field::KeepFloat, self.keep_float.unwrap_or(false));
        if let Some(context) = self.context.as_deref().filter(|c| !c.is_empty()) {
            page.set_value(Field::Context, context);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings Store
// ─────────────────────────────────────────────────────────────────────────────

/// Loads and saves [`Settings`] through a [`KeyValueStore`].
pub struct SettingsStore<S: KeyValueStore> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> SettingsStore<S> {
    /// Create a store using the default [`SETTINGS_KEY`].
    #[must_use]
    pub fn new(backend: S) -> Self {
        Self::with_key(backend, SETTINGS_KEY)
    }

    /// Create a store using a custom key.
    #[must_use]
    pub fn with_key(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &S {
        &self.backend
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted blob, if any and if it parses.
    #[must_use]
    pub fn read(&self) -> Option<Settings> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return None,
            Err(e) => {
                tracing::debug!(backend = %self.backend.name(), error = %e, "settings read failed");
                return None;
            }
        };
        match serde_json::from_str::<Settings>(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unreadable settings blob");
                None
            }
        }
    }

    /// Restore persisted settings into the page. Returns whether a blob was applied.
    pub fn load<P: FormPage + ?Sized>(&self, page: &mut P) -> bool {
        let Some(settings) = self.read() else {
            return false;
        };
        settings.restore(page);
        tracing::debug!(backend = %self.backend.name(), "restored settings");
        true
    }

    /// Persist the current value of every tracked control.
    pub fn save<P: FormPage + ?Sized>(&self, page: &P) -> StorageResult<()> {
        let settings = Settings::capture(page);
        let raw = serde_json::to_string(&settings)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set(&self.key, &raw)?;
        tracing::trace!(bytes = raw.len(), "saved settings");
        Ok(())
    }
}

impl<S: KeyValueStore> fmt::Debug for SettingsStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemoryPage;
    use pretty_assertions::assert_eq;

    fn edited_page() -> MemoryPage {
        MemoryPage::with_defaults()
            .with_value(Field::NoiseReduce, "16")
            .with_value(Field::Lowpass, "15000")
            .with_flag(Field::FastMode, true)
            .with_flag(Field::KeepFloat, true)
            .with_value(Field::Context, "podcast")
    }

    #[test]
    fn round_trip_restores_every_field() {
        let store = SettingsStore::new(MemoryStore::new());
        let source = edited_page();
        store.save(&source).unwrap();

        let mut fresh = MemoryPage::with_defaults();
        assert!(store.load(&mut fresh));
        assert_eq!(fresh, source);
    }

    #[test]
    fn missing_blob_leaves_defaults() {
        let store = SettingsStore::new(MemoryStore::new());
        let mut page = MemoryPage::with_defaults();
        assert!(!store.load(&mut page));
        assert_eq!(page, MemoryPage::with_defaults());
    }

    #[test]
    fn empty_or_corrupt_blob_is_ignored() {
        for raw in ["", "{not json", "42"] {
            let store = SettingsStore::new(MemoryStore::with_entry(SETTINGS_KEY, raw));
            let mut page = MemoryPage::with_defaults();
            assert!(!store.load(&mut page), "blob {raw:?} applied");
            assert_eq!(page, MemoryPage::with_defaults());
        }
    }

    #[test]
    fn blob_uses_fixed_key_and_field_names() {
        let store = SettingsStore::new(MemoryStore::new());
        store.save(&edited_page()).unwrap();
        let raw = store.backend().get(SETTINGS_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["noise_reduce"], "16");
        assert_eq!(value["fast_mode"], true);
        assert_eq!(value["keep_float"], true);
        assert_eq!(value["context"], "podcast");
        assert_eq!(value.as_object().unwrap().len(), 10);
    }

    #[test]
    fn absent_controls_are_not_persisted() {
        let store = SettingsStore::new(MemoryStore::new());
        let page = MemoryPage::empty().with_value(Field::Highpass, "90");
        store.save(&page).unwrap();
        let raw = store.backend().get(SETTINGS_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"highpass":"90"}"#);
    }

    #[test]
    fn numeric_blob_values_and_truthy_flags_load() {
        let raw = r#"{"noise_reduce":14,"highpass":null,"fast_mode":1,"keep_float":"","context":""}"#;
        let store = SettingsStore::new(MemoryStore::with_entry(SETTINGS_KEY, raw));
        let mut page = MemoryPage::with_defaults().with_flag(Field::KeepFloat, true);
        assert!(store.load(&mut page));
        assert_eq!(page.value(Field::NoiseReduce).as_deref(), Some("14"));
        assert_eq!(page.value(Field::Highpass).as_deref(), Some("60"));
        assert_eq!(page.checked(Field::FastMode), Some(true));
        assert_eq!(page.checked(Field::KeepFloat), Some(false));
        assert_eq!(page.value(Field::Context).as_deref(), Some("clean"));
    }

    #[test]
    fn odd_knob_types_do_not_drop_the_blob() {
        let raw = r#"{"limiter":true,"highpass":{"hz":80},"lowpass":"15000","noise_reduce":9,"context":7,"fast_mode":true}"#;
        let store = SettingsStore::new(MemoryStore::with_entry(SETTINGS_KEY, raw));
        let mut page = MemoryPage::with_defaults();
        assert!(store.load(&mut page));
        assert_eq!(page.value(Field::Lowpass).as_deref(), Some("15000"));
        assert_eq!(page.value(Field::NoiseReduce).as_deref(), Some("9"));
        assert_eq!(page.value(Field::Limiter).as_deref(), Some("true"));
        assert_eq!(page.value(Field::Highpass).as_deref(), Some(r#"{"hz":80}"#));
        assert_eq!(page.value(Field::Context).as_deref(), Some("clean"));
        assert_eq!(page.checked(Field::FastMode), Some(true));
    }
}
