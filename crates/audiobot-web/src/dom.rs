#![forbid(unsafe_code)]

//! DOM-backed implementations of the controller's page, storage and views.
//!
//! Every lookup tolerates a missing element: accessors return `None` and
//! renders skip the element.

use audiobot_ui::{
    BannerView, Field, FieldKind, FormPage, KeyValueStore, OverlayIcon, OverlayView,
    StorageError,
};
use audiobot_ui::settings::StorageResult;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement};

pub const OVERLAY_ID: &str = "overlay";
pub const OVERLAY_ICON_ID: &str = "overlay-icon";
pub const OVERLAY_MSG_ID: &str = "overlay-msg";
pub const OVERLAY_CLOSE_SELECTOR: &str = ".overlay-close";
pub const TOAST_ID: &str = "mini-toast";
pub const TOAST_MSG_ID: &str = "mini-toast-msg";
pub const BANNER_SELECTOR: &str = ".banner";
pub const VERSE_TEXT_ID: &str = "verse-text";
pub const VERSE_INTERVAL_ID: &str = "verse-interval";
pub const NEXT_VERSE_ID: &str = "next-verse-btn";
pub const RELOAD_VERSES_ID: &str = "reload-verses-btn";
pub const PRESET_SELECT_ID: &str = "preset-select";
pub const ADVICE_BUTTON_ID: &str = "advice-btn";
pub const FILES_SELECTOR: &str = "input[name=\"files\"]";

/// Render a JS exception the way `String(e)` would.
pub fn js_error_text(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.to_string());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

pub fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

pub fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))
}

fn select(document: &Document, selector: &str) -> Option<Element> {
    document.query_selector(selector).ok().flatten()
}

// ─────────────────────────────────────────────────────────────────────────────
// Form controls
// ─────────────────────────────────────────────────────────────────────────────

/// The live page's form controls.
pub struct DomPage {
    document: Document,
}

impl DomPage {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn input(&self, field: Field) -> Option<HtmlInputElement> {
        select(&self.document, field.selector())?.dyn_into().ok()
    }

    fn select_element(&self, field: Field) -> Option<HtmlSelectElement> {
        select(&self.document, field.selector())?.dyn_into().ok()
    }
}

impl FormPage for DomPage {
    fn value(&self, field: Field) -> Option<String> {
        match field.kind() {
            FieldKind::Number => self.input(field).map(|el| el.value()),
            FieldKind::Select => self.select_element(field).map(|el| el.value()),
            FieldKind::Flag => None,
        }
    }

    fn set_value(&mut self, field: Field, value: &str) -> bool {
        match field.kind() {
            FieldKind::Number => self.input(field).map(|el| el.set_value(value)).is_some(),
            FieldKind::Select => self
                .select_element(field)
                .map(|el| el.set_value(value))
                .is_some(),
            FieldKind::Flag => false,
        }
    }

    fn checked(&self, field: Field) -> Option<bool> {
        match field.kind() {
            FieldKind::Flag => self.input(field).map(|el| el.checked()),
            _ => None,
        }
    }

    fn set_checked(&mut self, field: Field, checked: bool) -> bool {
        match field.kind() {
            FieldKind::Flag => self.input(field).map(|el| el.set_checked(checked)).is_some(),
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// localStorage
// ─────────────────────────────────────────────────────────────────────────────

/// `window.localStorage`. Private browsing modes may deny access entirely.
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> StorageResult<web_sys::Storage> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(js_error_text(&e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".into()))
    }
}

impl KeyValueStore for LocalStorage {
    fn name(&self) -> &str {
        "localStorage"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(js_error_text(&e)))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Rejected(js_error_text(&e)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Views
// ─────────────────────────────────────────────────────────────────────────────

/// Writes overlay, toast and banner snapshots into the document, skipping
/// unchanged snapshots.
pub struct DomRenderer {
    document: Document,
    last_overlay: Option<OverlayView>,
    last_banner: Option<BannerView>,
}

impl DomRenderer {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            last_overlay: None,
            last_banner: None,
        }
    }

    fn html_element(&self, id: &str) -> Option<HtmlElement> {
        self.document.get_element_by_id(id)?.dyn_into().ok()
    }

    pub fn render_overlay(&mut self, view: &OverlayView) {
        if self.last_overlay.as_ref() == Some(view) {
            return;
        }
        if let Some(overlay) = self.html_element(OVERLAY_ID) {
            overlay.set_hidden(!view.visible);
        }
        if let Some(icon) = self.document.get_element_by_id(OVERLAY_ICON_ID) {
            let classes = icon.class_list();
            for class in OverlayIcon::CLASSES {
                let _ = classes.remove_1(class);
            }
            let _ = classes.add_1(view.icon.class());
        }
        if let (Some(msg), Some(text)) = (
            self.document.get_element_by_id(OVERLAY_MSG_ID),
            view.message.as_deref(),
        ) {
            msg.set_text_content(Some(text));
        }
        if let Some(toast) = self.html_element(TOAST_ID) {
            if let (Some(text), Some(span)) = (
                view.toast.as_deref(),
                self.document.get_element_by_id(TOAST_MSG_ID),
            ) {
                span.set_text_content(Some(text));
            }
            toast.set_hidden(view.toast.is_none());
        }
        self.last_overlay = Some(view.clone());
    }

    pub fn render_banner(&mut self, view: &BannerView) {
        if self.last_banner.as_ref() == Some(view) {
            return;
        }
        if let Some(text_el) = self.html_element(VERSE_TEXT_ID) {
            if let Some(text) = view.text.as_deref() {
                text_el.set_text_content(Some(text));
            }
            let opacity = if view.visible { "1" } else { "0" };
            let _ = text_el.style().set_property("opacity", opacity);
        }
        self.last_banner = Some(view.clone());
    }

    pub fn set_interval_label(&self, text: &str) {
        if let Some(span) = self.document.get_element_by_id(VERSE_INTERVAL_ID) {
            span.set_text_content(Some(text));
        }
    }
}

/// Banner text present in the served page, or `None` when the page has no
/// banner at all.
pub fn initial_banner(document: &Document) -> Option<Option<String>> {
    select(document, BANNER_SELECTOR)?;
    let text_el = document.get_element_by_id(VERSE_TEXT_ID)?;
    Some(text_el.text_content().filter(|t| !t.is_empty()))
}
