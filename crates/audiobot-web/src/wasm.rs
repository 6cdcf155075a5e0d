#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use audiobot_ui::{App, Effect, Field, Msg, StepProgram};
use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use web_sys::{Blob, Event, EventTarget, HtmlAnchorElement, HtmlDocument, HtmlSelectElement, Url};

use crate::console;
use crate::dom::{
    ADVICE_BUTTON_ID, DomPage, DomRenderer, LocalStorage, NEXT_VERSE_ID, OVERLAY_CLOSE_SELECTOR,
    PRESET_SELECT_ID, RELOAD_VERSES_ID, document, initial_banner, js_error_text, window,
};
use crate::fetch;
use crate::options::ShellOptions;

type Program = StepProgram<DomPage, LocalStorage>;
type Listener = (EventTarget, &'static str, Closure<dyn FnMut(Event)>);

/// Everything owned by one initialized controller.
struct Shell {
    program: Program,
    renderer: DomRenderer,
    epoch: web_time::Instant,
    wakeup: Option<Closure<dyn FnMut()>>,
    timer: Option<i32>,
    listeners: Vec<Listener>,
}

type Handle = Rc<RefCell<Shell>>;

/// Audiobot page controller.
///
/// Intercepts the upload forms, drives the progress overlay and toast,
/// applies presets and advice, rotates the banner, and persists settings.
#[wasm_bindgen]
pub struct AudiobotWeb {
    options: ShellOptions,
    shell: Option<Handle>,
}

#[wasm_bindgen]
impl AudiobotWeb {
    /// `options` is an optional plain object of configuration overrides.
    #[wasm_bindgen(constructor)]
    pub fn new(options: Option<JsValue>) -> Result<AudiobotWeb, JsValue> {
        let raw = match options {
            Some(value) if !value.is_undefined() && !value.is_null() => Some(
                js_sys::JSON::stringify(&value)?
                    .as_string()
                    .unwrap_or_default(),
            ),
            _ => None,
        };
        let options = ShellOptions::parse(raw.as_deref())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self {
            options,
            shell: None,
        })
    }

    /// Bind to the current document. Call once the DOM is ready.
    pub fn init(&mut self) -> Result<(), JsValue> {
        if self.shell.is_some() {
            return Ok(());
        }
        console::install();
        let document = document()?;
        let config = self.options.config.clone();
        let forms = config.forms.clone();

        let seed = self
            .options
            .seed
            .unwrap_or_else(|| (js_sys::Math::random() * u64::MAX as f64) as u64);
        let app = App::new(config, DomPage::new(document.clone()), LocalStorage);
        let app = match initial_banner(&document) {
            Some(text) => app.with_banner(text, seed),
            None => app.without_banner(),
        };

        let handle: Handle = Rc::new(RefCell::new(Shell {
            program: StepProgram::new(app),
            renderer: DomRenderer::new(document.clone()),
            epoch: web_time::Instant::now(),
            wakeup: None,
            timer: None,
            listeners: Vec::new(),
        }));

        let weak = Rc::downgrade(&handle);
        handle.borrow_mut().wakeup = Some(Closure::new(move || {
            if let Some(handle) = weak.upgrade() {
                handle.borrow_mut().timer = None;
                pump(&handle);
            }
        }));

        bind_listeners(&handle, &document, &forms)?;

        let effects = {
            let mut shell = handle.borrow_mut();
            shell.program.init();
            shell.program.take_effects()
        };
        tracing::info!(forms = forms.len() as u64, "audiobot ui ready");
        perform_all(&handle, effects);
        pump(&handle);

        self.shell = Some(handle);
        Ok(())
    }

    /// Show the next banner text now.
    #[wasm_bindgen(js_name = nextVerse)]
    pub fn next_verse(&self) {
        if let Some(handle) = &self.shell {
            dispatch(handle, Msg::NextVerse);
        }
    }

    /// Re-fetch the banner texts, then show the next one.
    #[wasm_bindgen(js_name = reloadVerses)]
    pub fn reload_verses(&self) {
        if let Some(handle) = &self.shell {
            dispatch(handle, Msg::ReloadVerses);
        }
    }

    /// Explicit teardown for JS callers: removes listeners and timers.
    pub fn destroy(&mut self) {
        let Some(handle) = self.shell.take() else {
            return;
        };
        let mut shell = handle.borrow_mut();
        shell.program.stop();
        if let (Some(id), Ok(window)) = (shell.timer.take(), window()) {
            window.clear_timeout_with_handle(id);
        }
        for (target, kind, closure) in shell.listeners.drain(..) {
            let _ = target.remove_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
        }
        shell.wakeup = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event loop
// ─────────────────────────────────────────────────────────────────────────────

fn dispatch(handle: &Handle, msg: Msg) {
    handle.borrow_mut().program.push(msg);
    pump(handle);
}

/// Step the program at the current time, render, perform effects, and
/// schedule the next wakeup.
fn pump(handle: &Handle) {
    let effects = {
        let mut shell = handle.borrow_mut();
        let now = shell.epoch.elapsed();
        shell.program.set_time(now);
        shell.program.step();
        let effects = shell.program.take_effects();
        let Shell {
            program, renderer, ..
        } = &mut *shell;
        renderer.render_overlay(&program.app().overlay_view());
        if let Some(banner) = program.app().banner_view() {
            renderer.render_banner(&banner);
        }
        effects
    };
    perform_all(handle, effects);
    schedule(handle);
}

fn schedule(handle: &Handle) {
    let Ok(window) = window() else {
        return;
    };
    let mut shell = handle.borrow_mut();
    if let Some(id) = shell.timer.take() {
        window.clear_timeout_with_handle(id);
    }
    let Some(deadline) = shell.program.next_deadline() else {
        return;
    };
    let delay = deadline.saturating_sub(shell.epoch.elapsed());
    let delay_ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    let Some(wakeup) = shell.wakeup.as_ref() else {
        return;
    };
    match window
        .set_timeout_with_callback_and_timeout_and_arguments_0(wakeup.as_ref().unchecked_ref(), delay_ms)
    {
        Ok(id) => shell.timer = Some(id),
        Err(e) => tracing::error!(error = %js_error_text(&e), "could not schedule wakeup"),
    }
}

fn perform_all(handle: &Handle, effects: Vec<Effect>) {
    for effect in effects {
        if let Err(e) = perform(handle, effect) {
            tracing::error!(error = %js_error_text(&e), "effect failed");
        }
    }
}

fn perform(handle: &Handle, effect: Effect) -> Result<(), JsValue> {
    match effect {
        Effect::Fetch(request) => {
            let weak = Rc::downgrade(handle);
            wasm_bindgen_futures::spawn_local(async move {
                let msg = match fetch::submit_form(&request.form, &request.action).await {
                    Ok(response) => Msg::Response {
                        ticket: request.ticket,
                        response,
                    },
                    Err(reason) => Msg::TransportFailed {
                        ticket: request.ticket,
                        reason,
                    },
                };
                deliver(&weak, msg);
            });
        }
        Effect::FetchVerses { url } => {
            let weak = Rc::downgrade(handle);
            wasm_bindgen_futures::spawn_local(async move {
                let result = fetch::get_text(&url).await;
                deliver(&weak, Msg::VersesLoaded(result));
            });
        }
        Effect::FetchUiConfig { url } => {
            let weak = Rc::downgrade(handle);
            wasm_bindgen_futures::spawn_local(async move {
                let result = fetch::get_text(&url).await;
                deliver(&weak, Msg::UiConfigLoaded(result));
            });
        }
        Effect::RequestAdvice { url, context } => {
            let weak = Rc::downgrade(handle);
            wasm_bindgen_futures::spawn_local(async move {
                let result = fetch::request_advice(&url, &context).await;
                deliver(&weak, Msg::AdviceLoaded(result));
            });
        }
        Effect::ReplacePage(html) => {
            let document: HtmlDocument = document()?.dyn_into()?;
            document.open()?;
            document.write(&Array::of1(&JsValue::from_str(&html)))?;
            document.close()?;
        }
        Effect::Download {
            bytes,
            filename,
            revoke_after,
        } => {
            let parts = Array::of1(&Uint8Array::from(bytes.as_slice()));
            let blob = Blob::new_with_u8_array_sequence(&parts)?;
            let url = Url::create_object_url_with_blob(&blob)?;
            let document = document()?;
            let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
            anchor.set_download(&filename);
            anchor.set_href(&url);
            let body = document.body().ok_or_else(|| JsValue::from_str("no body"))?;
            body.append_child(&anchor)?;
            anchor.click();
            anchor.remove();
            let revoke = Closure::once_into_js(move || {
                let _ = Url::revoke_object_url(&url);
            });
            let delay_ms = i32::try_from(revoke_after.as_millis()).unwrap_or(i32::MAX);
            window()?.set_timeout_with_callback_and_timeout_and_arguments_0(
                revoke.unchecked_ref(),
                delay_ms,
            )?;
        }
        Effect::Navigate(url) => window()?.location().set_href(&url)?,
        Effect::Alert(text) => window()?.alert_with_message(&text)?,
        Effect::SetVerseIntervalLabel(text) => handle.borrow().renderer.set_interval_label(&text),
    }
    Ok(())
}

/// Hand an async result back to the controller if it is still alive.
fn deliver(weak: &Weak<RefCell<Shell>>, msg: Msg) {
    if let Some(handle) = weak.upgrade() {
        dispatch(&handle, msg);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DOM listeners
// ─────────────────────────────────────────────────────────────────────────────

fn listen(
    handle: &Handle,
    target: EventTarget,
    kind: &'static str,
    on_event: impl Fn(&Event) -> Option<Msg> + 'static,
) -> Result<(), JsValue> {
    let weak = Rc::downgrade(handle);
    let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        if let Some(msg) = on_event(&event) {
            deliver(&weak, msg);
        }
    });
    target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
    handle.borrow_mut().listeners.push((target, kind, closure));
    Ok(())
}

fn bind_listeners(handle: &Handle, document: &web_sys::Document, forms: &[String]) -> Result<(), JsValue> {
    for form_id in forms {
        let Some(form) = document.get_element_by_id(form_id) else {
            tracing::debug!(form = %form_id, "form not on page");
            continue;
        };
        let id = form_id.clone();
        let form_el = form.clone();
        listen(handle, form.into(), "submit", move |event| {
            event.prevent_default();
            let action = form_el.get_attribute("action").filter(|a| !a.is_empty());
            let current_path = window()
                .and_then(|w| w.location().pathname())
                .unwrap_or_else(|_| "/".to_string());
            Some(Msg::Submit {
                form: id.clone(),
                action,
                current_path,
            })
        })?;
    }

    for field in Field::ALL {
        if let Ok(Some(el)) = document.query_selector(field.selector()) {
            listen(handle, el.into(), "change", move |_| Some(Msg::FieldChanged(field)))?;
        }
    }

    if let Some(el) = document.get_element_by_id(PRESET_SELECT_ID) {
        let select = el.clone();
        listen(handle, el.into(), "change", move |_| {
            let value = select.dyn_ref::<HtmlSelectElement>()?.value();
            Some(Msg::PresetSelected(value))
        })?;
    }

    let clicks: [(Option<web_sys::Element>, Msg); 4] = [
        (document.get_element_by_id(ADVICE_BUTTON_ID), Msg::AdviceClicked),
        (document.get_element_by_id(NEXT_VERSE_ID), Msg::NextVerse),
        (document.get_element_by_id(RELOAD_VERSES_ID), Msg::ReloadVerses),
        (
            document.query_selector(OVERLAY_CLOSE_SELECTOR).ok().flatten(),
            Msg::CloseOverlay,
        ),
    ];
    for (el, msg) in clicks {
        if let Some(el) = el {
            listen(handle, el.into(), "click", move |_| Some(msg.clone()))?;
        }
    }
    Ok(())
}
