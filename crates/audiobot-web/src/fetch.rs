#![forbid(unsafe_code)]

//! `fetch` wrappers returning controller-ready values.
//!
//! Rejected promises and unreadable bodies become [`UiError::Transport`]
//! carrying the JS error text; a non-2xx answer to a plain GET becomes
//! [`UiError::Http`]. Submissions hand every status to the controller.

use audiobot_ui::{HttpResponse, UiError};
use js_sys::Uint8Array;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{FormData, HtmlFormElement, HtmlInputElement, RequestCache, RequestInit, Response};

use crate::dom::{FILES_SELECTOR, document, js_error_text, window};

/// Headers the controller classifies on.
const CAPTURED_HEADERS: [&str; 2] = ["content-type", "content-disposition"];

fn transport(e: JsValue) -> UiError {
    UiError::Transport(js_error_text(&e))
}

async fn send(url: &str, init: &RequestInit) -> Result<Response, UiError> {
    let window = window().map_err(transport)?;
    let value = JsFuture::from(window.fetch_with_str_and_init(url, init))
        .await
        .map_err(transport)?;
    value
        .dyn_into::<Response>()
        .map_err(|_| UiError::Transport("fetch did not return a Response".into()))
}

async fn body_text(resp: &Response) -> Result<String, UiError> {
    let text = JsFuture::from(resp.text().map_err(transport)?)
        .await
        .map_err(transport)?;
    text.as_string()
        .ok_or_else(|| UiError::Transport("body is not text".into()))
}

/// POST a form's fields and files to `action` and buffer the whole response.
pub async fn submit_form(form_id: &str, action: &str) -> Result<HttpResponse, UiError> {
    let document = document().map_err(transport)?;
    let form: HtmlFormElement = document
        .get_element_by_id(form_id)
        .ok_or_else(|| UiError::Transport(format!("form {form_id} not found")))?
        .dyn_into()
        .map_err(|_| UiError::Transport(format!("{form_id} is not a form")))?;
    let data = FormData::new_with_form(&form).map_err(transport)?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_body(&data);
    let resp = send(action, &init).await?;

    let mut response = HttpResponse::new(resp.status());
    let headers = resp.headers();
    for name in CAPTURED_HEADERS {
        if let Ok(Some(value)) = headers.get(name) {
            response = response.header(name, value);
        }
    }
    let buffer = JsFuture::from(resp.array_buffer().map_err(transport)?)
        .await
        .map_err(transport)?;
    Ok(response.body(Uint8Array::new(&buffer).to_vec()))
}

/// GET a JSON resource bypassing the HTTP cache; non-2xx is an error.
pub async fn get_text(url: &str) -> Result<String, UiError> {
    let init = RequestInit::new();
    init.set_method("GET");
    init.set_cache(RequestCache::NoStore);
    let resp = send(url, &init).await?;
    if !resp.ok() {
        return Err(UiError::Http {
            status: resp.status(),
        });
    }
    body_text(&resp).await
}

/// POST the first selected upload (if any) and the processing context.
pub async fn request_advice(url: &str, context: &str) -> Result<String, UiError> {
    let data = FormData::new().map_err(transport)?;
    let document = document().map_err(transport)?;
    let file = document
        .query_selector(FILES_SELECTOR)
        .ok()
        .flatten()
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        .and_then(|input| input.files())
        .and_then(|files| files.get(0));
    if let Some(file) = file {
        data.append_with_blob("file", &file).map_err(transport)?;
    }
    data.append_with_str("context", context)
        .map_err(transport)?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_body(&JsValue::from(data));
    let resp = send(url, &init).await?;
    body_text(&resp).await
}
