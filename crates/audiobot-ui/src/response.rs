#![forbid(unsafe_code)]

//! Buffered HTTP responses and their classification.
//!
//! The host hands over a fully-buffered response; nothing here streams.
//! Classification order:
//!
//! 1. non-2xx status → [`ResponseKind::Error`] (content type is irrelevant)
//! 2. `Content-Type` contains `text/html` → [`ResponseKind::Page`]
//! 3. `Content-Type` starts with `audio` or `Content-Disposition` contains
//!    `attachment` → [`ResponseKind::Attachment`]
//! 4. anything else → [`ResponseKind::Data`] (JSON parse attempted)

use serde_json::Value;

/// Filename used when `Content-Disposition` carries none.
pub const FALLBACK_FILENAME: &str = "download";

/// A fully-buffered HTTP response as seen by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup (first match).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `200..=299`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Lowercased `Content-Type`, empty when absent.
    #[must_use]
    pub fn content_type(&self) -> String {
        self.header_value("content-type")
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// Raw `Content-Disposition`, empty when absent.
    #[must_use]
    pub fn content_disposition(&self) -> &str {
        self.header_value("content-disposition").unwrap_or_default()
    }

    /// Body decoded as text (invalid UTF-8 replaced).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// What kind of answer the server gave.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseKind {
    /// Non-2xx status with its body text.
    Error { status: u16, text: String },
    /// A rendered HTML results page.
    Page { html: String },
    /// A binary file to download.
    Attachment { bytes: Vec<u8>, filename: String },
    /// JSON or any other payload.
    Data { text: String, json: Option<Value> },
}

impl ResponseKind {
    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            ResponseKind::Error { .. } => "error",
            ResponseKind::Page { .. } => "page",
            ResponseKind::Attachment { .. } => "attachment",
            ResponseKind::Data { .. } => "data",
        }
    }
}

/// Classify a buffered response.
#[must_use]
pub fn classify(response: HttpResponse) -> ResponseKind {
    if !response.is_success() {
        return ResponseKind::Error {
            status: response.status,
            text: response.text(),
        };
    }
    let content_type = response.content_type();
    if content_type.contains("text/html") {
        return ResponseKind::Page {
            html: response.text(),
        };
    }
    let disposition = response.content_disposition();
    if content_type.starts_with("audio") || disposition.to_ascii_lowercase().contains("attachment") {
        let filename =
            disposition_filename(disposition).unwrap_or_else(|| FALLBACK_FILENAME.to_string());
        return ResponseKind::Attachment {
            bytes: response.body,
            filename,
        };
    }
    let text = response.text();
    let json = match serde_json::from_str::<Value>(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "response body is not json");
            None
        }
    };
    ResponseKind::Data { text, json }
}

/// Extract the filename from a `Content-Disposition` header.
///
/// Matches `filename\s*=\s*"?([^";]+)"?` case-insensitively: the value runs
/// until a quote or semicolon. Returns `None` when absent or empty.
#[must_use]
pub fn disposition_filename(disposition: &str) -> Option<String> {
    const KEY: &str = "filename";
    let lower = disposition.to_ascii_lowercase();
    let mut search_from = 0;
    while let Some(rel) = lower[search_from..].find(KEY) {
        let after_key = search_from + rel + KEY.len();
        search_from = after_key;
        let rest = disposition[after_key..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();
        let rest = rest.strip_prefix('"').unwrap_or(rest);
        let end = rest.find(['"', ';']).unwrap_or(rest.len());
        let value = &rest[..end];
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

/// First `max_chars` characters of `text`.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
