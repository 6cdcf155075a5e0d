#![forbid(unsafe_code)]

//! Parameter advice from the server.
//!
//! The host posts the first selected upload and the processing context to
//! the advice endpoint. A successful answer carries knob values that are
//! applied to the form like a preset, plus a short provenance note shown to
//! the user.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{UiError, UiResult};
use crate::page::FormPage;
use crate::preset::apply_preset;

/// Shown when the answer is well-formed but carries no parameters.
pub const ADVICE_FAILED: &str = "Advice failed.";

/// Shown when the request or its body could not be read.
pub const ADVICE_ERROR: &str = "Advice error.";

/// Body of an advice response.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AdviceResponse {
    pub ok: bool,
    pub params: Option<Map<String, Value>>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

impl AdviceResponse {
    pub fn parse(raw: &str) -> UiResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Result of handling one advice answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdviceOutcome {
    /// Parameters were applied to `applied` fields.
    Applied { message: String, applied: usize },
    /// The server declined or sent no parameters.
    Failed,
    /// Transport failure or unreadable body.
    Error,
}

impl AdviceOutcome {
    /// Text for the user-facing alert.
    #[must_use]
    pub fn alert_text(&self) -> &str {
        match self {
            AdviceOutcome::Applied { message, .. } => message,
            AdviceOutcome::Failed => ADVICE_FAILED,
            AdviceOutcome::Error => ADVICE_ERROR,
        }
    }
}

/// Apply a fetched advice body (or the transport error) to `page`.
pub fn handle_advice<P: FormPage + ?Sized>(
    page: &mut P,
    body: Result<&str, &UiError>,
) -> AdviceOutcome {
    let raw = match body {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(error = %e, "advice request failed");
            return AdviceOutcome::Error;
        }
    };
    let response = match AdviceResponse::parse(raw) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "advice response unreadable");
            return AdviceOutcome::Error;
        }
    };
    match response {
        AdviceResponse {
            ok: true,
            params: Some(params),
            source,
            notes,
        } => {
            let applied = apply_preset(page, &params);
            let source = source.as_deref().unwrap_or("unknown");
            tracing::debug!(source, applied, "advice applied");
            AdviceOutcome::Applied {
                message: format!("Advice source: {source}\n{}", notes.unwrap_or_default()),
                applied,
            }
        }
        _ => {
            tracing::warn!("advice declined");
            AdviceOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Field, MemoryPage};
    use pretty_assertions::assert_eq;

    #[test]
    fn applies_params_and_reports_source() {
        let mut page = MemoryPage::with_defaults();
        let body = r#"{"ok":true,"params":{"highpass":90,"bogus":1},"source":"heuristic","notes":"quiet room"}"#;
        let outcome = handle_advice(&mut page, Ok(body));
        assert_eq!(
            outcome,
            AdviceOutcome::Applied {
                message: "Advice source: heuristic\nquiet room".into(),
                applied: 1
            }
        );
        assert_eq!(page.value(Field::Highpass).as_deref(), Some("90"));
    }

    #[test]
    fn missing_notes_and_source() {
        let mut page = MemoryPage::with_defaults();
        let outcome = handle_advice(&mut page, Ok(r#"{"ok":true,"params":{}}"#));
        assert_eq!(outcome.alert_text(), "Advice source: unknown\n");
    }

    #[test]
    fn declined_or_paramless_is_failed() {
        let mut page = MemoryPage::with_defaults();
        assert_eq!(
            handle_advice(&mut page, Ok(r#"{"ok":false,"params":{"limiter":0.5}}"#)),
            AdviceOutcome::Failed
        );
        assert_eq!(handle_advice(&mut page, Ok(r#"{"ok":true}"#)), AdviceOutcome::Failed);
        assert_eq!(page, MemoryPage::with_defaults());
    }

    #[test]
    fn transport_or_garbage_is_error() {
        let mut page = MemoryPage::empty();
        assert_eq!(handle_advice(&mut page, Err(&UiError::Transport("offline".into()))).alert_text(), "Advice error.");
        assert_eq!(handle_advice(&mut page, Ok("<html>")), AdviceOutcome::Error);
    }
}
