#![forbid(unsafe_code)]

//! Asynchronous form submission state machine.
//!
//! One submission at a time drives the shared overlay. Each accepted
//! submission becomes a [`SubmissionSession`] that owns the [`OverlayLock`];
//! a second submission while the lock is held is refused with
//! [`SubmitError::Busy`] instead of interleaving overlay and timer updates.
//!
//! # Lifecycle
//!
//! ```text
//!  begin ──► AwaitingResponse ──response──► Pacing ──deadline──► resolved
//!                    │                        ▲
//!                    └──transport failure─────┘
//! ```
//!
//! The controller is sans-IO. [`SubmissionController::begin`] returns the
//! request for the host to perform; the host reports back with
//! [`SubmissionController::on_response`] or
//! [`SubmissionController::on_transport_error`], and drives the pacing delay
//! with [`SubmissionController::tick`]. Terminal outcomes are returned as a
//! [`Resolution`] for the host to realize (swap the document, start a
//! download, navigate).
//!
//! Page and data successes resolve without hiding the overlay: the document
//! is about to be replaced or left, so only the hint timer is stopped.

use core::fmt;
use core::time::Duration;

use crate::config::Pacing;
use crate::error::UiError;
use crate::overlay::{OverlayIcon, OverlayPresenter};
use crate::response::{HttpResponse, ResponseKind, classify, preview};
use crate::summary::{Counts, MarkupSummarizer, Summarizer, Summary};

/// Identifies one submission attempt. Responses carrying a stale ticket are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Exclusive right to drive the overlay. Not `Clone`: exactly one exists
/// while a submission is in flight.
#[derive(Debug, PartialEq, Eq)]
pub struct OverlayLock {
    ticket: Ticket,
}

impl OverlayLock {
    #[must_use]
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

/// The request the host must perform for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub ticket: Ticket,
    /// Element id of the submitted form; the host encodes its fields and files.
    pub form: String,
    /// Resolved action URL.
    pub action: String,
    pub method: &'static str,
}

/// Why a submission was not started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Another submission holds the overlay.
    Busy { active_form: String, active: Ticket },
    /// The form is not one of the intercepted forms.
    UnknownForm(String),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Busy {
                active_form,
                active,
            } => write!(f, "submission {active} for {active_form} is still in flight"),
            SubmitError::UnknownForm(form) => write!(f, "form {form:?} is not intercepted"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// How a submission ends, for the host to realize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the whole document with this HTML.
    ReplacePage(String),
    /// Offer these bytes as a file download.
    Download { bytes: Vec<u8>, filename: String },
    /// Navigate to this URL.
    Navigate(String),
    /// Stay on the page; the overlay has been hidden.
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    AwaitingResponse,
    Pacing { until: Duration, then: Finish },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Finish {
    /// Stop hints, hide overlay, stay.
    Cleanup,
    /// Stop hints, keep overlay, hand off to the host.
    HandOff(Resolution),
    /// Stop hints, keep overlay, go to the history page.
    History,
}

/// One in-flight submission.
#[derive(Debug)]
pub struct SubmissionSession {
    lock: OverlayLock,
    form: String,
    started: Duration,
    phase: Phase,
}

impl SubmissionSession {
    #[must_use]
    pub fn ticket(&self) -> Ticket {
        self.lock.ticket()
    }

    #[must_use]
    pub fn form(&self) -> &str {
        &self.form
    }

    #[must_use]
    pub fn started(&self) -> Duration {
        self.started
    }

    /// Whether the response is still outstanding.
    #[must_use]
    pub fn awaiting_response(&self) -> bool {
        self.phase == Phase::AwaitingResponse
    }
}

/// Drives the overlay through one submission at a time.
pub struct SubmissionController {
    pacing: Pacing,
    error_preview_chars: usize,
    history_url: String,
    summarizer: Box<dyn Summarizer>,
    session: Option<SubmissionSession>,
    next_ticket: u64,
}

impl fmt::Debug for SubmissionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionController")
            .field("pacing", &self.pacing)
            .field("history_url", &self.history_url)
            .field("session", &self.session)
            .field("next_ticket", &self.next_ticket)
            .finish()
    }
}

impl Default for SubmissionController {
    fn default() -> Self {
        Self::new(Pacing::default(), 140, "/history")
    }
}

impl SubmissionController {
    #[must_use]
    pub fn new(pacing: Pacing, error_preview_chars: usize, history_url: impl Into<String>) -> Self {
        Self {
            pacing,
            error_preview_chars,
            history_url: history_url.into(),
            summarizer: Box::new(MarkupSummarizer::default()),
            session: None,
            next_ticket: 1,
        }
    }

    /// Replace the success/failure extractor.
    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    #[must_use]
    pub fn session(&self) -> Option<&SubmissionSession> {
        self.session.as_ref()
    }

    /// Whether a submission currently holds the overlay.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.session.is_some()
    }

    /// Accept a submission: take the overlay lock, show the running overlay,
    /// start hints, and return the request to perform.
    ///
    /// `action` empty or `None` falls back to `current_path`.
    pub fn begin(
        &mut self,
        form: &str,
        action: Option<&str>,
        current_path: &str,
        fast: bool,
        now: Duration,
        overlay: &mut OverlayPresenter,
    ) -> Result<SubmitRequest, SubmitError> {
        if let Some(active) = &self.session {
            return Err(SubmitError::Busy {
                active_form: active.form.clone(),
                active: active.ticket(),
            });
        }
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;

        overlay.show();
        overlay.start_hints(fast, now);
        overlay.set_icon(OverlayIcon::Running);

        let action = action
            .filter(|a| !a.is_empty())
            .unwrap_or(current_path)
            .to_string();
        tracing::debug!(form, %ticket, action = %action, fast, "submission started");

        self.session = Some(SubmissionSession {
            lock: OverlayLock { ticket },
            form: form.to_string(),
            started: now,
            phase: Phase::AwaitingResponse,
        });
        Ok(SubmitRequest {
            ticket,
            form: form.to_string(),
            action,
            method: "POST",
        })
    }

    fn awaiting(&mut self, ticket: Ticket) -> Option<&mut SubmissionSession> {
        match self.session.as_mut() {
            Some(session) if session.ticket() == ticket && session.awaiting_response() => {
                Some(session)
            }
            _ => {
                tracing::warn!(%ticket, "ignoring result for stale submission");
                None
            }
        }
    }

    /// The request never completed (or its body could not be read).
    pub fn on_transport_error(
        &mut self,
        ticket: Ticket,
        reason: &UiError,
        now: Duration,
        overlay: &mut OverlayPresenter,
    ) {
        let pause = self.pacing.failure;
        let Some(session) = self.awaiting(ticket) else {
            return;
        };
        tracing::error!(form = %session.form, %ticket, error = %reason, "submission failed");
        overlay.set_message(format!("Error: {reason}"));
        overlay.set_icon(OverlayIcon::Error);
        session.phase = Phase::Pacing {
            until: now.saturating_add(pause),
            then: Finish::Cleanup,
        };
    }

    /// A response arrived. Returns a [`Resolution::Download`] immediately for
    /// attachments; every other terminal outcome is returned by [`tick`](Self::tick)
    /// once the pacing delay elapses.
    pub fn on_response(
        &mut self,
        ticket: Ticket,
        response: HttpResponse,
        now: Duration,
        overlay: &mut OverlayPresenter,
    ) -> Option<Resolution> {
        let pacing = self.pacing;
        let preview_chars = self.error_preview_chars;
        let session = self.session.as_ref()?;
        if session.ticket() != ticket || !session.awaiting_response() {
            tracing::warn!(%ticket, "ignoring result for stale submission");
            return None;
        }
        let started = session.started;
        let kind = classify(response);
        tracing::debug!(%ticket, kind = kind.label(), "response classified");

        let (pause, then, immediate) = match kind {
            ResponseKind::Error { status, text } => {
                overlay.set_icon(OverlayIcon::Error);
                overlay.set_message(format!("Error {status}: {}", preview(&text, preview_chars)));
                (pacing.http_error, Finish::Cleanup, None)
            }
            ResponseKind::Page { html } => {
                overlay.set_icon(OverlayIcon::Success);
                let counts = self.summarizer.count(&html);
                overlay.toast(Summary::new(counts, started, now).to_string(), now);
                overlay.set_message("Done ✓");
                (
                    pacing.done,
                    Finish::HandOff(Resolution::ReplacePage(html)),
                    None,
                )
            }
            ResponseKind::Attachment { bytes, filename } => {
                overlay.set_icon(OverlayIcon::Success);
                let counts = Counts { ok: 1, failed: 0 };
                overlay.toast(Summary::new(counts, started, now).to_string(), now);
                overlay.set_message("Download started ✓");
                (
                    pacing.download,
                    Finish::Cleanup,
                    Some(Resolution::Download { bytes, filename }),
                )
            }
            ResponseKind::Data { text, json } => {
                if let Some(json) = &json {
                    tracing::debug!(%ticket, response = %json, "json response");
                }
                overlay.set_icon(OverlayIcon::Success);
                let counts = self.summarizer.count(&text);
                overlay.toast(Summary::new(counts, started, now).to_string(), now);
                overlay.set_message("Done ✓");
                (pacing.done, Finish::History, None)
            }
        };

        if let Some(session) = self.session.as_mut() {
            session.phase = Phase::Pacing {
                until: now.saturating_add(pause),
                then,
            };
        }
        immediate
    }

    /// Drive the pacing delay. Returns the terminal [`Resolution`] once the
    /// delay has elapsed, releasing the overlay lock.
    pub fn tick(&mut self, now: Duration, overlay: &mut OverlayPresenter) -> Option<Resolution> {
        let due = matches!(
            &self.session,
            Some(SubmissionSession { phase: Phase::Pacing { until, .. }, .. }) if now >= *until
        );
        if !due {
            return None;
        }
        let session = self.session.take()?;
        let Phase::Pacing { then, .. } = session.phase else {
            return None;
        };
        overlay.stop_hints();
        let resolution = match then {
            Finish::Cleanup => {
                overlay.hide();
                Resolution::Inline
            }
            Finish::History => Resolution::Navigate(self.history_url.clone()),
            Finish::HandOff(resolution) => resolution,
        };
        tracing::debug!(
            form = %session.form,
            ticket = %session.lock.ticket(),
            "submission finished"
        );
        Some(resolution)
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        match &self.session {
            Some(SubmissionSession {
                phase: Phase::Pacing { until, .. },
                ..
            }) => Some(*until),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{FAST_HINTS, NORMAL_HINTS, OverlayState};
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn started() -> (SubmissionController, OverlayPresenter, SubmitRequest) {
        let mut controller = SubmissionController::default();
        let mut overlay = OverlayPresenter::default();
        let request = controller
            .begin("clean-form", None, "/", false, Duration::ZERO, &mut overlay)
            .unwrap();
        (controller, overlay, request)
    }

    #[test]
    fn begin_shows_running_overlay_and_builds_request() {
        let (controller, overlay, request) = started();
        assert_eq!(
            request,
            SubmitRequest {
                ticket: Ticket(1),
                form: "clean-form".into(),
                action: "/".into(),
                method: "POST",
            }
        );
        assert_eq!(overlay.state(), OverlayState::Running);
        assert_eq!(overlay.message(), Some(NORMAL_HINTS[0]));
        assert!(controller.is_busy());
    }

    #[test]
    fn explicit_action_wins() {
        let mut controller = SubmissionController::default();
        let mut overlay = OverlayPresenter::default();
        let request = controller
            .begin("separate-form", Some("/separate"), "/", true, Duration::ZERO, &mut overlay)
            .unwrap();
        assert_eq!(request.action, "/separate");
        assert_eq!(overlay.message(), Some(FAST_HINTS[0]));
    }

    #[test]
    fn second_submission_is_refused() {
        let (mut controller, mut overlay, _) = started();
        let err = controller
            .begin("separate-form", None, "/", true, ms(10), &mut overlay)
            .unwrap_err();
        assert_eq!(
            err,
            SubmitError::Busy {
                active_form: "clean-form".into(),
                active: Ticket(1)
            }
        );
        // The refused attempt did not restart the hint cycle.
        assert_eq!(overlay.hints().map(|h| h.len()), Some(6));
    }

    #[test]
    fn http_error_shows_preview_then_hides() {
        let (mut controller, mut overlay, request) = started();
        let body = "x".repeat(300);
        let resp = HttpResponse::new(500)
            .header("Content-Type", "text/html")
            .body(body);
        assert_eq!(controller.on_response(request.ticket, resp, ms(100), &mut overlay), None);
        assert_eq!(overlay.state(), OverlayState::Error);
        assert_eq!(overlay.message(), Some(format!("Error 500: {}", "x".repeat(140)).as_str()));

        assert_eq!(controller.tick(ms(4099), &mut overlay), None);
        assert_eq!(
            controller.tick(ms(4100), &mut overlay),
            Some(Resolution::Inline)
        );
        assert_eq!(overlay.state(), OverlayState::Hidden);
        assert!(overlay.hints().is_none());
        assert!(!controller.is_busy());
    }

    #[test]
    fn page_replaces_document_without_hiding() {
        let (mut controller, mut overlay, request) = started();
        let html = r#"<a href="/download/a.wav">a</a><div class="error">b</div>"#;
        let resp = HttpResponse::new(200)
            .header("Content-Type", "text/html")
            .body(html);
        assert_eq!(controller.on_response(request.ticket, resp, ms(3200), &mut overlay), None);
        assert_eq!(overlay.message(), Some("Done ✓"));
        assert_eq!(
            overlay.view().toast.as_deref(),
            Some("Processed 1 OK, 1 failed in 3s")
        );
        assert_eq!(
            controller.tick(ms(3800), &mut overlay),
            Some(Resolution::ReplacePage(html.to_string()))
        );
        assert!(overlay.is_visible());
        assert!(overlay.hints().is_none());
        assert!(!controller.is_busy());
    }

    struct FixedCounts(Counts);

    impl Summarizer for FixedCounts {
        fn count(&self, _body: &str) -> Counts {
            self.0
        }
    }

    #[test]
    fn custom_summarizer_feeds_toast() {
        let mut controller = SubmissionController::default()
            .with_summarizer(Box::new(FixedCounts(Counts { ok: 7, failed: 2 })));
        let mut overlay = OverlayPresenter::default();
        let request = controller
            .begin("clean-form", None, "/", false, Duration::ZERO, &mut overlay)
            .unwrap();
        let resp = HttpResponse::new(200)
            .header("Content-Type", "text/html")
            .body("<p>no markers here</p>");
        controller.on_response(request.ticket, resp, ms(1200), &mut overlay);
        assert_eq!(
            overlay.view().toast.as_deref(),
            Some("Processed 7 OK, 2 failed in 1s")
        );
    }

    #[test]
    fn attachment_downloads_immediately_then_cleans_up() {
        let (mut controller, mut overlay, request) = started();
        let resp = HttpResponse::new(200)
            .header("Content-Type", "audio/flac")
            .header("Content-Disposition", "attachment; filename=\"take1.flac\"")
            .body(vec![9u8; 4]);
        assert_eq!(
            controller.on_response(request.ticket, resp, ms(500), &mut overlay),
            Some(Resolution::Download {
                bytes: vec![9; 4],
                filename: "take1.flac".into()
            })
        );
        assert_eq!(overlay.message(), Some("Download started ✓"));
        assert_eq!(controller.tick(ms(1499), &mut overlay), None);
        assert_eq!(
            controller.tick(ms(1500), &mut overlay),
            Some(Resolution::Inline)
        );
        assert!(!overlay.is_visible());
    }

    #[test]
    fn json_navigates_to_history() {
        let (mut controller, mut overlay, request) = started();
        let resp = HttpResponse::new(200)
            .header("Content-Type", "application/json")
            .body(r#"{"job":"42"}"#);
        controller.on_response(request.ticket, resp, ms(100), &mut overlay);
        assert_eq!(overlay.state(), OverlayState::Success);
        assert_eq!(
            controller.tick(ms(700), &mut overlay),
            Some(Resolution::Navigate("/history".into()))
        );
        assert!(overlay.is_visible());
    }

    #[test]
    fn transport_failure_shows_reason() {
        let (mut controller, mut overlay, request) = started();
        controller.on_transport_error(
            request.ticket,
            &UiError::Transport("TypeError: Failed to fetch".into()),
            ms(50),
            &mut overlay,
        );
        assert_eq!(overlay.message(), Some("Error: TypeError: Failed to fetch"));
        assert_eq!(overlay.state(), OverlayState::Error);
        assert_eq!(controller.next_deadline(), Some(ms(2550)));
        assert_eq!(
            controller.tick(ms(2550), &mut overlay),
            Some(Resolution::Inline)
        );
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let (mut controller, mut overlay, request) = started();
        let stale = Ticket(request.ticket.0 + 10);
        assert_eq!(
            controller.on_response(stale, HttpResponse::new(500), ms(10), &mut overlay),
            None
        );
        controller.on_transport_error(stale, &UiError::Transport("late".into()), ms(10), &mut overlay);
        assert_eq!(overlay.state(), OverlayState::Running);
        assert!(controller.session().unwrap().awaiting_response());
    }

    #[test]
    fn duplicate_response_is_ignored_during_pacing() {
        let (mut controller, mut overlay, request) = started();
        controller.on_response(request.ticket, HttpResponse::new(404), ms(10), &mut overlay);
        let deadline = controller.next_deadline();
        controller.on_response(
            request.ticket,
            HttpResponse::new(200).header("Content-Type", "text/html"),
            ms(20),
            &mut overlay,
        );
        assert_eq!(controller.next_deadline(), deadline);
        assert_eq!(overlay.state(), OverlayState::Error);
    }

    #[test]
    fn lock_released_allows_next_submission() {
        let (mut controller, mut overlay, request) = started();
        controller.on_response(request.ticket, HttpResponse::new(502), ms(10), &mut overlay);
        controller.tick(ms(5000), &mut overlay);
        let next = controller
            .begin("separate-form", None, "/", false, ms(6000), &mut overlay)
            .unwrap();
        assert_eq!(next.ticket, Ticket(2));
        assert_eq!(overlay.state(), OverlayState::Running);
    }
}
