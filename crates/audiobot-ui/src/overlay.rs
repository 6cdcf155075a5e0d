#![forbid(unsafe_code)]

//! Overlay and toast presenter.
//!
//! The overlay is a full-screen modal shown while a submission is in flight.
//! It carries a status icon (running / success / error), a single message
//! line, and a rotating progress hint that writes into that same line. The
//! toast is a small auto-dismissing notification independent of the overlay.
//!
//! All timing is deadline-based against the host clock: [`OverlayPresenter::tick`]
//! advances the hint cycle and expires toasts. The presenter owns at most one
//! [`HintCycle`]; starting a new cycle replaces the previous one.
//!
//! # Invariants
//!
//! 1. At most one hint cycle is active.
//! 2. Exactly one icon state is set at a time.
//! 3. A toast's auto-hide only hides that toast, never a newer one.

use core::time::Duration;

use crate::clock::{catch_up, is_due};

/// Hints shown while the fast processing chain runs.
pub const FAST_HINTS: [&str; 5] = [
    "Uploading…",
    "Fast chain: light denoise…",
    "Fast chain: de-ess…",
    "Fast chain: limiting…",
    "Saving output…",
];

/// Hints shown while the full processing chain runs.
pub const NORMAL_HINTS: [&str; 6] = [
    "Uploading…",
    "Applying denoise (afftdn)…",
    "De-essing…",
    "Filtering (high/low-pass)…",
    "Limiting and normalizing…",
    "Saving output…",
];

/// Default hint rotation period.
pub const DEFAULT_HINT_PERIOD: Duration = Duration::from_millis(2500);

/// Default toast visibility.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

/// Lifecycle state of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Hidden,
    Running,
    Success,
    Error,
}

/// Overlay status icon. Setting one clears the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayIcon {
    #[default]
    Running,
    Success,
    Error,
}

impl OverlayIcon {
    /// CSS class carried by the icon element for this state.
    #[must_use]
    pub const fn class(self) -> &'static str {
        match self {
            OverlayIcon::Running => "overlay-running",
            OverlayIcon::Success => "overlay-success",
            OverlayIcon::Error => "overlay-error",
        }
    }

    /// Every icon class, for hosts that clear all before setting one.
    pub const CLASSES: [&'static str; 3] = ["overlay-running", "overlay-success", "overlay-error"];
}

// ---------------------------------------------------------------------------
// Hint cycle
// ---------------------------------------------------------------------------

/// A rotating sequence of short progress hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintCycle {
    hints: &'static [&'static str],
    index: usize,
    period: Duration,
    next_at: Duration,
}

impl HintCycle {
    /// Start a cycle at `now`; the first hint is current immediately.
    #[must_use]
    pub fn start(fast: bool, now: Duration, period: Duration) -> Self {
        let hints: &'static [&'static str] = if fast { &FAST_HINTS } else { &NORMAL_HINTS };
        Self {
            hints,
            index: 0,
            period,
            next_at: now.saturating_add(period),
        }
    }

    #[must_use]
    pub fn current(&self) -> &'static str {
        self.hints[self.index]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Advance once per elapsed period, wrapping at the end.
    ///
    /// Returns `true` if at least one period elapsed.
    pub fn poll(&mut self, now: Duration) -> bool {
        let (due, next_at) = catch_up(self.next_at, self.period, now);
        self.next_at = next_at;
        let len = self.hints.len() as u64;
        self.index = ((self.index as u64 + due % len) % len) as usize;
        due > 0
    }
}

// ---------------------------------------------------------------------------
// Toast
// ---------------------------------------------------------------------------

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    id: u64,
    message: String,
    expires_at: Duration,
}

impl Toast {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn expires_at(&self) -> Duration {
        self.expires_at
    }
}

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// Snapshot of what the host should render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverlayView {
    /// Whether the overlay element is visible.
    pub visible: bool,
    /// Active icon state.
    pub icon: OverlayIcon,
    /// Status line text, if any has been set.
    pub message: Option<String>,
    /// Visible toast text, if a toast is showing.
    pub toast: Option<String>,
}

/// Owns overlay visibility, icon, message line, hint cycle and toast.
#[derive(Debug, Clone)]
pub struct OverlayPresenter {
    visible: bool,
    icon: OverlayIcon,
    message: Option<String>,
    hints: Option<HintCycle>,
    hint_period: Duration,
    toast: Option<Toast>,
    toast_duration: Duration,
    next_toast_id: u64,
}

impl Default for OverlayPresenter {
    fn default() -> Self {
        Self::new(DEFAULT_HINT_PERIOD, DEFAULT_TOAST_DURATION)
    }
}

impl OverlayPresenter {
    #[must_use]
    pub fn new(hint_period: Duration, toast_duration: Duration) -> Self {
        Self {
            visible: false,
            icon: OverlayIcon::Running,
            message: None,
            hints: None,
            hint_period,
            toast: None,
            toast_duration,
            next_toast_id: 1,
        }
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_message(&mut self, text: impl Into<String>) {
        self.message = Some(text.into());
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_icon(&mut self, icon: OverlayIcon) {
        self.icon = icon;
    }

    #[must_use]
    pub fn icon(&self) -> OverlayIcon {
        self.icon
    }

    /// Overlay lifecycle state derived from visibility and icon.
    #[must_use]
    pub fn state(&self) -> OverlayState {
        if !self.visible {
            return OverlayState::Hidden;
        }
        match self.icon {
            OverlayIcon::Running => OverlayState::Running,
            OverlayIcon::Success => OverlayState::Success,
            OverlayIcon::Error => OverlayState::Error,
        }
    }

    /// Begin cycling hints, replacing any prior cycle.
    pub fn start_hints(&mut self, fast: bool, now: Duration) {
        let cycle = HintCycle::start(fast, now, self.hint_period);
        self.message = Some(cycle.current().to_string());
        if self.hints.replace(cycle).is_some() {
            tracing::trace!("replaced active hint cycle");
        }
    }

    /// Cancel the active hint cycle, if any.
    pub fn stop_hints(&mut self) {
        self.hints = None;
    }

    #[must_use]
    pub fn hints(&self) -> Option<&HintCycle> {
        self.hints.as_ref()
    }

    /// Show a toast for the default duration.
    pub fn toast(&mut self, message: impl Into<String>, now: Duration) -> u64 {
        self.toast_for(message, self.toast_duration, now)
    }

    /// Show a toast for `duration`. A newer toast replaces an older one.
    pub fn toast_for(&mut self, message: impl Into<String>, duration: Duration, now: Duration) -> u64 {
        let id = self.next_toast_id;
        self.next_toast_id += 1;
        self.toast = Some(Toast {
            id,
            message: message.into(),
            expires_at: now.saturating_add(duration),
        });
        id
    }

    #[must_use]
    pub fn active_toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    /// Advance timers. Returns `true` if anything visible changed.
    ///
    /// Hints only write into the message line while the icon is `Running`,
    /// so a terminal status stays readable during the pacing delay.
    pub fn tick(&mut self, now: Duration) -> bool {
        let mut changed = false;
        if self.icon == OverlayIcon::Running
            && let Some(cycle) = self.hints.as_mut()
            && cycle.poll(now)
        {
            self.message = Some(cycle.current().to_string());
            changed = true;
        }
        if self.toast.as_ref().is_some_and(|t| is_due(t.expires_at, now)) {
            self.toast = None;
            changed = true;
        }
        changed
    }

    /// Earliest pending deadline, for hosts that schedule precise wakeups.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        let hint = self
            .hints
            .as_ref()
            .filter(|_| self.icon == OverlayIcon::Running)
            .map(|c| c.next_at);
        let toast = self.toast.as_ref().map(|t| t.expires_at);
        match (hint, toast) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    #[must_use]
    pub fn view(&self) -> OverlayView {
        OverlayView {
            visible: self.visible,
            icon: self.icon,
            message: self.message.clone(),
            toast: self.toast.as_ref().map(|t| t.message.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PERIOD: Duration = DEFAULT_HINT_PERIOD;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn hint_lengths_match_mode() {
        assert_eq!(HintCycle::start(true, Duration::ZERO, PERIOD).len(), 5);
        assert_eq!(HintCycle::start(false, Duration::ZERO, PERIOD).len(), 6);
    }

    #[test]
    fn hints_advance_every_period_and_wrap() {
        let mut cycle = HintCycle::start(true, Duration::ZERO, PERIOD);
        let mut seen = vec![cycle.current()];
        for step in 1..=5u64 {
            assert!(!cycle.poll(ms(step * 2500 - 1)));
            assert!(cycle.poll(ms(step * 2500)));
            seen.push(cycle.current());
        }
        assert_eq!(seen[..5], FAST_HINTS[..]);
        assert_eq!(seen[5], FAST_HINTS[0]);
    }

    #[test]
    fn late_poll_catches_up() {
        let mut cycle = HintCycle::start(false, Duration::ZERO, PERIOD);
        assert!(cycle.poll(ms(7600)));
        assert_eq!(cycle.index(), 3);
    }

    #[test]
    fn tiny_period_after_long_suspend() {
        let mut cycle = HintCycle::start(false, Duration::ZERO, ms(1));
        assert!(cycle.poll(ms(3_600_002)));
        assert_eq!(cycle.index(), 3_600_002 % NORMAL_HINTS.len());
        assert!(!cycle.poll(ms(3_600_002)));
        assert!(cycle.poll(ms(3_600_003)));
    }

    #[test]
    fn starting_hints_replaces_previous_cycle() {
        let mut overlay = OverlayPresenter::default();
        overlay.start_hints(false, Duration::ZERO);
        overlay.tick(ms(2500));
        assert_eq!(overlay.message(), Some(NORMAL_HINTS[1]));

        overlay.start_hints(true, ms(3000));
        assert_eq!(overlay.message(), Some(FAST_HINTS[0]));
        assert_eq!(overlay.hints().map(HintCycle::len), Some(5));
        // Old deadline (5000ms) no longer fires; new one is at 5500ms.
        assert!(!overlay.tick(ms(5000)));
        assert!(overlay.tick(ms(5500)));
        assert_eq!(overlay.message(), Some(FAST_HINTS[1]));
    }

    #[test]
    fn stop_hints_freezes_message() {
        let mut overlay = OverlayPresenter::default();
        overlay.start_hints(true, Duration::ZERO);
        overlay.stop_hints();
        assert!(!overlay.tick(ms(10_000)));
        assert_eq!(overlay.message(), Some(FAST_HINTS[0]));
    }

    #[test]
    fn terminal_icon_pauses_hints() {
        let mut overlay = OverlayPresenter::default();
        overlay.show();
        overlay.start_hints(false, Duration::ZERO);
        overlay.set_icon(OverlayIcon::Success);
        overlay.set_message("Done ✓");
        overlay.tick(ms(2500));
        assert_eq!(overlay.message(), Some("Done ✓"));
        assert_eq!(overlay.state(), OverlayState::Success);
    }

    #[test]
    fn state_follows_visibility_and_icon() {
        let mut overlay = OverlayPresenter::default();
        assert_eq!(overlay.state(), OverlayState::Hidden);
        overlay.show();
        assert_eq!(overlay.state(), OverlayState::Running);
        overlay.set_icon(OverlayIcon::Error);
        assert_eq!(overlay.state(), OverlayState::Error);
        overlay.hide();
        assert_eq!(overlay.state(), OverlayState::Hidden);
    }

    #[test]
    fn toast_expires_after_duration() {
        let mut overlay = OverlayPresenter::default();
        overlay.toast("Saved", Duration::ZERO);
        assert!(!overlay.tick(ms(2999)));
        assert_eq!(overlay.view().toast.as_deref(), Some("Saved"));
        assert!(overlay.tick(ms(3000)));
        assert_eq!(overlay.view().toast, None);
    }

    #[test]
    fn older_toast_timer_does_not_hide_newer_toast() {
        let mut overlay = OverlayPresenter::default();
        overlay.toast_for("first", ms(1000), Duration::ZERO);
        overlay.toast_for("second", ms(3000), ms(500));
        overlay.tick(ms(1000));
        assert_eq!(overlay.view().toast.as_deref(), Some("second"));
        overlay.tick(ms(3500));
        assert_eq!(overlay.view().toast, None);
    }

    #[test]
    fn next_deadline_is_earliest() {
        let mut overlay = OverlayPresenter::default();
        assert_eq!(overlay.next_deadline(), None);
        overlay.start_hints(true, Duration::ZERO);
        overlay.toast_for("x", ms(1000), Duration::ZERO);
        assert_eq!(overlay.next_deadline(), Some(ms(1000)));
    }
}
