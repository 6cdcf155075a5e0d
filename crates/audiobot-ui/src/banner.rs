#![forbid(unsafe_code)]

//! Banner rotator: cycles a shuffled queue of short text snippets.
//!
//! The verse list is fetched by the host; the rotator keeps a queue that is
//! refilled with a fresh Fisher–Yates shuffle of the whole list whenever it
//! runs dry, so a list of N verses is exhausted in exactly N displays before
//! the next reshuffle. An empty list refills the queue with a single fallback
//! string.
//!
//! Each display fades: the text is hidden, and after the fade delay the new
//! text is swapped in and shown again.
//!
//! # Failure Modes
//!
//! - Verses endpoint down or malformed: the host reports an empty list and
//!   the fallback is shown.
//! - Queue empty when a rotation is due: [`Advance::NeedsVerses`] asks the
//!   host to re-fetch; the display waits for the reload.

use core::time::Duration;
use std::collections::VecDeque;

use serde_json::Value;

use crate::clock::{catch_up, is_due};

/// Simple LCG PRNG for deterministic shuffles.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        // LCG parameters from Numerical Recipes
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform-ish index in `0..bound`; `bound` must be non-zero.
    fn below(&mut self, bound: usize) -> usize {
        // High bits of an LCG are the well-distributed ones.
        let r = self.next_u64() >> 33;
        (r % bound as u64) as usize
    }

    /// In-place Fisher–Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }
}

/// Extract the verse list from a `/verses.json` body.
///
/// `verses` may be an array or an object of strings; non-strings and blank
/// strings are dropped. Anything unparsable yields an empty list.
#[must_use]
pub fn parse_verses(raw: &str) -> Vec<String> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "verses payload is not json");
            return Vec::new();
        }
    };
    let items: Vec<&Value> = match value.get("verses") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Outcome of asking the rotator for the next display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A new text is fading in.
    Shown,
    /// The queue is empty; fetch the list and call [`BannerRotator::reload`].
    NeedsVerses,
}

/// What the host should render into the banner text element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BannerView {
    pub text: Option<String>,
    /// Opacity 1 when `true`, 0 while fading.
    pub visible: bool,
}

/// Owned verse queue with fade and rotation timers.
#[derive(Debug, Clone)]
pub struct BannerRotator {
    verses: Vec<String>,
    queue: VecDeque<String>,
    rng: SeededRng,
    default_fallback: String,
    shown: Option<String>,
    visible: bool,
    pending_swap: Option<(String, Duration)>,
    fade: Duration,
    interval: Option<Duration>,
    next_rotation: Option<Duration>,
    displays: u64,
}

impl BannerRotator {
    /// `initial_text` is whatever the banner element already contains.
    #[must_use]
    pub fn new(
        initial_text: Option<String>,
        default_fallback: impl Into<String>,
        fade: Duration,
        seed: u64,
    ) -> Self {
        let shown = initial_text.filter(|t| !t.is_empty());
        Self {
            verses: Vec::new(),
            queue: VecDeque::new(),
            rng: SeededRng::new(seed),
            default_fallback: default_fallback.into(),
            visible: true,
            shown,
            pending_swap: None,
            fade,
            interval: None,
            next_rotation: None,
            displays: 0,
        }
    }

    /// Replace the verse list (already filtered by [`parse_verses`]).
    pub fn set_verses(&mut self, verses: Vec<String>) {
        self.verses = verses;
    }

    #[must_use]
    pub fn verses(&self) -> &[String] {
        &self.verses
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Number of texts displayed so far.
    #[must_use]
    pub fn displays(&self) -> u64 {
        self.displays
    }

    /// Text used when the list is empty: the banner's current text, else the
    /// configured fallback.
    #[must_use]
    pub fn fallback(&self) -> &str {
        self.shown
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.default_fallback)
    }

    /// Refill the queue from the current list.
    pub fn refill(&mut self) {
        if self.verses.is_empty() {
            self.queue = VecDeque::from([self.fallback().to_string()]);
            return;
        }
        let mut copy = self.verses.clone();
        self.rng.shuffle(&mut copy);
        self.queue = copy.into();
    }

    /// Show the next queued text, fading it in.
    pub fn advance(&mut self, now: Duration) -> Advance {
        let Some(next) = self.queue.pop_front() else {
            return Advance::NeedsVerses;
        };
        self.visible = false;
        self.pending_swap = Some((next, now.saturating_add(self.fade)));
        self.displays += 1;
        if self.pending_swap.as_ref().is_some_and(|(_, at)| is_due(*at, now)) {
            self.complete_swap();
        }
        Advance::Shown
    }

    /// Install a freshly fetched list, refill, and advance.
    pub fn reload(&mut self, verses: Vec<String>, now: Duration) -> Advance {
        self.set_verses(verses);
        self.refill();
        self.advance(now)
    }

    /// Start (or restart) automatic rotation.
    pub fn start_rotation(&mut self, interval: Duration, now: Duration) {
        self.interval = Some(interval);
        self.next_rotation = Some(now.saturating_add(interval));
    }

    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Stop automatic rotation.
    pub fn stop_rotation(&mut self) {
        self.interval = None;
        self.next_rotation = None;
    }

    fn complete_swap(&mut self) {
        if let Some((text, _)) = self.pending_swap.take() {
            self.shown = Some(text);
            self.visible = true;
        }
    }

    /// Advance timers. Returns `Some(advance)` when a rotation fired.
    pub fn tick(&mut self, now: Duration) -> Option<Advance> {
        if self.pending_swap.as_ref().is_some_and(|(_, at)| is_due(*at, now)) {
            self.complete_swap();
        }
        let (Some(interval), Some(next)) = (self.interval, self.next_rotation) else {
            return None;
        };
        let (due, next) = catch_up(next, interval, now);
        if due == 0 {
            return None;
        }
        self.next_rotation = Some(next);
        Some(self.advance(now))
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        let swap = self.pending_swap.as_ref().map(|(_, at)| *at);
        match (swap, self.next_rotation) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    #[must_use]
    pub fn view(&self) -> BannerView {
        BannerView {
            text: self.shown.clone(),
            visible: self.visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    const FADE: Duration = Duration::from_millis(250);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn verses(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("verse {i}")).collect()
    }

    #[test]
    fn parse_accepts_array_and_map() {
        assert_eq!(
            parse_verses(r#"{"verses":["a"," ",3,"b"]}"#),
            vec!["a".to_string(), "b".to_string()]
        );
        let mut from_map = parse_verses(r#"{"verses":{"x":"c","y":"d","z":null}}"#);
        from_map.sort();
        assert_eq!(from_map, vec!["c".to_string(), "d".to_string()]);
        assert!(parse_verses(r#"{"verses":"e"}"#).is_empty());
        assert!(parse_verses("not json").is_empty());
    }

    #[test]
    fn empty_list_shows_single_fallback() {
        let mut banner = BannerRotator::new(None, "fallback", FADE, 7);
        assert_eq!(banner.reload(Vec::new(), Duration::ZERO), Advance::Shown);
        assert_eq!(banner.queue_len(), 0);
        banner.tick(FADE);
        assert_eq!(banner.view().text.as_deref(), Some("fallback"));
        assert_eq!(banner.advance(ms(300)), Advance::NeedsVerses);
    }

    #[test]
    fn fallback_prefers_existing_banner_text() {
        let mut banner = BannerRotator::new(Some("server verse".into()), "fallback", FADE, 7);
        banner.reload(Vec::new(), Duration::ZERO);
        banner.tick(FADE);
        assert_eq!(banner.view().text.as_deref(), Some("server verse"));
    }

    #[test]
    fn list_is_exhausted_before_reshuffle() {
        let list = verses(6);
        let mut banner = BannerRotator::new(None, "fallback", Duration::ZERO, 42);
        banner.set_verses(list.clone());
        banner.refill();
        let mut seen = BTreeSet::new();
        for _ in 0..list.len() {
            assert_eq!(banner.advance(Duration::ZERO), Advance::Shown);
            seen.insert(banner.view().text.unwrap());
        }
        assert_eq!(seen.len(), list.len());
        assert_eq!(banner.advance(Duration::ZERO), Advance::NeedsVerses);
    }

    #[test]
    fn fade_hides_then_swaps() {
        let mut banner = BannerRotator::new(Some("old".into()), "fallback", FADE, 1);
        banner.reload(vec!["new".into()], ms(1000));
        assert_eq!(
            banner.view(),
            BannerView {
                text: Some("old".into()),
                visible: false
            }
        );
        banner.tick(ms(1249));
        assert!(!banner.view().visible);
        banner.tick(ms(1250));
        assert_eq!(
            banner.view(),
            BannerView {
                text: Some("new".into()),
                visible: true
            }
        );
    }

    #[test]
    fn rotation_fires_on_interval() {
        let mut banner = BannerRotator::new(None, "fallback", Duration::ZERO, 3);
        banner.reload(verses(3), Duration::ZERO);
        banner.start_rotation(Duration::from_secs(10), Duration::ZERO);
        assert_eq!(banner.tick(ms(9_999)), None);
        assert_eq!(banner.tick(ms(10_000)), Some(Advance::Shown));
        assert_eq!(banner.tick(ms(10_001)), None);
        assert_eq!(banner.tick(ms(20_000)), Some(Advance::Shown));
        assert_eq!(banner.displays(), 3);
        assert_eq!(banner.tick(ms(30_000)), Some(Advance::NeedsVerses));
    }

    #[test]
    fn suspended_rotation_fires_once_and_realigns() {
        let mut banner = BannerRotator::new(None, "fallback", Duration::ZERO, 3);
        banner.reload(verses(3), Duration::ZERO);
        banner.start_rotation(Duration::from_secs(3), Duration::ZERO);
        let late = Duration::from_secs(8 * 3600) + ms(500);
        assert_eq!(banner.tick(late), Some(Advance::Shown));
        assert_eq!(banner.next_deadline(), Some(Duration::from_secs(8 * 3600 + 3)));
        assert_eq!(banner.tick(late), None);
    }

    #[test]
    fn shuffle_is_a_permutation_and_seeded() {
        let mut a = verses(20);
        let mut b = verses(20);
        SeededRng::new(9).shuffle(&mut a);
        SeededRng::new(9).shuffle(&mut b);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort();
        let mut expected = verses(20);
        expected.sort();
        assert_eq!(sorted, expected);
    }
}
