//! Property-based invariant tests for the controller core.
//!
//! Verifies:
//! 1. Any status outside 200..300 classifies as an error, whatever the headers
//! 2. `text/html` successes are pages carrying the body verbatim
//! 3. A quoted filename without `"`/`;` is always recovered from the disposition
//! 4. Hint index after any number of periods is `periods % len`
//! 5. The banner interval is never below the configured minimum
//! 6. A list of N verses is shown N times, each exactly once, before a refetch
//! 7. Only one submission is ever in flight

use core::time::Duration;
use std::collections::BTreeSet;

use audiobot_ui::{
    Advance, BannerRotator, ControllerConfig, HintCycle, HttpResponse, OverlayPresenter,
    ResponseKind, SubmissionController, classify, disposition_filename,
};
use proptest::prelude::*;

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_content_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("text/html".to_string()),
        Just("audio/wav".to_string()),
        Just("application/json".to_string()),
        Just("application/octet-stream".to_string()),
        "[a-z]{1,8}/[a-z]{1,8}",
    ]
}

fn arb_error_status() -> impl Strategy<Value = u16> {
    prop_oneof![100u16..200, 300u16..600]
}

// ── Properties ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn non_success_is_always_error(
        status in arb_error_status(),
        content_type in arb_content_type(),
        body in ".{0,64}",
    ) {
        let resp = HttpResponse::new(status)
            .header("Content-Type", content_type)
            .header("Content-Disposition", "attachment; filename=x.wav")
            .body(body.clone());
        prop_assert_eq!(classify(resp), ResponseKind::Error { status, text: body });
    }

    #[test]
    fn html_success_is_page_verbatim(status in 200u16..300, body in ".{0,128}") {
        let resp = HttpResponse::new(status)
            .header("content-type", "Text/HTML; charset=utf-8")
            .body(body.clone());
        prop_assert_eq!(classify(resp), ResponseKind::Page { html: body });
    }

    #[test]
    fn quoted_filename_is_recovered(name in "[A-Za-z0-9_. -]{1,32}") {
        let header = format!("attachment; filename=\"{name}\"");
        prop_assert_eq!(disposition_filename(&header), Some(name));
    }

    #[test]
    fn hint_index_wraps(fast in any::<bool>(), periods in 0u64..200) {
        let period = Duration::from_millis(2500);
        let mut cycle = HintCycle::start(fast, Duration::ZERO, period);
        cycle.poll(period * u32::try_from(periods).unwrap());
        prop_assert_eq!(cycle.index(), (periods as usize) % cycle.len());
    }

    #[test]
    fn interval_never_below_minimum(secs in proptest::num::f64::ANY) {
        let config = ControllerConfig::default();
        prop_assert!(config.verse_interval(Some(secs)) >= Duration::from_secs(3));
    }

    #[test]
    fn verses_exhausted_exactly_once_each(n in 1usize..40, seed in any::<u64>()) {
        let verses: Vec<String> = (0..n).map(|i| format!("v{i}")).collect();
        let mut banner = BannerRotator::new(None, "fallback", Duration::ZERO, seed);
        banner.set_verses(verses.clone());
        banner.refill();
        let mut seen = BTreeSet::new();
        for _ in 0..n {
            prop_assert_eq!(banner.advance(Duration::ZERO), Advance::Shown);
            seen.insert(banner.view().text.unwrap());
        }
        prop_assert_eq!(seen.len(), n);
        prop_assert_eq!(banner.advance(Duration::ZERO), Advance::NeedsVerses);
    }

    #[test]
    fn at_most_one_submission(forms in proptest::collection::vec(any::<bool>(), 1..10)) {
        let mut controller = SubmissionController::default();
        let mut overlay = OverlayPresenter::default();
        let mut accepted = 0;
        for (i, clean) in forms.iter().enumerate() {
            let form = if *clean { "clean-form" } else { "separate-form" };
            let now = Duration::from_millis(i as u64);
            if controller.begin(form, None, "/", false, now, &mut overlay).is_ok() {
                accepted += 1;
            }
        }
        prop_assert_eq!(accepted, 1);
    }
}
