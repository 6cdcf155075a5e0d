#![forbid(unsafe_code)]

//! Deterministic monotonic clock controlled by the host.
//!
//! The core never reads a wall clock. Every timer in the controller (hint
//! rotation, pacing delays, toast expiry, banner fade and rotation) is a
//! deadline compared against this clock, so tests drive time explicitly and
//! `wasm32-unknown-unknown` never touches `std::time::Instant`.

use core::time::Duration;

/// Host-advanced monotonic clock.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Current monotonic time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Set current monotonic time. Moving backwards is ignored.
    pub fn set(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

/// Whether `deadline` has been reached at `now`.
#[inline]
#[must_use]
pub fn is_due(deadline: Duration, now: Duration) -> bool {
    now >= deadline
}

/// Catch a periodic schedule up to `now` in constant time.
///
/// Returns how many firings were due and the first deadline after `now`.
/// A deadline not yet reached, or a zero period, yields `(0, next_at)`.
#[must_use]
pub fn catch_up(next_at: Duration, period: Duration, now: Duration) -> (u64, Duration) {
    if period.is_zero() || !is_due(next_at, now) {
        return (0, next_at);
    }
    let behind = now.saturating_sub(next_at).as_nanos() / period.as_nanos();
    let due = u64::try_from(behind).unwrap_or(u64::MAX).saturating_add(1);
    let offset = period.as_nanos().saturating_mul(u128::from(due));
    (due, next_at.saturating_add(duration_from_nanos(offset)))
}

fn duration_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    match u64::try_from(nanos / NANOS_PER_SEC) {
        Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
        Err(_) => Duration::MAX,
    }
}
