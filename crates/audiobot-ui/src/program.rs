#![forbid(unsafe_code)]

//! Step-based program runner.
//!
//! [`StepProgram`] drives an [`App`] without threads, blocking or a wall
//! clock. The host (JavaScript, or a test) controls the loop:
//!
//! 1. Push messages via [`StepProgram::push`].
//! 2. Advance time via [`StepProgram::advance_time`] or [`StepProgram::set_time`].
//! 3. Call [`StepProgram::step`] to process queued messages and due timers.
//! 4. Drain effects via [`StepProgram::take_effects`] and perform them.
//!
//! # Example
//!
//! ```
//! use audiobot_ui::{App, ControllerConfig, MemoryPage, MemoryStore, Msg, StepProgram};
//! use core::time::Duration;
//!
//! let app = App::new(ControllerConfig::default(), MemoryPage::with_defaults(), MemoryStore::new());
//! let mut prog = StepProgram::new(app);
//! prog.init();
//!
//! prog.push(Msg::NextVerse);
//! prog.advance_time(Duration::from_millis(16));
//! let result = prog.step();
//! assert!(result.running);
//! let effects = prog.take_effects();
//! # let _ = effects;
//! ```

use core::time::Duration;
use std::collections::VecDeque;

use crate::app::{App, Effect, Msg};
use crate::clock::DeterministicClock;
use crate::page::FormPage;
use crate::settings::KeyValueStore;

/// Result of a single [`StepProgram::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Whether the program is still running (false once the document is
    /// being replaced or left).
    pub running: bool,
    /// Number of messages processed during this step.
    pub messages_processed: u32,
    /// Number of effects emitted during this step.
    pub effects_emitted: usize,
}

/// Host-driven, non-blocking runner for an [`App`].
///
/// # Lifecycle
///
/// 1. [`StepProgram::new`] — wrap the app.
/// 2. [`StepProgram::init`] — call once; restores settings and queues the
///    initial fetches.
/// 3. [`StepProgram::step`] — call after every message and timer wakeup.
pub struct StepProgram<P: FormPage, S: KeyValueStore> {
    app: App<P, S>,
    clock: DeterministicClock,
    queue: VecDeque<Msg>,
    outbox: Vec<Effect>,
    running: bool,
    initialized: bool,
}

impl<P: FormPage, S: KeyValueStore> StepProgram<P, S> {
    #[must_use]
    pub fn new(app: App<P, S>) -> Self {
        Self {
            app,
            clock: DeterministicClock::new(),
            queue: VecDeque::new(),
            outbox: Vec::new(),
            running: true,
            initialized: false,
        }
    }

    /// Initialize the app.
    ///
    /// Must be called exactly once before [`step`](Self::step).
    pub fn init(&mut self) {
        assert!(!self.initialized, "StepProgram::init() called twice");
        self.initialized = true;
        let effects = self.app.init(self.clock.now());
        tracing::debug!(effects = effects.len() as u64, "program initialized");
        self.execute(effects);
    }

    /// Process every queued message, then fire due timers.
    pub fn step(&mut self) -> StepResult {
        assert!(self.initialized, "StepProgram::step() called before init()");

        if !self.running {
            return StepResult {
                running: false,
                messages_processed: 0,
                effects_emitted: 0,
            };
        }

        let before = self.outbox.len();
        let now = self.clock.now();
        let mut messages_processed: u32 = 0;
        while let Some(msg) = self.queue.pop_front() {
            messages_processed += 1;
            let effects = self.app.update(msg, now);
            self.execute(effects);
            if !self.running {
                break;
            }
        }

        if self.running {
            let effects = self.app.tick(now);
            self.execute(effects);
        }

        StepResult {
            running: self.running,
            messages_processed,
            effects_emitted: self.outbox.len().saturating_sub(before),
        }
    }

    /// Queue a message for the next [`step`](Self::step).
    pub fn push(&mut self, msg: Msg) {
        self.queue.push_back(msg);
    }

    /// Advance the deterministic clock by `dt`.
    pub fn advance_time(&mut self, dt: Duration) {
        self.clock.advance(dt);
    }

    /// Set the deterministic clock to an absolute time.
    pub fn set_time(&mut self, now: Duration) {
        self.clock.set(now);
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Take the pending effects, leaving the outbox empty.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.outbox)
    }

    /// Pending effects without consuming them.
    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.outbox
    }

    /// Earliest timer deadline, for hosts that schedule precise wakeups.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        if !self.running {
            return None;
        }
        self.app.next_deadline()
    }

    /// Stop processing; queued messages are dropped and the app's recurring
    /// timers are cancelled.
    pub fn stop(&mut self) {
        self.running = false;
        self.queue.clear();
        self.app.shutdown();
    }

    #[must_use]
    pub fn app(&self) -> &App<P, S> {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App<P, S> {
        &mut self.app
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            if effect.leaves_page() {
                self.running = false;
            }
            self.outbox.push(effect);
        }
    }
}
