#![forbid(unsafe_code)]

//! `audiobot-ui` is the controller core of the Audiobot web UI.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding page pushes [`Msg`]s and performs the
//!   returned [`Effect`]s (fetches, downloads, document swaps).
//! - **Deterministic time**: every timer is a deadline against a clock the
//!   host advances explicitly.
//! - **No DOM in the core**: form controls sit behind [`FormPage`], storage
//!   behind [`KeyValueStore`].
//!
//! # Key Components
//!
//! - [`SubmissionController`] - one-at-a-time asynchronous form submission
//! - [`OverlayPresenter`] - overlay, progress hints and toast
//! - [`BannerRotator`] - shuffled banner text with fade and interval
//! - [`SettingsStore`] - persisted form preferences
//! - [`Preset`] - fixed parameter presets
//! - [`App`] / [`StepProgram`] - message-driven model and its host runner
//!
//! `audiobot-web` wraps this crate with a `wasm-bindgen` API.

pub mod advice;
pub mod app;
pub mod banner;
pub mod clock;
pub mod config;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod overlay;
pub mod page;
pub mod preset;
pub mod program;
pub mod response;
pub mod settings;
pub mod submit;
pub mod summary;

pub use advice::{AdviceOutcome, AdviceResponse, handle_advice};
pub use app::{App, Effect, FetchResult, Msg};
pub use banner::{Advance, BannerRotator, BannerView, SeededRng, parse_verses};
pub use clock::DeterministicClock;
pub use config::{ControllerConfig, Pacing, UiConfig};
pub use error::{UiError, UiResult};
pub use overlay::{HintCycle, OverlayIcon, OverlayPresenter, OverlayState, OverlayView};
pub use page::{Field, FieldKind, FormPage, MemoryPage};
pub use preset::{Preset, apply_preset};
pub use program::{StepProgram, StepResult};
pub use response::{HttpResponse, ResponseKind, classify, disposition_filename};
pub use settings::{KeyValueStore, MemoryStore, Settings, SettingsStore, StorageError};
pub use submit::{Resolution, SubmissionController, SubmitError, SubmitRequest, Ticket};
pub use summary::{Counts, MarkupSummarizer, Summarizer, Summary};
