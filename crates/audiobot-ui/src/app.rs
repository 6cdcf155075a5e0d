#![forbid(unsafe_code)]

//! Application model: messages in, effects out.
//!
//! [`App`] owns every piece of controller state (overlay, submission
//! controller, banner, settings store, the page's form controls) and reacts
//! to [`Msg`]s pushed by the host. Anything that must touch the outside world
//! is returned as an [`Effect`]; the host performs it and reports back with
//! another [`Msg`].
//!
//! ```text
//!   host ──Msg──► App::update ──Vec<Effect>──► host
//!   host ──now──► App::tick   ──Vec<Effect>──► host
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Handling |
//! |---|---|
//! | Submission while another is in flight | Refused, logged at warn |
//! | Submission from an unknown form | Ignored, logged at warn |
//! | Verses / ui-config fetch fails | Empty list / default interval |
//! | Advice clicked during a submission | Refused, logged at warn |
//! | Settings write fails | Logged at warn, page unaffected |

use core::time::Duration;

use crate::advice::handle_advice;
use crate::banner::{Advance, BannerRotator, BannerView, parse_verses};
use crate::config::{ControllerConfig, UiConfig};
use crate::error::{UiError, UiResult};
use crate::overlay::{OverlayPresenter, OverlayView};
use crate::page::{Field, FormPage};
use crate::preset::Preset;
use crate::response::HttpResponse;
use crate::settings::{KeyValueStore, SettingsStore};
use crate::submit::{Resolution, SubmissionController, SubmitError, SubmitRequest, Ticket};

/// Fetch outcome reported by the host: the body text, or why there is none.
pub type FetchResult = Result<String, UiError>;

/// Input to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// An intercepted form was submitted.
    Submit {
        form: String,
        /// The form's `action` attribute, if any.
        action: Option<String>,
        /// `location.pathname` at submit time.
        current_path: String,
    },
    /// The submission request completed with a buffered response.
    Response {
        ticket: Ticket,
        response: HttpResponse,
    },
    /// The submission request failed before a response could be read.
    TransportFailed { ticket: Ticket, reason: UiError },
    /// A tracked control changed.
    FieldChanged(Field),
    /// The preset selector changed.
    PresetSelected(String),
    AdviceClicked,
    AdviceLoaded(FetchResult),
    VersesLoaded(FetchResult),
    UiConfigLoaded(FetchResult),
    /// Show the next banner text now.
    NextVerse,
    /// Re-fetch the verse list, then show the next text.
    ReloadVerses,
    /// The overlay close button was clicked.
    CloseOverlay,
}

/// Work for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// POST the form's data to `request.action`; answer with
    /// [`Msg::Response`] or [`Msg::TransportFailed`].
    Fetch(SubmitRequest),
    /// GET the verse list; answer with [`Msg::VersesLoaded`].
    FetchVerses { url: String },
    /// GET the ui config; answer with [`Msg::UiConfigLoaded`].
    FetchUiConfig { url: String },
    /// POST the first selected upload and `context`; answer with
    /// [`Msg::AdviceLoaded`].
    RequestAdvice { url: String, context: String },
    /// Replace the whole document.
    ReplacePage(String),
    /// Offer bytes as a download, revoking the object URL after `revoke_after`.
    Download {
        bytes: Vec<u8>,
        filename: String,
        revoke_after: Duration,
    },
    /// Navigate to a URL.
    Navigate(String),
    /// Show a blocking message to the user.
    Alert(String),
    /// Set the settings-panel interval label.
    SetVerseIntervalLabel(String),
}

impl Effect {
    /// Whether performing this effect ends the current document.
    #[must_use]
    pub fn leaves_page(&self) -> bool {
        matches!(self, Effect::ReplacePage(_) | Effect::Navigate(_))
    }
}

/// The controller.
pub struct App<P: FormPage, S: KeyValueStore> {
    config: ControllerConfig,
    page: P,
    settings: SettingsStore<S>,
    overlay: OverlayPresenter,
    submit: SubmissionController,
    banner: Option<BannerRotator>,
    ui_config: Option<UiConfig>,
    verses_in_flight: bool,
    advice_in_flight: bool,
}

impl<P: FormPage, S: KeyValueStore> App<P, S> {
    pub fn new(config: ControllerConfig, page: P, store: S) -> Self {
        let overlay = OverlayPresenter::new(config.hint_period(), config.toast_duration());
        let submit = SubmissionController::new(
            config.pacing(),
            config.error_preview_chars,
            config.history_url.clone(),
        );
        let banner = BannerRotator::new(None, config.fallback_verse.clone(), config.verse_fade(), 0);
        let settings = SettingsStore::with_key(store, config.settings_key.clone());
        Self {
            config,
            page,
            settings,
            overlay,
            submit,
            banner: Some(banner),
            ui_config: None,
            verses_in_flight: false,
            advice_in_flight: false,
        }
    }

    /// Seed the banner with the text the page already shows and the shuffle seed.
    #[must_use]
    pub fn with_banner(mut self, initial_text: Option<String>, seed: u64) -> Self {
        self.banner = Some(BannerRotator::new(
            initial_text,
            self.config.fallback_verse.clone(),
            self.config.verse_fade(),
            seed,
        ));
        self
    }

    /// Page has no banner: no verses are fetched or rotated.
    #[must_use]
    pub fn without_banner(mut self) -> Self {
        self.banner = None;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    #[must_use]
    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsStore<S> {
        &self.settings
    }

    #[must_use]
    pub fn overlay(&self) -> &OverlayPresenter {
        &self.overlay
    }

    #[must_use]
    pub fn submission(&self) -> &SubmissionController {
        &self.submit
    }

    #[must_use]
    pub fn banner(&self) -> Option<&BannerRotator> {
        self.banner.as_ref()
    }

    #[must_use]
    pub fn ui_config(&self) -> Option<UiConfig> {
        self.ui_config
    }

    #[must_use]
    pub fn overlay_view(&self) -> OverlayView {
        self.overlay.view()
    }

    #[must_use]
    pub fn banner_view(&self) -> Option<BannerView> {
        self.banner.as_ref().map(BannerRotator::view)
    }

    /// Restore settings and request the remote data the page needs.
    pub fn init(&mut self, _now: Duration) -> Vec<Effect> {
        self.settings.load(&mut self.page);
        let mut effects = Vec::new();
        if self.banner.is_some() {
            effects.extend(self.request_verses());
        }
        effects.push(Effect::FetchUiConfig {
            url: self.config.ui_config_url.clone(),
        });
        effects
    }

    pub fn update(&mut self, msg: Msg, now: Duration) -> Vec<Effect> {
        match msg {
            Msg::Submit {
                form,
                action,
                current_path,
            } => match self.submit_form(&form, action.as_deref(), &current_path, now) {
                Ok(effects) => effects,
                Err(e) => {
                    tracing::warn!(form = %form, error = %e, "submission refused");
                    Vec::new()
                }
            },
            Msg::Response { ticket, response } => {
                match self.submit.on_response(ticket, response, now, &mut self.overlay) {
                    Some(resolution) => self.realize(resolution),
                    None => Vec::new(),
                }
            }
            Msg::TransportFailed { ticket, reason } => {
                self.submit
                    .on_transport_error(ticket, &reason, now, &mut self.overlay);
                Vec::new()
            }
            Msg::FieldChanged(field) => {
                if let Err(e) = self.settings.save(&self.page) {
                    tracing::warn!(field = field.name(), error = %e, "settings not saved");
                }
                Vec::new()
            }
            Msg::PresetSelected(name) => {
                match Preset::from_name(&name) {
                    Some(preset) => {
                        let applied = preset.apply(&mut self.page);
                        tracing::debug!(preset = preset.name(), applied, "preset applied");
                    }
                    None => tracing::debug!(preset = %name, "ignoring unknown preset"),
                }
                Vec::new()
            }
            Msg::AdviceClicked => self.request_advice(),
            Msg::AdviceLoaded(result) => {
                self.advice_in_flight = false;
                let outcome = handle_advice(&mut self.page, result.as_deref());
                if !self.submit.is_busy() {
                    self.overlay.hide();
                }
                vec![Effect::Alert(outcome.alert_text().to_string())]
            }
            Msg::VersesLoaded(result) => {
                self.verses_in_flight = false;
                let verses = match result {
                    Ok(body) => parse_verses(&body),
                    Err(reason) => {
                        tracing::warn!(reason = %reason, "verses unavailable");
                        Vec::new()
                    }
                };
                match self.banner.as_mut().map(|b| b.reload(verses, now)) {
                    Some(Advance::NeedsVerses) => self.request_verses(),
                    _ => Vec::new(),
                }
            }
            Msg::UiConfigLoaded(result) => {
                let ui = match result {
                    Ok(body) => UiConfig::parse(&body),
                    Err(reason) => {
                        tracing::warn!(reason = %reason, "ui config unavailable");
                        UiConfig::default()
                    }
                };
                self.ui_config = Some(ui);
                let interval = self.config.verse_interval(ui.verse_interval_sec);
                if let Some(banner) = self.banner.as_mut() {
                    banner.start_rotation(interval, now);
                    tracing::debug!(interval_ms = interval.as_millis() as u64, "banner rotation started");
                }
                ui.interval_label()
                    .map(Effect::SetVerseIntervalLabel)
                    .into_iter()
                    .collect()
            }
            Msg::NextVerse => match self.banner.as_mut().map(|b| b.advance(now)) {
                Some(Advance::NeedsVerses) => self.request_verses(),
                _ => Vec::new(),
            },
            Msg::ReloadVerses => {
                if self.banner.is_none() {
                    return Vec::new();
                }
                self.request_verses()
            }
            Msg::CloseOverlay => {
                self.overlay.hide();
                Vec::new()
            }
        }
    }

    /// Advance every timer to `now`.
    pub fn tick(&mut self, now: Duration) -> Vec<Effect> {
        self.overlay.tick(now);
        let mut effects = match self.submit.tick(now, &mut self.overlay) {
            Some(resolution) => self.realize(resolution),
            None => Vec::new(),
        };
        if let Some(Advance::NeedsVerses) = self.banner.as_mut().and_then(|b| b.tick(now)) {
            effects.extend(self.request_verses());
        }
        effects
    }

    /// Cancel every recurring timer: banner rotation and the hint cycle.
    pub fn shutdown(&mut self) {
        self.overlay.stop_hints();
        if let Some(banner) = self.banner.as_mut() {
            banner.stop_rotation();
        }
        tracing::debug!("controller shut down");
    }

    /// Earliest time at which [`tick`](Self::tick) has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        [
            self.overlay.next_deadline(),
            self.submit.next_deadline(),
            self.banner.as_ref().and_then(BannerRotator::next_deadline),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn submit_form(
        &mut self,
        form: &str,
        action: Option<&str>,
        current_path: &str,
        now: Duration,
    ) -> UiResult<Vec<Effect>> {
        if !self.config.intercepts(form) {
            return Err(SubmitError::UnknownForm(form.to_string()).into());
        }
        let fast = self.page.checked(Field::FastMode).unwrap_or(false);
        let request = self
            .submit
            .begin(form, action, current_path, fast, now, &mut self.overlay)?;
        Ok(vec![Effect::Fetch(request)])
    }

    fn request_advice(&mut self) -> Vec<Effect> {
        if self.submit.is_busy() {
            tracing::warn!("advice refused while a submission is in flight");
            return Vec::new();
        }
        if self.advice_in_flight {
            tracing::debug!("advice already requested");
            return Vec::new();
        }
        self.advice_in_flight = true;
        self.overlay.show();
        let context = self
            .page
            .value(Field::Context)
            .unwrap_or_else(|| self.config.default_context.clone());
        vec![Effect::RequestAdvice {
            url: self.config.advice_url.clone(),
            context,
        }]
    }

    fn request_verses(&mut self) -> Vec<Effect> {
        if self.verses_in_flight {
            return Vec::new();
        }
        self.verses_in_flight = true;
        vec![Effect::FetchVerses {
            url: self.config.verses_url.clone(),
        }]
    }

    fn realize(&self, resolution: Resolution) -> Vec<Effect> {
        match resolution {
            Resolution::ReplacePage(html) => vec![Effect::ReplacePage(html)],
            Resolution::Download { bytes, filename } => vec![Effect::Download {
                bytes,
                filename,
                revoke_after: self.config.revoke_after(),
            }],
            Resolution::Navigate(url) => vec![Effect::Navigate(url)],
            Resolution::Inline => Vec::new(),
        }
    }
}
