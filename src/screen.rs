//! The recital screen: page loading, verse selection and playback sequencing
//! wired together on a single event loop.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{Local, Timelike};
use eyre::Result;

use crate::audio::AudioBackend;
use crate::gesture::{TapDetector, swipe_page_delta};
use crate::host::{BrightnessControl, NavigationHost, Route};
use crate::logging;
use crate::models::{LAST_PAGE, PlaybackStatus, Reciter, Verse, VerseKey};
use crate::page::VersePage;
use crate::panel::{PanelState, PanelTransition};
use crate::playback::{Advance, PlaybackController};
use crate::preferences::{AzkarIcon, PreferenceBus, Preferences, Subscription};
use crate::provider::ContentProvider;
use crate::reciters::ReciterRegistry;
use crate::settings::Settings;

/// Language hint handed to screens opened on top of the recital.
pub const SCREEN_LANG: &str = "ar";

enum FetchResult {
    Page {
        generation: u64,
        number: u32,
        autoplay: bool,
        result: Result<Vec<Verse>>,
    },
    Reciters(Result<Vec<Reciter>>),
}

/// Progress of the current clip for the control panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Fraction of the clip played, `0..=1`.
    Fraction(f64),
    /// Seconds played; the clip length is unknown.
    Elapsed(f64),
    None,
}

pub struct RecitalScreen {
    provider: Arc<dyn ContentProvider>,
    controller: PlaybackController,
    registry: ReciterRegistry,
    default_reciter: String,
    page: Option<VersePage>,
    page_number: u32,
    target_page: u32,
    page_generation: u64,
    /// The page request in flight will start playback when it lands.
    autoplay_in_flight: bool,
    panel: PanelState,
    taps: TapDetector,
    brightness: Box<dyn BrightnessControl>,
    brightness_level: u32,
    show_brightness_panel: bool,
    navigation: Box<dyn NavigationHost>,
    preferences: Preferences,
    subscription: Option<Subscription>,
    seek_step_secs: f64,
    fetch_tx: Sender<FetchResult>,
    fetch_rx: Receiver<FetchResult>,
    pending: usize,
    alive: bool,
    last_error: Option<String>,
}

impl RecitalScreen {
    pub fn new(
        settings: &Settings,
        provider: Arc<dyn ContentProvider>,
        backend: Box<dyn AudioBackend>,
        brightness: Box<dyn BrightnessControl>,
        navigation: Box<dyn NavigationHost>,
    ) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::channel();
        let initial_page = settings.initial_page.clamp(1, LAST_PAGE);
        Self {
            provider,
            controller: PlaybackController::new(backend),
            registry: ReciterRegistry::default(),
            default_reciter: settings.default_reciter.clone(),
            page: None,
            page_number: initial_page,
            target_page: initial_page,
            autoplay_in_flight: false,
            page_generation: 0,
            panel: PanelState::default(),
            taps: TapDetector::new(Duration::from_millis(settings.double_tap_window_ms)),
            brightness,
            brightness_level: 0,
            show_brightness_panel: false,
            navigation,
            preferences: Preferences::from_settings(settings),
            subscription: None,
            seek_step_secs: settings.seek_step_secs,
            fetch_tx,
            fetch_rx,
            pending: 0,
            alive: false,
            last_error: None,
        }
    }

    /// Subscribe to preference changes, read the brightness and start loading
    /// the reciter list and the initial page.
    pub fn enter(&mut self, bus: &PreferenceBus) {
        self.alive = true;
        self.subscription = Some(bus.subscribe());
        match self.brightness.brightness() {
            Ok(fraction) => self.brightness_level = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32,
            Err(err) => logging::warn(format!("could not read brightness: {err:#}")),
        }
        self.request_reciters();
        self.request_page(self.page_number, false);
    }

    /// Stop audio, drop the preference subscription and ignore anything
    /// still in flight.
    pub fn leave(&mut self) {
        if !self.alive {
            return;
        }
        logging::info("leaving recital screen");
        self.alive = false;
        self.subscription = None;
        self.controller.release();
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    fn request_reciters(&mut self) {
        let provider = Arc::clone(&self.provider);
        let tx = self.fetch_tx.clone();
        self.pending += 1;
        thread::spawn(move || {
            let _ = tx.send(FetchResult::Reciters(provider.fetch_reciters()));
        });
    }

    /// Load page `number` in the background. Only the latest request is applied.
    pub fn request_page(&mut self, number: u32, autoplay: bool) {
        self.page_generation += 1;
        self.target_page = number;
        self.autoplay_in_flight = autoplay;
        let generation = self.page_generation;
        let provider = Arc::clone(&self.provider);
        let tx = self.fetch_tx.clone();
        self.pending += 1;
        logging::debug(format!("requesting page {number} (generation {generation})"));
        thread::spawn(move || {
            let result = provider.fetch_page(number);
            let _ = tx.send(FetchResult::Page {
                generation,
                number,
                autoplay,
                result,
            });
        });
    }

    /// Apply finished fetches, audio completions and preference changes.
    pub fn pump(&mut self) {
        while let Ok(result) = self.fetch_rx.try_recv() {
            self.apply_fetch(result);
        }
        self.pump_events();
    }

    /// Block until no fetch is outstanding or `timeout` passes, then pump.
    /// Returns whether everything settled.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.fetch_rx.recv_timeout(remaining) {
                Ok(result) => self.apply_fetch(result),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.pump();
        self.pending == 0
    }

    pub fn pending_fetches(&self) -> usize {
        self.pending
    }

    fn pump_events(&mut self) {
        if let Some(subscription) = &self.subscription {
            for changes in subscription.drain() {
                logging::debug(format!("preference change: {}", serde_json::Value::Object(changes.clone())));
                self.preferences.apply(&changes);
            }
        }
        for event in self.controller.poll_events() {
            if !self.alive {
                continue;
            }
            if self.controller.handle_event(event, self.page.as_mut()) == Advance::EndOfPage {
                self.end_of_page();
            }
        }
    }

    fn apply_fetch(&mut self, result: FetchResult) {
        self.pending = self.pending.saturating_sub(1);
        if !self.alive {
            logging::debug("screen left, dropping fetch result");
            return;
        }
        match result {
            FetchResult::Reciters(Ok(fetched)) => {
                self.registry = ReciterRegistry::from_fetched(fetched);
                logging::info(format!("{} reciters available", self.registry.len()));
                self.controller
                    .resume_deferred(&self.registry, &self.default_reciter, self.page.as_ref());
            }
            FetchResult::Reciters(Err(err)) => {
                logging::warn(format!("error getting reciters: {err:#}"));
                self.last_error = Some(format!("could not load reciters: {err}"));
            }
            FetchResult::Page {
                generation,
                number,
                autoplay,
                result,
            } => {
                if generation != self.page_generation {
                    logging::debug(format!("dropping stale page {number}"));
                    return;
                }
                self.autoplay_in_flight = false;
                match result {
                    Ok(verses) => self.install_page(VersePage::new(number, verses), autoplay),
                    Err(err) => {
                        logging::warn(format!("error getting page {number}: {err:#}"));
                        self.target_page = self.page_number;
                        self.last_error = Some(format!("could not load page {number}: {err}"));
                    }
                }
            }
        }
    }

    fn install_page(&mut self, page: VersePage, autoplay: bool) {
        logging::info(format!("page {} loaded with {} verses", page.number(), page.len()));
        self.page_number = page.number();
        let first = page.first().map(|v| v.key);
        self.page = Some(page);

        let reciter = self.controller.reciter().cloned();
        match (autoplay, reciter, first) {
            (true, Some(reciter), Some(first)) => {
                self.controller.play(&reciter, first);
            }
            _ => {
                if !self.controller.is_playing() {
                    self.controller.set_verse(first);
                }
                self.controller
                    .resume_deferred(&self.registry, &self.default_reciter, self.page.as_ref());
            }
        }
    }

    fn end_of_page(&mut self) {
        if self.target_page != self.page_number {
            logging::debug(format!("page {} already on its way", self.target_page));
            return;
        }
        if self.page_number < LAST_PAGE {
            self.change_page_with(1, true);
        } else {
            logging::info("reached the end of the last page");
            self.controller.finish();
        }
    }

    /// Move `delta` pages. Returns false when the target is out of range.
    pub fn change_page(&mut self, delta: i32) -> bool {
        self.change_page_with(delta, false)
    }

    fn change_page_with(&mut self, delta: i32, after_completion: bool) -> bool {
        let target = i64::from(self.target_page) + i64::from(delta);
        if delta == 0 || target < 1 || target > i64::from(LAST_PAGE) {
            logging::debug(format!("ignoring page change to {target}"));
            return false;
        }
        let was_playing = self.controller.is_playing()
            || (self.target_page != self.page_number && self.autoplay_in_flight);
        let autoplay = delta > 0 && (after_completion || was_playing);
        // The old page's clip must not run on while the new page loads.
        self.controller.pause_for_navigation();
        // in range, checked above
        self.request_page(target as u32, autoplay);
        true
    }

    pub fn on_swipe(&mut self, direction: u32) -> bool {
        match swipe_page_delta(direction) {
            Some(delta) => self.change_page(delta),
            None => false,
        }
    }

    /// A tap on the page text; the second tap inside the window toggles the
    /// control panel and closes the brightness panel.
    pub fn on_tap(&mut self, now: Instant) -> Option<PanelTransition> {
        if !self.taps.tap(now) {
            return None;
        }
        self.show_brightness_panel = false;
        Some(self.panel.toggle())
    }

    /// Select `key` and play it. Selecting the already selected verse does nothing.
    pub fn select_verse(&mut self, key: VerseKey) -> bool {
        let Some(page) = self.page.as_mut() else {
            return false;
        };
        if !page.select(key) {
            return false;
        }
        self.panel.transition_to(PanelState::Active);
        let reciter = self
            .controller
            .reciter()
            .cloned()
            .or_else(|| self.registry.resolve_default(&self.default_reciter).cloned());
        match reciter {
            Some(reciter) => {
                self.controller.play(&reciter, key);
            }
            None => self.controller.set_verse(Some(key)),
        }
        true
    }

    /// Step the selection to the next or previous verse on the page.
    pub fn step_verse(&mut self, forward: bool) -> bool {
        let Some(page) = self.page.as_ref() else {
            return false;
        };
        let Some(current) = page.selected().map(|v| v.key) else {
            return false;
        };
        let target = if forward {
            page.next_after(current)
        } else {
            page.previous_before(current)
        };
        match target.map(|v| v.key) {
            Some(key) => self.select_verse(key),
            None => false,
        }
    }

    pub fn select_reciter(&mut self, name: &str) -> bool {
        let Some(reciter) = self.registry.by_name(name).cloned() else {
            logging::warn(format!("unknown reciter `{name}`"));
            return false;
        };
        self.controller.change_reciter(reciter, self.page.as_ref())
    }

    pub fn toggle_playback(&mut self) -> bool {
        self.controller
            .toggle(&self.registry, &self.default_reciter, self.page.as_ref())
    }

    /// Seek one step forward (`1`) or back (`-1`).
    pub fn seek(&mut self, direction: i32) {
        self.controller.seek_relative(direction, self.seek_step_secs);
    }

    pub fn progress(&self) -> Progress {
        if let Some(fraction) = self.controller.progress_fraction() {
            return Progress::Fraction(fraction);
        }
        match self.controller.elapsed_secs() {
            Some(secs) => Progress::Elapsed(secs),
            None => Progress::None,
        }
    }

    pub fn toggle_brightness_panel(&mut self) -> bool {
        self.show_brightness_panel = !self.show_brightness_panel;
        self.show_brightness_panel
    }

    /// Set the brightness to `step / 10`; steps above 10 are clamped.
    pub fn change_brightness(&mut self, step: u32) -> Result<()> {
        let step = step.min(10);
        self.brightness.set_brightness(f64::from(step) / 10.0)?;
        self.brightness_level = step * 10;
        Ok(())
    }

    pub fn go_home(&mut self) {
        self.navigation.set_root(Route::Home);
    }

    pub fn open(&mut self, route: Route) {
        self.navigation.push(route, SCREEN_LANG);
    }

    pub fn azkar_icon(&self) -> Option<AzkarIcon> {
        self.preferences
            .show_azkar_icon
            .then(|| AzkarIcon::for_hour(Local::now().hour()))
    }

    pub fn page(&self) -> Option<&VersePage> {
        self.page.as_ref()
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn registry(&self) -> &ReciterRegistry {
        &self.registry
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn status(&self) -> &PlaybackStatus {
        self.controller.status()
    }

    pub fn panel(&self) -> PanelState {
        self.panel
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn brightness_level(&self) -> u32 {
        self.brightness_level
    }

    pub fn show_brightness_panel(&self) -> bool {
        self.show_brightness_panel
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

impl Drop for RecitalScreen {
    fn drop(&mut self) {
        self.leave();
    }
}
