use std::sync::mpsc::{self, Receiver, Sender};

use eyre::{Result, eyre};

use crate::audio::{AudioBackend, AudioEvent, AudioResource};
use crate::logging;
use crate::models::{PlaybackStatus, Reciter, VerseKey};
use crate::page::VersePage;
use crate::reciters::ReciterRegistry;

/// Default step for relative seeks, in seconds.
pub const SEEK_STEP_SECS: f64 = 10.0;

/// Audio location of a verse: `base` followed by the six digit, zero padded
/// `surah * 1000 + ayah` and `.mp3`.
///
/// Wider numbers are written in full, never truncated.
pub fn stream_url(base: &str, key: VerseKey) -> String {
    format!("{base}{:06}.mp3", key.audio_number())
}

/// Outcome of reacting to the end of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The following verse was selected and started.
    Next(VerseKey),
    /// The page has no verse after the current one.
    EndOfPage,
    /// Nothing to continue with (no reciter yet).
    Stopped,
    /// The event did not belong to the current clip.
    Ignored,
}

/// Mutable playback state owned by the controller.
#[derive(Default)]
pub struct PlaybackSession {
    pub reciter: Option<Reciter>,
    pub verse: Option<VerseKey>,
    pub is_playing: bool,
    pub status: PlaybackStatus,
    source_url: Option<String>,
    /// The loaded clip ended or failed; resuming must start it again.
    clip_done: bool,
    resource: Option<Box<dyn AudioResource>>,
}

impl PlaybackSession {
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn has_resource(&self) -> bool {
        self.resource.is_some()
    }
}

/// Owns the single audio resource of a screen and sequences verse clips.
///
/// The resource is created on the first play and re-pointed afterwards; clip
/// completion arrives on an internal channel drained with [`Self::poll_events`].
pub struct PlaybackController {
    backend: Box<dyn AudioBackend>,
    session: PlaybackSession,
    events_tx: Sender<AudioEvent>,
    events_rx: Receiver<AudioEvent>,
    resources_created: usize,
}

impl PlaybackController {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            backend,
            session: PlaybackSession::default(),
            events_tx,
            events_rx,
            resources_created: 0,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn reciter(&self) -> Option<&Reciter> {
        self.session.reciter.as_ref()
    }

    pub fn current_verse(&self) -> Option<VerseKey> {
        self.session.verse
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing
    }

    pub fn status(&self) -> &PlaybackStatus {
        &self.session.status
    }

    /// Number of audio resources this controller has ever created.
    pub fn resources_created(&self) -> usize {
        self.resources_created
    }

    /// Point the session at a verse without starting playback.
    pub fn set_verse(&mut self, verse: Option<VerseKey>) {
        self.session.verse = verse;
    }

    pub fn play(&mut self, reciter: &Reciter, verse: VerseKey) -> bool {
        let url = stream_url(&reciter.stream_base_url, verse);
        logging::info(format!("audio url {url}"));
        if self.session.reciter.as_ref() != Some(reciter) {
            self.session.reciter = Some(reciter.clone());
        }
        self.session.verse = Some(verse);
        self.session.source_url = Some(url.clone());
        self.session.clip_done = false;

        match self.start(&url) {
            Ok(()) => {
                self.session.is_playing = true;
                self.session.status = PlaybackStatus::Playing;
                true
            }
            Err(err) => {
                logging::warn(format!("playback of {url} failed: {err:#}"));
                self.session.is_playing = false;
                self.session.status = PlaybackStatus::Failed(err.to_string());
                false
            }
        }
    }

    fn start(&mut self, url: &str) -> Result<()> {
        if let Some(resource) = self.session.resource.as_mut() {
            resource.set_source(url)?;
        } else {
            let resource = self.backend.create(url, self.events_tx.clone())?;
            self.resources_created += 1;
            self.session.resource = Some(resource);
        }
        self.session
            .resource
            .as_mut()
            .ok_or_else(|| eyre!("audio resource missing after creation"))?
            .play()
    }

    /// Switch reciter and restart the selected verse with it.
    pub fn change_reciter(&mut self, reciter: Reciter, page: Option<&VersePage>) -> bool {
        logging::info(format!("selected reciter: {}", reciter.name));
        let verse = page
            .and_then(|p| p.selected())
            .map(|v| v.key)
            .or(self.session.verse);
        self.session.reciter = Some(reciter.clone());
        match verse {
            Some(verse) => self.play(&reciter, verse),
            None => false,
        }
    }

    /// Continue with the verse after the current one.
    pub fn advance(&mut self, page: &mut VersePage) -> Advance {
        let Some(reciter) = self.session.reciter.clone() else {
            self.session.is_playing = false;
            return Advance::Stopped;
        };
        let next = match self.session.verse {
            Some(current) if page.get(current).is_some() => page.next_after(current).map(|v| v.key),
            _ => page.first().map(|v| v.key),
        };
        match next {
            Some(key) => {
                page.select(key);
                self.play(&reciter, key);
                Advance::Next(key)
            }
            None => {
                self.session.is_playing = false;
                self.session.status = PlaybackStatus::Paused;
                Advance::EndOfPage
            }
        }
    }

    pub fn poll_events(&mut self) -> Vec<AudioEvent> {
        self.events_rx.try_iter().collect()
    }

    pub fn handle_event(&mut self, event: AudioEvent, page: Option<&mut VersePage>) -> Advance {
        if !self.session.is_playing || self.session.source_url.as_deref() != Some(event.source()) {
            logging::debug(format!("ignoring audio event for {}", event.source()));
            return Advance::Ignored;
        }
        self.session.clip_done = true;
        match event {
            AudioEvent::Ended { .. } => {
                logging::debug("audio ended");
                match page {
                    Some(page) => self.advance(page),
                    None => Advance::Stopped,
                }
            }
            AudioEvent::Failed { source, reason } => {
                logging::warn(format!("playback of {source} failed: {reason}"));
                self.session.is_playing = false;
                self.session.status = PlaybackStatus::Failed(reason);
                Advance::Stopped
            }
        }
    }

    /// Play/pause switch. Resolves the default reciter first when none is chosen.
    ///
    /// Returns whether audio is playing afterwards.
    pub fn toggle(
        &mut self,
        registry: &ReciterRegistry,
        default_name: &str,
        page: Option<&VersePage>,
    ) -> bool {
        if self.session.reciter.is_none() {
            match registry.resolve_default(default_name) {
                Some(reciter) => self.session.reciter = Some(reciter.clone()),
                None => {
                    logging::info(format!(
                        "reciter `{default_name}` not available yet, deferring playback"
                    ));
                    self.session.status = PlaybackStatus::Deferred;
                    return false;
                }
            }
        }

        if self.session.is_playing && self.session.has_resource() {
            self.pause();
            return false;
        }

        let verse = page
            .and_then(|p| p.selected())
            .map(|v| v.key)
            .or(self.session.verse);
        let (Some(verse), Some(reciter)) = (verse, self.session.reciter.clone()) else {
            self.session.status = PlaybackStatus::Deferred;
            return false;
        };
        if self.is_loaded(&reciter, verse) {
            self.resume()
        } else {
            self.play(&reciter, verse)
        }
    }

    /// The resource holds a paused, unfinished clip of `verse` by `reciter`.
    fn is_loaded(&self, reciter: &Reciter, verse: VerseKey) -> bool {
        self.session.has_resource()
            && !self.session.clip_done
            && self.session.source_url.as_deref()
                == Some(stream_url(&reciter.stream_base_url, verse).as_str())
    }

    /// Start a play that was requested before reciters or the page were available.
    pub fn resume_deferred(
        &mut self,
        registry: &ReciterRegistry,
        default_name: &str,
        page: Option<&VersePage>,
    ) -> bool {
        if self.session.status != PlaybackStatus::Deferred {
            return false;
        }
        self.toggle(registry, default_name, page)
    }

    fn resume(&mut self) -> bool {
        let Some(resource) = self.session.resource.as_mut() else {
            return false;
        };
        match resource.play() {
            Ok(()) => {
                self.session.is_playing = true;
                self.session.status = PlaybackStatus::Playing;
                true
            }
            Err(err) => {
                logging::warn(format!("resume failed: {err:#}"));
                self.session.is_playing = false;
                self.session.status = PlaybackStatus::Failed(err.to_string());
                false
            }
        }
    }

    pub fn pause(&mut self) {
        if let Some(resource) = self.session.resource.as_mut() {
            if let Err(err) = resource.pause() {
                logging::warn(format!("pause failed: {err:#}"));
            }
            if self.session.is_playing {
                self.session.status = PlaybackStatus::Paused;
            }
        }
        self.session.is_playing = false;
    }

    /// Pause for a manual page change; the resource stays loaded.
    pub fn pause_for_navigation(&mut self) {
        if self.session.is_playing {
            logging::debug("pausing for page change");
            self.pause();
        }
    }

    pub fn seek_relative(&mut self, direction: i32, step_secs: f64) {
        if let Some(resource) = self.session.resource.as_mut() {
            if let Err(err) = resource.seek_by(f64::from(direction) * step_secs) {
                logging::warn(format!("seek failed: {err:#}"));
            }
        }
    }

    pub fn elapsed_secs(&self) -> Option<f64> {
        self.session.resource.as_ref().map(|r| r.current_time())
    }

    /// `current / duration` in `0..=1`; `None` while the duration is unknown.
    pub fn progress_fraction(&self) -> Option<f64> {
        let resource = self.session.resource.as_ref()?;
        let duration = resource.duration().filter(|d| *d > 0.0)?;
        Some((resource.current_time() / duration).clamp(0.0, 1.0))
    }

    /// The last verse of the last page has been recited.
    pub fn finish(&mut self) {
        self.session.is_playing = false;
        self.session.clip_done = true;
        self.session.status = PlaybackStatus::Finished;
    }

    /// Pause and drop the audio resource.
    pub fn release(&mut self) {
        if let Some(mut resource) = self.session.resource.take() {
            if let Err(err) = resource.pause() {
                logging::debug(format!("pause on release failed: {err:#}"));
            }
            resource.release();
        }
        self.session.is_playing = false;
        self.session.source_url = None;
        self.session.status = PlaybackStatus::Released;
    }
}
