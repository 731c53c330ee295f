#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eyre::{Result, eyre};

use tilawa::audio::{AudioBackend, AudioEvent, AudioResource};
use tilawa::host::{QueuedNavigation, StoredBrightness};
use tilawa::models::{Reciter, Verse, VerseKey};
use tilawa::preferences::PreferenceBus;
use tilawa::provider::ContentProvider;
use tilawa::screen::RecitalScreen;
use tilawa::settings::Settings;

pub const SETTLE: Duration = Duration::from_secs(5);
pub const DEFAULT_RECITER: &str = "Default Reciter";

/// Every page has three verses of a surah numbered like the page.
pub struct MemoryProvider {
    pub page_requests: Mutex<Vec<u32>>,
    pub failing_pages: Mutex<HashSet<u32>>,
    pub reciters: Mutex<Option<Vec<Reciter>>>,
}

impl MemoryProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            page_requests: Mutex::new(Vec::new()),
            failing_pages: Mutex::new(HashSet::new()),
            reciters: Mutex::new(Some(reciter_payload())),
        })
    }

    pub fn requests(&self) -> Vec<u32> {
        self.page_requests.lock().unwrap().clone()
    }

    pub fn fail_page(&self, number: u32) {
        self.failing_pages.lock().unwrap().insert(number);
    }

    pub fn fail_reciters(&self) {
        *self.reciters.lock().unwrap() = None;
    }
}

impl ContentProvider for MemoryProvider {
    fn fetch_page(&self, number: u32) -> Result<Vec<Verse>> {
        self.page_requests.lock().unwrap().push(number);
        if self.failing_pages.lock().unwrap().contains(&number) {
            return Err(eyre!("HTTP 500 for page {number}"));
        }
        // Out of order, with a duplicate, like the raw payload can be.
        Ok(vec![
            Verse::new(3, VerseKey::new(number, 3), "third"),
            Verse::new(1, VerseKey::new(number, 1), "first"),
            Verse::new(2, VerseKey::new(number, 2), "second"),
            Verse::new(9, VerseKey::new(number, 1), "duplicate"),
        ])
    }

    fn fetch_reciters(&self) -> Result<Vec<Reciter>> {
        self.reciters
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| eyre!("reciter list unavailable"))
    }
}

pub fn reciter(name: &str, base: &str) -> Reciter {
    Reciter {
        id: name.to_string(),
        name: name.to_string(),
        stream_base_url: base.to_string(),
        ..Reciter::default()
    }
}

pub fn reciter_payload() -> Vec<Reciter> {
    vec![
        reciter(DEFAULT_RECITER, "https://default.example/"),
        reciter("Other Reciter", "https://other.example/"),
        reciter(DEFAULT_RECITER, "https://duplicate.example/"),
        reciter("sentinel", ""),
    ]
}

#[derive(Default)]
pub struct AudioLog {
    pub created: usize,
    pub plays: Vec<String>,
    pub pauses: usize,
    pub released: usize,
    pub seeks: Vec<f64>,
    pub events: Option<Sender<AudioEvent>>,
    pub current: Option<String>,
}

impl AudioLog {
    /// Report the current clip as finished.
    pub fn finish_current(&self) {
        if let (Some(tx), Some(source)) = (&self.events, &self.current) {
            tx.send(AudioEvent::Ended {
                source: source.clone(),
            })
            .unwrap();
        }
    }

    pub fn send(&self, event: AudioEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).unwrap();
        }
    }
}

pub struct MockBackend(pub Rc<RefCell<AudioLog>>);

struct MockResource {
    log: Rc<RefCell<AudioLog>>,
    source: String,
}

impl AudioBackend for MockBackend {
    fn create(&mut self, url: &str, events: Sender<AudioEvent>) -> Result<Box<dyn AudioResource>> {
        let mut log = self.0.borrow_mut();
        log.created += 1;
        log.events = Some(events);
        log.current = Some(url.to_string());
        Ok(Box::new(MockResource {
            log: Rc::clone(&self.0),
            source: url.to_string(),
        }))
    }
}

impl AudioResource for MockResource {
    fn source(&self) -> &str {
        &self.source
    }

    fn set_source(&mut self, url: &str) -> Result<()> {
        self.source = url.to_string();
        self.log.borrow_mut().current = Some(url.to_string());
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.log.borrow_mut().plays.push(self.source.clone());
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.log.borrow_mut().pauses += 1;
        Ok(())
    }

    fn seek_by(&mut self, seconds: f64) -> Result<()> {
        self.log.borrow_mut().seeks.push(seconds);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn release(&mut self) {
        self.log.borrow_mut().released += 1;
    }
}

pub struct Harness {
    pub screen: RecitalScreen,
    pub provider: Arc<MemoryProvider>,
    pub audio: Rc<RefCell<AudioLog>>,
    pub navigation: QueuedNavigation,
    pub bus: PreferenceBus,
}

pub fn settings(initial_page: u32) -> Settings {
    Settings {
        initial_page,
        default_reciter: DEFAULT_RECITER.to_string(),
        ..Settings::default()
    }
}

/// A screen that has entered and finished its initial fetches.
pub fn entered(initial_page: u32) -> Harness {
    let provider = MemoryProvider::new();
    let mut harness = build(initial_page, provider);
    harness.screen.enter(&harness.bus);
    assert!(harness.screen.settle(SETTLE));
    harness
}

pub fn build(initial_page: u32, provider: Arc<MemoryProvider>) -> Harness {
    let audio = Rc::new(RefCell::new(AudioLog::default()));
    let navigation = QueuedNavigation::new();
    let screen = RecitalScreen::new(
        &settings(initial_page),
        Arc::clone(&provider) as Arc<dyn ContentProvider>,
        Box::new(MockBackend(Rc::clone(&audio))),
        Box::new(StoredBrightness::new(0.7)),
        Box::new(navigation.clone()),
    );
    Harness {
        screen,
        provider,
        audio,
        navigation,
        bus: PreferenceBus::new(),
    }
}

pub fn selected_count(screen: &RecitalScreen) -> usize {
    screen
        .page()
        .map(|p| p.verses().iter().filter(|v| v.selected).count())
        .unwrap_or(0)
}
