use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, Weak};

use serde_json::{Map, Value};

use crate::settings::Settings;

/// A batch of changed preference values, keyed by setting name.
pub type PreferenceChanges = Map<String, Value>;

/// User preferences the recital screen reacts to while it is open.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub show_azkar_icon: bool,
    /// Values the screen does not interpret, kept so later changes merge onto them.
    pub extra: Map<String, Value>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            show_azkar_icon: true,
            extra: Map::new(),
        }
    }
}

impl Preferences {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            show_azkar_icon: settings.show_azkar_icon,
            extra: Map::new(),
        }
    }

    /// Merge `changes` over the current values; later values win.
    pub fn apply(&mut self, changes: &PreferenceChanges) {
        for (key, value) in changes {
            match (key.as_str(), value.as_bool()) {
                ("show_azkar_icon", Some(show)) => self.show_azkar_icon = show,
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<(u64, Sender<PreferenceChanges>)>,
}

/// In-process broadcast of preference changes.
#[derive(Clone, Default)]
pub struct PreferenceBus {
    inner: Arc<Mutex<BusInner>>,
}

impl PreferenceBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        let id = match self.inner.lock() {
            Ok(mut inner) => {
                inner.next_id += 1;
                let id = inner.next_id;
                inner.subscribers.push((id, tx));
                id
            }
            Err(_) => 0,
        };
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            rx,
        }
    }

    /// Deliver `changes` to every live subscriber; returns how many received it.
    pub fn publish(&self, changes: PreferenceChanges) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            return 0;
        };
        inner
            .subscribers
            .retain(|(_, tx)| tx.send(changes.clone()).is_ok());
        inner.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.subscribers.len()).unwrap_or(0)
    }
}

/// Live registration on a [`PreferenceBus`]. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    bus: Weak<Mutex<BusInner>>,
    rx: Receiver<PreferenceChanges>,
}

impl Subscription {
    pub fn drain(&self) -> Vec<PreferenceChanges> {
        self.rx.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade()
            && let Ok(mut inner) = bus.lock()
        {
            inner.subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Shortcut icon to the azkar screen, morning or evening flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AzkarIcon {
    Day,
    Night,
}

impl AzkarIcon {
    pub fn for_hour(hour: u32) -> Self {
        if (4..18).contains(&hour) {
            AzkarIcon::Day
        } else {
            AzkarIcon::Night
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            AzkarIcon::Day => "☀",
            AzkarIcon::Night => "☾",
        }
    }
}
