use std::cell::RefCell;
use std::rc::Rc;

use eyre::Result;

/// Screen brightness of the device running the reader, as a fraction in `0..=1`.
pub trait BrightnessControl {
    fn brightness(&self) -> Result<f64>;
    fn set_brightness(&mut self, fraction: f64) -> Result<()>;
}

/// Brightness kept in memory, for hosts without a controllable display.
#[derive(Debug, Clone)]
pub struct StoredBrightness {
    fraction: f64,
}

impl StoredBrightness {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }
}

impl Default for StoredBrightness {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl BrightnessControl for StoredBrightness {
    fn brightness(&self) -> Result<f64> {
        Ok(self.fraction)
    }

    fn set_brightness(&mut self, fraction: f64) -> Result<()> {
        self.fraction = fraction.clamp(0.0, 1.0);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    PrayerTimes,
    Azkar,
}

/// Screen stack owned by the host application.
pub trait NavigationHost {
    /// Replace the whole stack with `route`.
    fn set_root(&mut self, route: Route);
    /// Open `route` on top of the current screen.
    fn push(&mut self, route: Route, lang: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationRequest {
    SetRoot(Route),
    Push { route: Route, lang: String },
}

/// Queues navigation requests for the host loop to act on.
#[derive(Debug, Clone, Default)]
pub struct QueuedNavigation {
    requests: Rc<RefCell<Vec<NavigationRequest>>>,
}

impl QueuedNavigation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<NavigationRequest> {
        self.requests.borrow_mut().drain(..).collect()
    }
}

impl NavigationHost for QueuedNavigation {
    fn set_root(&mut self, route: Route) {
        self.requests.borrow_mut().push(NavigationRequest::SetRoot(route));
    }

    fn push(&mut self, route: Route, lang: &str) {
        self.requests.borrow_mut().push(NavigationRequest::Push {
            route,
            lang: lang.to_string(),
        });
    }
}
