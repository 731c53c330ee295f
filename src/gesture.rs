//! Swipe and tap handling for the recital screen.

use std::time::{Duration, Instant};

/// Gesture direction codes, as reported by the touch gesture recognizer.
pub const SWIPE_NONE: u32 = 1;
pub const SWIPE_LEFT: u32 = 2;
pub const SWIPE_RIGHT: u32 = 4;
pub const SWIPE_UP: u32 = 8;
pub const SWIPE_DOWN: u32 = 16;

pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(800);

/// Page delta for a swipe code: 1 and 4 go forward, 2 goes back, anything
/// else is ignored.
pub fn swipe_page_delta(direction: u32) -> Option<i32> {
    match direction {
        SWIPE_NONE | SWIPE_RIGHT => Some(1),
        SWIPE_LEFT => Some(-1),
        _ => None,
    }
}

/// Classify a pointer drag into a gesture code. Horizontal movement wins ties.
pub fn swipe_direction(dx: i32, dy: i32) -> u32 {
    if dx == 0 && dy == 0 {
        SWIPE_NONE
    } else if dx.abs() >= dy.abs() {
        if dx < 0 { SWIPE_LEFT } else { SWIPE_RIGHT }
    } else if dy < 0 {
        SWIPE_UP
    } else {
        SWIPE_DOWN
    }
}

/// Two-tap detector: the first tap arms it, the second tap either fires (when
/// it lands inside the window) or not, and always disarms it.
#[derive(Debug, Clone)]
pub struct TapDetector {
    armed_at: Option<Instant>,
    window: Duration,
}

impl Default for TapDetector {
    fn default() -> Self {
        Self::new(DOUBLE_TAP_WINDOW)
    }
}

impl TapDetector {
    pub fn new(window: Duration) -> Self {
        Self {
            armed_at: None,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    /// Register a tap at `now`; true when it completes a double tap.
    pub fn tap(&mut self, now: Instant) -> bool {
        match self.armed_at.take() {
            None => {
                self.armed_at = Some(now);
                false
            }
            Some(first) => now.saturating_duration_since(first) < self.window,
        }
    }
}
