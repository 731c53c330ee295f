use serde::{Deserialize, Serialize};

use crate::playback::SEEK_STEP_SECS;

pub const DEFAULT_RECITER: &str = "شيخ أبو بكر الشاطري";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_reciter: String,
    pub initial_page: u32,
    /// Page text location; `{page}` is replaced by the page number.
    pub page_url_template: String,
    /// Reciter list location (URL or file path).
    pub reciters_url: String,
    pub seek_step_secs: f64,
    pub double_tap_window_ms: u64,
    pub player_command: String,
    pub player_args: Vec<String>,
    /// Extra argument to start from an offset; `{}` is replaced by seconds.
    pub player_start_arg: Option<String>,
    pub show_azkar_icon: bool,
    pub show_progress_indicator: bool,
    pub mouse_support: bool,
    pub text_width: usize,
    pub location_url: String,
    pub prayer_times_url: String,
    pub prayer_reminder_minutes: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_reciter: DEFAULT_RECITER.to_string(),
            initial_page: 1,
            page_url_template: "http://api.globalquran.com/page/{page}/quran-simple".to_string(),
            reciters_url: String::new(),
            seek_step_secs: SEEK_STEP_SECS,
            double_tap_window_ms: 800,
            player_command: "mpv".to_string(),
            player_args: vec!["--no-video".to_string(), "--really-quiet".to_string()],
            player_start_arg: Some("--start={}".to_string()),
            show_azkar_icon: true,
            show_progress_indicator: true,
            mouse_support: true,
            text_width: 80,
            location_url: "https://ipinfo.io/json".to_string(),
            prayer_times_url: "https://api.aladhan.com/v1/timings".to_string(),
            prayer_reminder_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgDefaultKeymaps {
    pub next_page: String,
    pub prev_page: String,
    pub next_verse: String,
    pub prev_verse: String,
    pub toggle_play: String,
    pub rewind: String,
    pub forward: String,
    pub tap: String,
    pub reciters: String,
    pub brightness_panel: String,
    pub brightness_up: String,
    pub brightness_down: String,
    pub toggle_azkar_icon: String,
    pub prayer_times: String,
    pub azkar: String,
    pub help: String,
    pub quit: String,
}

impl Default for CfgDefaultKeymaps {
    fn default() -> Self {
        Self {
            next_page: "n".to_string(),
            prev_page: "p".to_string(),
            next_verse: "j".to_string(),
            prev_verse: "k".to_string(),
            toggle_play: " ".to_string(),
            rewind: "[".to_string(),
            forward: "]".to_string(),
            tap: "t".to_string(),
            reciters: "r".to_string(),
            brightness_panel: "b".to_string(),
            brightness_up: "+".to_string(),
            brightness_down: "-".to_string(),
            toggle_azkar_icon: "a".to_string(),
            prayer_times: "s".to_string(),
            azkar: "z".to_string(),
            help: "?".to_string(),
            quit: "q".to_string(),
        }
    }
}

/// Actions bound to keys in the recital view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NextPage,
    PrevPage,
    NextVerse,
    PrevVerse,
    TogglePlay,
    Rewind,
    Forward,
    Tap,
    Reciters,
    BrightnessPanel,
    BrightnessUp,
    BrightnessDown,
    ToggleAzkarIcon,
    PrayerTimes,
    Azkar,
    Help,
    Quit,
}

/// Resolved key bindings: the first character of each configured key string.
#[derive(Debug, Clone, PartialEq)]
pub struct Keymap {
    bindings: Vec<(char, Action)>,
}

impl Keymap {
    pub fn from_user_dict(dict: &CfgDefaultKeymaps) -> Self {
        let pairs = [
            (&dict.next_page, Action::NextPage),
            (&dict.prev_page, Action::PrevPage),
            (&dict.next_verse, Action::NextVerse),
            (&dict.prev_verse, Action::PrevVerse),
            (&dict.toggle_play, Action::TogglePlay),
            (&dict.rewind, Action::Rewind),
            (&dict.forward, Action::Forward),
            (&dict.tap, Action::Tap),
            (&dict.reciters, Action::Reciters),
            (&dict.brightness_panel, Action::BrightnessPanel),
            (&dict.brightness_up, Action::BrightnessUp),
            (&dict.brightness_down, Action::BrightnessDown),
            (&dict.toggle_azkar_icon, Action::ToggleAzkarIcon),
            (&dict.prayer_times, Action::PrayerTimes),
            (&dict.azkar, Action::Azkar),
            (&dict.help, Action::Help),
            (&dict.quit, Action::Quit),
        ];
        let bindings = pairs
            .into_iter()
            .filter_map(|(key, action)| key.chars().next().map(|c| (c, action)))
            .collect();
        Self { bindings }
    }

    pub fn action_for(&self, key: char) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(c, _)| *c == key)
            .map(|(_, action)| *action)
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::from_user_dict(&CfgDefaultKeymaps::default())
    }
}
