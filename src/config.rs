use crate::settings::{CfgDefaultKeymaps, Keymap, Settings};
use eyre::Result;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{fs, path::PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub keymap: Keymap,
    keymap_user_dict: CfgDefaultKeymaps, // Used for building help text
    filepath: PathBuf,
}

/// Overlay the user's section onto `base`, one key at a time.
///
/// Unknown keys and values that do not deserialize into the field's type are
/// skipped, so a single bad entry never discards the rest of the file.
fn overlay_section<T>(base: &T, user_section: Option<&Value>) -> T
where
    T: Serialize + DeserializeOwned + Clone,
{
    let Some(user_map) = user_section.and_then(Value::as_object) else {
        return base.clone();
    };
    let Ok(mut merged) = serde_json::to_value(base) else {
        return base.clone();
    };

    for (key, value) in user_map {
        let Some(fields) = merged.as_object() else {
            break;
        };
        if !fields.contains_key(key) {
            continue;
        }
        let mut candidate = merged.clone();
        if let Some(candidate_fields) = candidate.as_object_mut() {
            candidate_fields.insert(key.clone(), value.clone());
        }
        if serde_json::from_value::<T>(candidate.clone()).is_ok() {
            merged = candidate;
        }
    }

    serde_json::from_value(merged).unwrap_or_else(|_| base.clone())
}

fn parse_user_config(config_str: &str) -> (Settings, CfgDefaultKeymaps) {
    let mut settings = Settings::default();
    let mut keymap_user_dict = CfgDefaultKeymaps::default();
    if let Ok(user_config) = serde_json::from_str::<Value>(config_str) {
        settings = overlay_section(&settings, user_config.get("Setting"));
        keymap_user_dict = overlay_section(&keymap_user_dict, user_config.get("Keymap"));
    }
    (settings, keymap_user_dict)
}

impl Config {
    fn assemble(settings: Settings, keymap_user_dict: CfgDefaultKeymaps, filepath: PathBuf) -> Self {
        Self {
            keymap: Keymap::from_user_dict(&keymap_user_dict),
            settings,
            keymap_user_dict,
            filepath,
        }
    }

    /// Load `configuration.json` from the app data prefix, writing the
    /// defaults there on first run.
    pub fn new() -> Result<Self> {
        let filepath = get_app_data_prefix()?.join("configuration.json");
        if filepath.exists() {
            return Self::load_from(filepath);
        }
        let config = Self::assemble(Settings::default(), CfgDefaultKeymaps::default(), filepath);
        config.save()?;
        Ok(config)
    }

    pub fn filepath(&self) -> &PathBuf {
        &self.filepath
    }

    pub fn keymap_user_dict(&self) -> &CfgDefaultKeymaps {
        &self.keymap_user_dict
    }

    /// Build a config from explicit values; it saves to
    /// `test_configuration.json` under the app data prefix.
    pub fn with_settings(settings: Settings, keymap_user_dict: CfgDefaultKeymaps) -> Result<Self> {
        let filepath = get_app_data_prefix()?.join("test_configuration.json");
        Ok(Self::assemble(settings, keymap_user_dict, filepath))
    }

    pub fn save(&self) -> Result<()> {
        let document = serde_json::json!({
            "Setting": self.settings,
            "Keymap": self.keymap_user_dict,
        });
        if let Some(dir) = self.filepath.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.filepath, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }

    /// Load configuration from a custom path. A missing or unreadable file
    /// yields the defaults.
    pub fn load_from(filepath: PathBuf) -> Result<Self> {
        let (settings, keymap_user_dict) = if filepath.exists() {
            parse_user_config(&fs::read_to_string(&filepath)?)
        } else {
            (Settings::default(), CfgDefaultKeymaps::default())
        };
        Ok(Self::assemble(settings, keymap_user_dict, filepath))
    }
}

pub fn get_app_data_prefix() -> Result<PathBuf> {
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        let path = PathBuf::from(config_home).join("tilawa");
        return Ok(path);
    } else if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home.clone()).join(".config").join("tilawa");
        if path.exists() {
            return Ok(path);
        } else {
            return Ok(PathBuf::from(home).join(".tilawa"));
        }
    } else if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        return Ok(PathBuf::from(user_profile).join(".tilawa"));
    }

    Err(eyre::eyre!(
        "Could not determine application data directory"
    ))
}
