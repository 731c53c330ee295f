use std::fmt;

use serde::Deserialize;

/// Last page of the Madani mushaf layout served by the page provider.
pub const LAST_PAGE: u32 = 604;

/// Stable identity of a verse: surah number then ayah number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VerseKey {
    pub surah: u32,
    pub ayah: u32,
}

impl VerseKey {
    pub fn new(surah: u32, ayah: u32) -> Self {
        Self { surah, ayah }
    }

    /// Combined `surah * 1000 + ayah` number used by the audio file naming.
    pub fn audio_number(&self) -> u64 {
        u64::from(self.surah) * 1000 + u64::from(self.ayah)
    }
}

impl fmt::Display for VerseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.surah, self.ayah)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verse {
    pub id: u32,
    pub key: VerseKey,
    pub text: String,
    pub selected: bool,
}

impl Verse {
    pub fn new(id: u32, key: VerseKey, text: impl Into<String>) -> Self {
        Self {
            id,
            key,
            text: text.into(),
            selected: false,
        }
    }
}

/// One record of the reciter list (`Radios`) payload.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Reciter {
    #[serde(rename = "ID", deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(rename = "Name", deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(rename = "URL", deserialize_with = "lenient::text")]
    pub stream_base_url: String,
    #[serde(rename = "BitRate", deserialize_with = "lenient::text")]
    pub bitrate: String,
    #[serde(rename = "Rewaya", deserialize_with = "lenient::text")]
    pub rewaya: String,
    #[serde(rename = "MusshafType", deserialize_with = "lenient::text")]
    pub mushaf_type: String,
    #[serde(rename = "IsCompleted", deserialize_with = "lenient::flag")]
    pub is_completed: bool,
    #[serde(rename = "TotalAvailable", deserialize_with = "lenient::text")]
    pub total_available: String,
}

/// Field deserializers for payloads that send numbers, flags and text
/// interchangeably (`"ID": 6` and `"ID": "6"` both occur).
pub(crate) mod lenient {
    use serde::Deserialize;
    use serde::de::{self, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
    }

    fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Scalar>, D::Error> {
        Option::<Scalar>::deserialize(deserializer)
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match scalar(deserializer)? {
            Some(Scalar::Text(s)) => s,
            Some(Scalar::Number(n)) => n.to_string(),
            Some(Scalar::Flag(b)) => b.to_string(),
            None => String::new(),
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match scalar(deserializer)? {
            Some(Scalar::Flag(b)) => b,
            Some(Scalar::Number(n)) => n.as_u64().is_some_and(|n| n != 0),
            Some(Scalar::Text(s)) => {
                matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
            }
            None => false,
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        optional_number(deserializer)?.ok_or_else(|| de::Error::custom("expected a number"))
    }

    pub fn optional_number<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u32>, D::Error> {
        match scalar(deserializer)? {
            Some(Scalar::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("{n} is out of range"))),
            Some(Scalar::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
            Some(Scalar::Flag(_)) => Err(de::Error::custom("expected a number, got a flag")),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Paused,
    /// Play was requested before the default reciter could be resolved.
    Deferred,
    Failed(String),
    /// The last verse of the last page finished.
    Finished,
    Released,
}

impl PlaybackStatus {
    pub fn label(&self) -> &str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Deferred => "waiting for reciters",
            PlaybackStatus::Failed(_) => "failed",
            PlaybackStatus::Finished => "finished",
            PlaybackStatus::Released => "stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageType {
    Info,
    Warning,
    Error,
}
