use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use eyre::{Result, WrapErr, eyre};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{Reciter, Verse, VerseKey, lenient};
use crate::settings::Settings;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Source of page text and of the reciter list.
///
/// Called from worker threads, hence `Send + Sync`.
pub trait ContentProvider: Send + Sync {
    fn fetch_page(&self, number: u32) -> Result<Vec<Verse>>;
    fn fetch_reciters(&self) -> Result<Vec<Reciter>>;
}

#[derive(Deserialize)]
struct PagePayload {
    quran: QuranText,
}

#[derive(Deserialize)]
struct QuranText {
    #[serde(rename = "quran-simple")]
    simple: HashMap<String, PageEntry>,
}

#[derive(Deserialize)]
struct PageEntry {
    #[serde(default, deserialize_with = "lenient::optional_number")]
    id: Option<u32>,
    #[serde(deserialize_with = "lenient::number")]
    surah: u32,
    #[serde(deserialize_with = "lenient::number")]
    ayah: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    verse: String,
}

#[derive(Deserialize)]
struct ReciterList {
    #[serde(rename = "Radios")]
    radios: Vec<Reciter>,
}

/// Verses of a page payload: `{"quran": {"quran-simple": {"<id>": {...}}}}`.
///
/// Order is left to [`crate::page::VersePage::new`]. An entry without an
/// `id` takes its map key.
pub fn parse_page(payload: &Value) -> Result<Vec<Verse>> {
    let page = PagePayload::deserialize(payload).wrap_err("malformed page payload")?;
    Ok(page
        .quran
        .simple
        .into_iter()
        .map(|(key, entry)| {
            let id = entry.id.or_else(|| key.parse().ok()).unwrap_or_default();
            Verse::new(id, VerseKey::new(entry.surah, entry.ayah), entry.verse)
        })
        .collect())
}

/// Records of a reciter list payload: `{"Radios": [{"ID", "Name", "URL", ...}]}`.
pub fn parse_reciters(payload: &Value) -> Result<Vec<Reciter>> {
    let list = ReciterList::deserialize(payload).wrap_err("malformed reciter list payload")?;
    Ok(list.radios)
}

/// Read a JSON document from an `http(s)://` URL or a local path.
pub fn fetch_json(client: &reqwest::blocking::Client, location: &str) -> Result<Value> {
    let location = location.trim();
    if location.is_empty() {
        return Err(eyre!("no location configured"));
    }
    if location.starts_with("http://") || location.starts_with("https://") {
        let response = client
            .get(location)
            .send()
            .wrap_err_with(|| format!("request to {location} failed"))?
            .error_for_status()?;
        return Ok(response.json()?);
    }
    let path = location.strip_prefix("file://").unwrap_or(location);
    let text = fs::read_to_string(path).wrap_err_with(|| format!("cannot read {path}"))?;
    Ok(serde_json::from_str(&text)?)
}

pub fn http_client() -> Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!("tilawa/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Content provider reading JSON over HTTP or from disk.
pub struct RemoteContentProvider {
    client: reqwest::blocking::Client,
    page_template: String,
    reciters_location: String,
}

impl RemoteContentProvider {
    pub fn new(page_template: impl Into<String>, reciters_location: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            page_template: page_template.into(),
            reciters_location: reciters_location.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.page_url_template.clone(), settings.reciters_url.clone())
    }

    pub fn page_location(&self, number: u32) -> String {
        self.page_template.replace("{page}", &number.to_string())
    }
}

impl ContentProvider for RemoteContentProvider {
    fn fetch_page(&self, number: u32) -> Result<Vec<Verse>> {
        let payload = fetch_json(&self.client, &self.page_location(number))
            .wrap_err_with(|| format!("error getting page {number}"))?;
        parse_page(&payload)
    }

    fn fetch_reciters(&self) -> Result<Vec<Reciter>> {
        let payload = fetch_json(&self.client, &self.reciters_location)
            .wrap_err("error getting reciter list")?;
        parse_reciters(&payload)
    }
}
