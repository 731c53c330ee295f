use crate::models::{Verse, VerseKey};

/// One mushaf page worth of verses, replaced wholesale on every fetch.
///
/// At most one verse carries `selected == true`; after construction it is the
/// first verse of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct VersePage {
    number: u32,
    verses: Vec<Verse>,
}

impl VersePage {
    /// Normalize provider output into canonical order and select the first verse.
    ///
    /// Duplicate keys keep their first occurrence.
    pub fn new(number: u32, raw: Vec<Verse>) -> Self {
        let mut verses: Vec<Verse> = Vec::with_capacity(raw.len());
        for verse in raw {
            if !verses.iter().any(|v| v.key == verse.key) {
                verses.push(verse);
            }
        }
        verses.sort_by_key(|v| v.key);
        for (index, verse) in verses.iter_mut().enumerate() {
            verse.selected = index == 0;
        }
        Self { number, verses }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    pub fn first(&self) -> Option<&Verse> {
        self.verses.first()
    }

    pub fn get(&self, key: VerseKey) -> Option<&Verse> {
        self.verses.iter().find(|v| v.key == key)
    }

    pub fn position(&self, key: VerseKey) -> Option<usize> {
        self.verses.iter().position(|v| v.key == key)
    }

    pub fn selected(&self) -> Option<&Verse> {
        self.verses.iter().find(|v| v.selected)
    }

    /// Move the selection to `key`.
    ///
    /// Returns false without touching anything when `key` is already selected or
    /// is not on this page.
    pub fn select(&mut self, key: VerseKey) -> bool {
        if self.selected().is_some_and(|v| v.key == key) || self.get(key).is_none() {
            return false;
        }
        for verse in &mut self.verses {
            verse.selected = verse.key == key;
        }
        true
    }

    pub fn next_after(&self, key: VerseKey) -> Option<&Verse> {
        let index = self.position(key)?;
        self.verses.get(index + 1)
    }

    pub fn previous_before(&self, key: VerseKey) -> Option<&Verse> {
        let index = self.position(key)?;
        index.checked_sub(1).and_then(|i| self.verses.get(i))
    }
}
