//! Keystroke estimation for speed normalization.
//!
//! A dense-script glyph entered through a phonetic input method costs roughly
//! as many keystrokes as its tone-free romanization has letters. Every other
//! glyph is one direct keypress.

use std::collections::HashMap;

use pinyin::ToPinyin;
use serde::Deserialize;

use crate::script::is_dense_script;

/// Estimates the number of physical keystrokes needed to enter a glyph.
pub trait KeystrokeEstimator: Send + Sync {
    /// Romanization for a dense-script glyph, or `None` when unknown.
    fn romanize(&self, glyph: char) -> Option<&str>;

    fn estimate_keystrokes(&self, glyph: char) -> usize {
        if !is_dense_script(glyph) {
            return 1;
        }
        // called per typed glyph on every recompute; stays silent
        self.romanize(glyph).map_or(0, |spelling| spelling.chars().count())
    }
}

/// Mandarin pinyin without tone marks, using the most common reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinyinEstimator;

impl KeystrokeEstimator for PinyinEstimator {
    fn romanize(&self, glyph: char) -> Option<&str> {
        glyph.to_pinyin().map(|p| p.plain())
    }
}

/// Table-backed estimator, for other source languages or custom readings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct TableEstimator {
    readings: HashMap<char, String>,
}

impl TableEstimator {
    pub fn new(readings: HashMap<char, String>) -> Self {
        Self { readings }
    }

    /// Parses a JSON object mapping single glyphs to their romanization,
    /// e.g. `{"好": "hao"}`.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, glyph: char, reading: impl Into<String>) {
        self.readings.insert(glyph, reading.into());
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl KeystrokeEstimator for TableEstimator {
    fn romanize(&self, glyph: char) -> Option<&str> {
        self.readings.get(&glyph).map(String::as_str)
    }
}
