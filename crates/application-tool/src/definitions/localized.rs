use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LOCALE: &str = "en-US";

/// Translated text keyed by locale tag. Contents are opaque to the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedStrings {
    translations: BTreeMap<String, String>,
}

impl LocalizedStrings {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_default(text: impl Into<String>) -> Self {
        Self::empty().update_translation(DEFAULT_LOCALE, text)
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.translations.get(locale).map(String::as_str)
    }

    /// Falls back to the default locale when `locale` has no translation.
    pub fn get_or_default(&self, locale: &str) -> Option<&str> {
        self.get(locale).or_else(|| self.get(DEFAULT_LOCALE))
    }

    pub fn default_text(&self) -> &str {
        self.get(DEFAULT_LOCALE).unwrap_or("")
    }

    pub fn update_translation(mut self, locale: &str, text: impl Into<String>) -> Self {
        self.translations.insert(locale.to_string(), text.into());
        self
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.translations.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.translations.values().all(|text| text.trim().is_empty())
    }
}
