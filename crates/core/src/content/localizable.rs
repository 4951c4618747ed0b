//! Language-aware field values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::upstream::LiteralValue;

/// Language key used for untagged values when tagged ones are also present.
pub const UNTAGGED: &str = "und";

/// A field that is either a plain string or one string per language tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Localizable {
    Scalar(String),
    ByLanguage(BTreeMap<String, String>),
}

impl Default for Localizable {
    fn default() -> Self {
        Localizable::Scalar(String::new())
    }
}

impl From<&str> for Localizable {
    fn from(value: &str) -> Self {
        Localizable::Scalar(value.to_string())
    }
}

impl Localizable {
    /// Build from upstream literal values.
    ///
    /// Untagged-only input yields a scalar (first value wins). With tagged
    /// values, the first value per language is kept and untagged ones land
    /// under [`UNTAGGED`].
    pub fn from_literals(values: &[LiteralValue<'_>]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        if values.iter().all(|v| v.language.is_none()) {
            return Some(Localizable::Scalar(values[0].value.to_string()));
        }

        let mut map = BTreeMap::new();
        for v in values {
            map.entry(v.language.unwrap_or(UNTAGGED).to_string())
                .or_insert_with(|| v.value.to_string());
        }
        Some(Localizable::ByLanguage(map))
    }

    /// Resolve to one string: the requested language, then its primary
    /// subtag ("zh-Hant" -> "zh"), then the first available value.
    pub fn resolve(&self, lang: &str) -> &str {
        match self {
            Localizable::Scalar(value) => value,
            Localizable::ByLanguage(map) => {
                if let Some(value) = map.get(lang) {
                    return value;
                }
                let primary = primary_subtag(lang);
                map.iter()
                    .find(|(tag, _)| primary_subtag(tag) == primary)
                    .or_else(|| map.iter().next())
                    .map(|(_, value)| value.as_str())
                    .unwrap_or("")
            }
        }
    }

    /// Every variant, for searching across languages.
    pub fn all_values(&self) -> Vec<&str> {
        match self {
            Localizable::Scalar(value) => vec![value.as_str()],
            Localizable::ByLanguage(map) => map.values().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all_values().iter().all(|v| v.is_empty())
    }
}

/// "zh-Hant-TW" -> "zh", lowercased.
pub fn primary_subtag(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}
