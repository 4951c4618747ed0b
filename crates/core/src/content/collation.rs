//! Locale collation strategies keyed by language tag.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use pinyin::ToPinyin;
use tracing::debug;

use super::localizable::primary_subtag;

/// Compares display strings for one locale.
pub trait Collator: Send + Sync {
    fn name(&self) -> &'static str;
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// Plain code-point order. Used for locales without collation rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrdinalCollator;

impl Collator for OrdinalCollator {
    fn name(&self) -> &'static str {
        "ordinal"
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }
}

/// Case-insensitive order ignoring leading punctuation, ordinal tiebreak.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishCollator;

impl EnglishCollator {
    fn key(s: &str) -> impl Iterator<Item = char> + '_ {
        s.trim_start_matches(|c: char| !c.is_alphanumeric())
            .chars()
            .flat_map(char::to_lowercase)
    }
}

impl Collator for EnglishCollator {
    fn name(&self) -> &'static str {
        "en"
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        Self::key(a).cmp(Self::key(b)).then_with(|| a.cmp(b))
    }
}

/// Han characters ordered by their toneless pinyin reading.
///
/// Non-Han characters sort by their lowercase form, so Latin and Han titles
/// interleave alphabetically ("Bai", "北京", "Chen").
#[derive(Debug, Default, Clone, Copy)]
pub struct PinyinCollator;

impl PinyinCollator {
    fn key(s: &str) -> Vec<String> {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c.to_pinyin() {
                Some(py) => py.plain().to_string(),
                None => c.to_lowercase().collect(),
            })
            .collect()
    }
}

impl Collator for PinyinCollator {
    fn name(&self) -> &'static str {
        "zh"
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        Self::key(a).cmp(&Self::key(b)).then_with(|| a.cmp(b))
    }
}

/// Collators by primary language subtag, falling back to ordinal order.
#[derive(Clone)]
pub struct CollatorRegistry {
    collators: HashMap<String, Arc<dyn Collator>>,
    fallback: Arc<dyn Collator>,
}

impl Default for CollatorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("en", Arc::new(EnglishCollator));
        registry.register("zh", Arc::new(PinyinCollator));
        registry
    }
}

impl CollatorRegistry {
    /// A registry that only knows ordinal order.
    pub fn empty() -> Self {
        Self {
            collators: HashMap::new(),
            fallback: Arc::new(OrdinalCollator),
        }
    }

    pub fn register(&mut self, lang: &str, collator: Arc<dyn Collator>) {
        self.collators.insert(primary_subtag(lang), collator);
    }

    /// Collator for a language tag ("zh-Hant" uses the "zh" collator).
    pub fn for_language(&self, lang: &str) -> &dyn Collator {
        match self.collators.get(&primary_subtag(lang)) {
            Some(collator) => collator.as_ref(),
            None => {
                debug!(lang = %lang, "No collator registered, using ordinal order");
                self.fallback.as_ref()
            }
        }
    }
}

impl std::fmt::Debug for CollatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut langs: Vec<&String> = self.collators.keys().collect();
        langs.sort();
        f.debug_struct("CollatorRegistry")
            .field("languages", &langs)
            .finish()
    }
}
