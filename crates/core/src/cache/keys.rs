//! Cache key naming.
//!
//! Key names are part of the operational contract: admin tooling and the
//! change watcher address entries by these exact strings.

/// The full upstream item collection.
pub const ALL_ITEMS: &str = "allItems";
/// The global facet set.
pub const FILTERS: &str = "filters";
/// Global creator/object totals.
pub const COUNTS: &str = "counts";
/// Every creator item, normalized.
pub const CREATORS: &str = "creators";

/// A single raw upstream item.
pub fn item(id: u64) -> String {
    format!("item:{}", id)
}

/// A normalized item with its media.
pub fn item_details(id: u64) -> String {
    format!("item:details:{}", id)
}

/// A query result, keyed by its canonical query string.
pub fn query(canonical: &str) -> String {
    format!("query:{}", canonical)
}

/// A site page in one language.
pub fn page(slug: &str, lang: &str) -> String {
    format!("page:{}-{}", slug, lang)
}

/// Key family used as a metric label ("item", "query", "filters", ...).
pub fn family(key: &str) -> &str {
    match key.split_once(':') {
        Some(("item", rest)) if rest.starts_with("details:") => "item_details",
        Some((prefix, _)) => prefix,
        None => key,
    }
}
