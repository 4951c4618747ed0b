//! Canonical query construction.
//!
//! The canonical form is both the upstream request and the cache key, so
//! equivalent filter sets must produce identical output regardless of input
//! order: values are trimmed, de-duplicated and sorted, and property blocks
//! are numbered in a fixed facet order.

use crate::config::{PropertyConfig, QueryConfig};
use crate::facets::FacetKind;
use crate::upstream::{
    encode_pairs, ItemsRequest, Joiner, PropertyFilter, PropertyMatch, SortOrder,
};

use super::search;
use super::types::{Query, QueryOptions};

/// A resolved query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalQuery {
    /// Request sent upstream.
    pub request: ItemsRequest,
    /// Cache key (`query:...`).
    pub key: String,
    pub lang: String,
    pub limit: u32,
    /// Whether any facet value, search term or parent scope is present.
    pub narrowed: bool,
    /// Qualifying search terms.
    pub terms: Vec<String>,
}

/// Build the canonical form of a query.
///
/// `scope` holds the ids a parent-scoped query is restricted to; they go to
/// upstream but the cache key names the parent instead.
pub fn canonicalize(
    parent: Option<u64>,
    scope: &[u64],
    query: &Query,
    options: &QueryOptions,
    config: &QueryConfig,
    properties: &PropertyConfig,
) -> CanonicalQuery {
    let mut blocks = Vec::new();
    for kind in FacetKind::LINKED {
        let ids = linked_values(query.facet(kind));
        let property = linked_property(properties, kind);
        push_blocks(&mut blocks, property, PropertyMatch::Resource, ids);
    }
    let years = text_values(query.facet(FacetKind::Year));
    push_blocks(&mut blocks, &properties.date, PropertyMatch::Contains, years);

    let terms = query.search.as_deref().map(search::terms).unwrap_or_default();
    let narrowed = !blocks.is_empty() || !terms.is_empty() || parent.is_some();

    let limit = match query.limit {
        Some(limit) => limit.clamp(1, config.filtered_limit),
        None if narrowed => config.filtered_limit,
        None => config.default_limit,
    };
    let page = query.page.unwrap_or(1).max(1);
    let lang = query
        .lang
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(&config.default_language)
        .to_string();

    let mut request = ItemsRequest::new(page, limit).sorted("created", SortOrder::Desc);
    request.properties = blocks;
    if !terms.is_empty() {
        request.fulltext_search = Some(terms.join(" "));
    }
    request.ids = scope.to_vec();

    let mut pairs: Vec<(String, String)> = request
        .to_query_pairs()
        .into_iter()
        .filter(|(k, _)| k != "id")
        .collect();
    if let Some(parent) = parent {
        pairs.push(("parent".to_string(), parent.to_string()));
    }
    pairs.push(("lang".to_string(), lang.clone()));
    for (flag, set) in [
        ("append_creators", options.append_creators),
        ("remove_creators", options.remove_creators),
        ("exclude_parts", options.exclude_parts),
    ] {
        if set {
            pairs.push((flag.to_string(), "1".to_string()));
        }
    }

    CanonicalQuery {
        request,
        key: crate::cache::keys::query(&encode_pairs(&pairs)),
        lang,
        limit,
        narrowed,
        terms,
    }
}

fn linked_property(properties: &PropertyConfig, kind: FacetKind) -> &str {
    match kind {
        FacetKind::Creator => &properties.creator,
        FacetKind::ObjectType => &properties.object_type,
        FacetKind::Theme => &properties.theme,
        FacetKind::Era => &properties.era,
        FacetKind::Year => &properties.date,
    }
}

/// Numeric ids, sorted and de-duplicated. Non-numeric values are ignored.
fn linked_values(raw: Option<&str>) -> Vec<String> {
    let mut ids: Vec<u64> = split(raw).filter_map(|v| v.parse().ok()).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.into_iter().map(|id| id.to_string()).collect()
}

fn text_values(raw: Option<&str>) -> Vec<String> {
    let mut values: Vec<String> = split(raw).map(str::to_string).collect();
    values.sort();
    values.dedup();
    values
}

fn split(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// One block per value: OR within a facet, AND against the previous facet.
fn push_blocks(
    blocks: &mut Vec<PropertyFilter>,
    property: &str,
    kind: PropertyMatch,
    values: Vec<String>,
) {
    for (i, text) in values.into_iter().enumerate() {
        blocks.push(PropertyFilter {
            joiner: if i == 0 { Joiner::And } else { Joiner::Or },
            property: property.to_string(),
            kind,
            text,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(query: &Query) -> CanonicalQuery {
        canonicalize(
            None,
            &[],
            query,
            &QueryOptions::default(),
            &QueryConfig::default(),
            &PropertyConfig::default(),
        )
    }

    #[test]
    fn test_value_order_does_not_matter() {
        let a = canonical(&Query {
            creator: Some("12,3".to_string()),
            theme: Some(" 7 , 5,7".to_string()),
            ..Default::default()
        });
        let b = canonical(&Query {
            theme: Some("5,7".to_string()),
            creator: Some("3, 12".to_string()),
            ..Default::default()
        });
        assert_eq!(a.key, b.key);
        assert_eq!(a.request, b.request);
    }

    #[test]
    fn test_block_numbering_and_joiners() {
        let c = canonical(&Query {
            creator: Some("2,1".to_string()),
            year: Some("1420".to_string()),
            ..Default::default()
        });

        let pairs = c.request.to_query_pairs();
        let find = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(find("property[0][text]"), Some("1"));
        assert_eq!(find("property[0][type]"), Some("res"));
        assert_eq!(find("property[0][joiner]"), None);
        assert_eq!(find("property[1][joiner]"), Some("or"));
        assert_eq!(find("property[1][text]"), Some("2"));
        assert_eq!(find("property[2][joiner]"), Some("and"));
        assert_eq!(find("property[2][property]"), Some("dcterms:date"));
        assert_eq!(find("property[2][type]"), Some("in"));
        assert_eq!(find("sort_by"), Some("created"));
        assert_eq!(find("sort_order"), Some("desc"));
    }

    #[test]
    fn test_limits() {
        let base = canonical(&Query::default());
        assert!(!base.narrowed);
        assert_eq!(base.limit, 20);
        assert_eq!(base.request.page, 1);

        let filtered = canonical(&Query {
            era: Some("4".to_string()),
            ..Default::default()
        });
        assert!(filtered.narrowed);
        assert_eq!(filtered.limit, 1000);

        let explicit = canonical(&Query {
            era: Some("4".to_string()),
            limit: Some(50_000),
            ..Default::default()
        });
        assert_eq!(explicit.limit, 1000);

        // only short terms: not a search
        let short = canonical(&Query {
            search: Some("a b".to_string()),
            ..Default::default()
        });
        assert!(!short.narrowed);
        assert!(short.request.fulltext_search.is_none());
    }

    #[test]
    fn test_search_terms_sent_upstream() {
        let c = canonical(&Query {
            search: Some("a, 中, abc".to_string()),
            ..Default::default()
        });
        assert_eq!(c.terms, vec!["中", "abc"]);
        assert_eq!(c.request.fulltext_search.as_deref(), Some("中 abc"));
    }

    #[test]
    fn test_key_names_parent_not_scope() {
        let config = QueryConfig::default();
        let properties = PropertyConfig::default();
        let options = QueryOptions::related();
        let a = canonicalize(Some(9), &[1, 2], &Query::default(), &options, &config, &properties);
        let b = canonicalize(Some(9), &[1, 2, 3], &Query::default(), &options, &config, &properties);

        assert_eq!(a.request.ids, vec![1, 2]);
        assert_eq!(a.key, b.key);
        assert!(a.key.contains("parent=9"));
        assert!(a.key.contains("append_creators=1"));
        assert!(!a.key.contains("id="));
    }

    #[test]
    fn test_language_and_options_split_keys() {
        let en = canonical(&Query::in_language("en"));
        let zh = canonical(&Query::in_language("zh"));
        let default = canonical(&Query::default());
        assert_ne!(en.key, zh.key);
        assert_eq!(en.key, default.key);

        let listing = canonicalize(
            None,
            &[],
            &Query::default(),
            &QueryOptions::listing(),
            &QueryConfig::default(),
            &PropertyConfig::default(),
        );
        assert_ne!(listing.key, default.key);
    }
}
