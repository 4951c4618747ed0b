//! The central read path.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{self, keys, CacheStore};
use crate::config::{CacheConfig, QueryConfig};
use crate::content::{CollatorRegistry, Item, ItemKind, Normalizer};
use crate::error::ServiceError;
use crate::facets::{Counts, FacetEngine};
use crate::metrics::QUERY_DURATION;
use crate::upstream::{ContentApi, RawItem};

use super::canonical::{canonicalize, CanonicalQuery};
use super::search;
use super::types::{Query, QueryOptions, QueryResult};

/// Answers paginated, filtered and searched queries with result caching.
pub struct QueryEngine {
    api: Arc<dyn ContentApi>,
    cache: Arc<dyn CacheStore>,
    facets: Arc<FacetEngine>,
    normalizer: Arc<Normalizer>,
    collators: CollatorRegistry,
    config: QueryConfig,
    ttls: CacheConfig,
}

impl QueryEngine {
    pub fn new(
        api: Arc<dyn ContentApi>,
        cache: Arc<dyn CacheStore>,
        facets: Arc<FacetEngine>,
        normalizer: Arc<Normalizer>,
        collators: CollatorRegistry,
        config: QueryConfig,
        ttls: CacheConfig,
    ) -> Self {
        Self {
            api,
            cache,
            facets,
            normalizer,
            collators,
            config,
            ttls,
        }
    }

    /// A raw upstream item, cached under `item:{id}`.
    pub async fn get_item(&self, id: u64) -> Result<RawItem, ServiceError> {
        let key = keys::item(id);
        if let Some(item) = cache::get_json(self.cache.as_ref(), &key).await? {
            return Ok(item);
        }
        let item = self.api.get_item(id).await?;
        Ok(cache::set_json(
            self.cache.as_ref(),
            &key,
            Duration::from_secs(self.ttls.item_ttl_secs),
            item,
        )
        .await?)
    }

    /// Cache key of the first unfiltered page of the top-level listing.
    pub fn listing_key(&self, lang: &str) -> String {
        self.canonical(None, &[], &Query::in_language(lang), &QueryOptions::listing())
            .key
    }

    fn canonical(
        &self,
        parent: Option<u64>,
        scope: &[u64],
        query: &Query,
        options: &QueryOptions,
    ) -> CanonicalQuery {
        canonicalize(
            parent,
            scope,
            query,
            options,
            &self.config,
            self.normalizer.properties(),
        )
    }

    /// Resolve a query, optionally scoped to the items linking to `id`.
    pub async fn query_items(
        &self,
        id: Option<u64>,
        query: &Query,
        options: QueryOptions,
    ) -> Result<QueryResult, ServiceError> {
        let started = Instant::now();

        let scope = match id {
            Some(id) => {
                let scope = self.get_item(id).await?.reverse_ids();
                if scope.is_empty() {
                    debug!(parent = id, "Parent has no linked items");
                    observe(started, "empty");
                    return Ok(QueryResult::empty_scope());
                }
                scope
            }
            None => Vec::new(),
        };

        let canonical = self.canonical(id, &scope, query, &options);
        if let Some(result) = cache::get_json(self.cache.as_ref(), &canonical.key).await? {
            observe(started, "cache");
            return Ok(result);
        }

        let raw = self.api.list_items(&canonical.request).await?;
        let global = self.facets.get_filters(false).await?;
        let searching = !canonical.terms.is_empty();

        let mut items: Vec<Item> = raw
            .iter()
            .map(|r| {
                let mut item = self.normalizer.normalize(r, &global, searching);
                if searching {
                    item.snippets = search::snippets(
                        &search::searchable_segments(&item),
                        &canonical.terms,
                        self.config.snippet_radius,
                        self.config.max_snippets,
                    );
                    item.strip_staged_text();
                }
                item
            })
            .collect();

        let has_next_page = raw.len() >= canonical.limit as usize;

        if options.append_creators {
            let extra = self.cross_referenced_creators(id, &scope, &items).await?;
            items.extend(extra);
        }

        // taxonomy records (object types, themes, eras) are facet values, not results
        let (mut creators, mut objects): (Vec<Item>, Vec<Item>) = items
            .into_iter()
            .filter(|i| matches!(i.kind, ItemKind::Creator | ItemKind::Object))
            .partition(Item::is_creator);
        if options.exclude_parts && !canonical.narrowed {
            objects.retain(|o| !o.is_part);
        }

        // same rule as the global totals: every creator, objects that are not parts
        let counts = if has_next_page {
            self.facets.get_counts(false).await?
        } else {
            Counts {
                creators: creators.len() as u64,
                objects: objects.iter().filter(|o| !o.is_part).count() as u64,
            }
        };

        let filters = canonical
            .narrowed
            .then(|| self.facets.compute_scoped(&raw, &global));

        self.sort_by_title(&mut creators, &canonical.lang);
        if id.is_some() {
            self.sort_by_title(&mut objects, &canonical.lang);
        }

        let items = if options.remove_creators {
            objects
        } else {
            creators.into_iter().chain(objects).collect()
        };

        let result = QueryResult {
            items,
            filters,
            has_next_page,
            counts,
        };
        debug!(
            key = %canonical.key,
            items = result.items.len(),
            has_next_page,
            "Resolved query"
        );
        let result = cache::set_json(
            self.cache.as_ref(),
            &canonical.key,
            Duration::from_secs(self.ttls.query_ttl_secs),
            result,
        )
        .await?;
        observe(started, "upstream");
        Ok(result)
    }

    /// Creators linked from the result's objects that are neither in the
    /// result, in the parent's linked set, nor the parent itself.
    async fn cross_referenced_creators(
        &self,
        parent: Option<u64>,
        scope: &[u64],
        items: &[Item],
    ) -> Result<Vec<Item>, ServiceError> {
        let mut excluded: HashSet<u64> = items.iter().map(|i| i.id).collect();
        excluded.extend(scope.iter().copied());
        excluded.extend(parent);

        let mut wanted = Vec::new();
        for link in items
            .iter()
            .filter(|i| !i.is_creator())
            .flat_map(|i| i.linked_properties.creator.iter())
        {
            if excluded.insert(link.id) {
                wanted.push(link.id);
            }
        }
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let creators = self.facets.get_creators(false).await?;
        Ok(wanted
            .into_iter()
            .filter_map(|id| creators.iter().find(|c| c.id == id).cloned())
            .collect())
    }

    fn sort_by_title(&self, items: &mut [Item], lang: &str) {
        let collator = self.collators.for_language(lang);
        items.sort_by(|a, b| collator.compare(a.title.resolve(lang), b.title.resolve(lang)));
    }
}

fn observe(started: Instant, source: &str) {
    QUERY_DURATION
        .with_label_values(&[source])
        .observe(started.elapsed().as_secs_f64());
}
