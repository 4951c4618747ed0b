//! Facet engine.
//!
//! Facets and totals are always derived from the full mirror, never from a
//! paginated query result. Part items (sub-parts of a serialized work) are
//! left out of the year, creator, theme and era counts. Object-type counts
//! include them and then zero the configured issue category instead.

mod types;

pub use types::{Counts, FacetEntry, FacetKind, FacetSet};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{self, keys, CacheStore};
use crate::config::CacheConfig;
use crate::content::{Item, ItemKind, Normalizer};
use crate::error::ServiceError;
use crate::mirror::MirrorFetcher;
use crate::upstream::RawItem;

/// Derives and caches the global facet set and totals.
pub struct FacetEngine {
    mirror: Arc<MirrorFetcher>,
    cache: Arc<dyn CacheStore>,
    normalizer: Arc<Normalizer>,
    ttls: CacheConfig,
}

impl FacetEngine {
    pub fn new(
        mirror: Arc<MirrorFetcher>,
        cache: Arc<dyn CacheStore>,
        normalizer: Arc<Normalizer>,
        ttls: CacheConfig,
    ) -> Self {
        Self {
            mirror,
            cache,
            normalizer,
            ttls,
        }
    }

    /// The global facet set. `force` recomputes it from the current mirror.
    pub async fn get_filters(&self, force: bool) -> Result<FacetSet, ServiceError> {
        if !force {
            if let Some(facets) = cache::get_json(self.cache.as_ref(), keys::FILTERS).await? {
                return Ok(facets);
            }
        }

        let items = self.mirror.get_all_items(false).await?;
        let facets = self.compute(&items);
        info!(
            creators = facets.creator.len(),
            object_types = facets.object_type.len(),
            themes = facets.theme.len(),
            eras = facets.era.len(),
            years = facets.year.len(),
            "Computed facets"
        );
        Ok(cache::set_json(
            self.cache.as_ref(),
            keys::FILTERS,
            Duration::from_secs(self.ttls.filters_ttl_secs),
            facets,
        )
        .await?)
    }

    /// One facet by name ("year", "creator", "objectType", "theme", "era").
    pub async fn get_filter_by_type(&self, kind: &str) -> Result<Vec<FacetEntry>, ServiceError> {
        let kind: FacetKind = kind.parse().map_err(ServiceError::UnknownFacet)?;
        Ok(self.get_filters(false).await?.get(kind).to_vec())
    }

    /// Global creator and object totals.
    pub async fn get_counts(&self, force: bool) -> Result<Counts, ServiceError> {
        if !force {
            if let Some(counts) = cache::get_json(self.cache.as_ref(), keys::COUNTS).await? {
                return Ok(counts);
            }
        }

        let items = self.mirror.get_all_items(false).await?;
        let counts = self.count(&items);
        debug!(creators = counts.creators, objects = counts.objects, "Computed counts");
        Ok(cache::set_json(
            self.cache.as_ref(),
            keys::COUNTS,
            Duration::from_secs(self.ttls.counts_ttl_secs),
            counts,
        )
        .await?)
    }

    /// Every creator in the mirror, normalized, in mirror order.
    pub async fn get_creators(&self, force: bool) -> Result<Vec<Item>, ServiceError> {
        if !force {
            if let Some(creators) = cache::get_json(self.cache.as_ref(), keys::CREATORS).await? {
                return Ok(creators);
            }
        }

        let items = self.mirror.get_all_items(false).await?;
        let facets = self.get_filters(false).await?;
        let creators: Vec<Item> = items
            .iter()
            .filter(|i| self.normalizer.kind_of(i) == ItemKind::Creator)
            .map(|raw| self.normalizer.normalize(raw, &facets, false))
            .collect();
        debug!(creators = creators.len(), "Normalized creators");
        Ok(cache::set_json(
            self.cache.as_ref(),
            keys::CREATORS,
            Duration::from_secs(self.ttls.creators_ttl_secs),
            creators,
        )
        .await?)
    }

    /// Facets over the whole mirror. Values are the mirror's items of each
    /// linked category, in mirror order before sorting.
    pub fn compute(&self, items: &[RawItem]) -> FacetSet {
        let mut facets = FacetSet {
            year: self.years(items),
            ..Default::default()
        };

        for kind in FacetKind::LINKED {
            let tally = self.tally(items, kind);
            let entries = items
                .iter()
                .filter(|i| Some(self.normalizer.kind_of(i)) == kind.item_kind())
                .map(|candidate| {
                    FacetEntry::linked(
                        candidate.id,
                        self.normalizer.title(candidate),
                        tally.get(&candidate.id).copied().unwrap_or(0),
                    )
                })
                .collect();
            *facets.get_mut(kind) = finish(entries);
        }
        facets
    }

    /// Facets over a result set, using `global`'s values as candidates.
    pub fn compute_scoped(&self, items: &[RawItem], global: &FacetSet) -> FacetSet {
        let mut facets = FacetSet {
            year: self.years(items),
            ..Default::default()
        };

        for kind in FacetKind::LINKED {
            let tally = self.tally(items, kind);
            let entries = global
                .get(kind)
                .iter()
                .filter_map(|entry| {
                    let id = entry.id?;
                    Some(FacetEntry {
                        count: tally.get(&id).copied().unwrap_or(0),
                        ..entry.clone()
                    })
                })
                .collect();
            *facets.get_mut(kind) = finish(entries);
        }
        facets
    }

    /// Totals over a set of raw items: creators, and objects that are not parts.
    pub fn count(&self, items: &[RawItem]) -> Counts {
        let mut counts = Counts::default();
        for item in items {
            match self.normalizer.kind_of(item) {
                ItemKind::Creator => counts.creators += 1,
                ItemKind::Object if !self.normalizer.is_part(item) => counts.objects += 1,
                _ => {}
            }
        }
        counts
    }

    /// Number of counted items linking to each id through the facet's property.
    fn tally(&self, items: &[RawItem], kind: FacetKind) -> HashMap<u64, u64> {
        let property = self.normalizer.facet_property(kind);
        let include_parts = kind == FacetKind::ObjectType;
        let mut tally = HashMap::new();

        for item in items {
            if !include_parts && self.normalizer.is_part(item) {
                continue;
            }
            for id in item.linked_ids(property) {
                *tally.entry(id).or_insert(0) += 1;
            }
        }

        if include_parts {
            if let Some(issue) = self.normalizer.properties().issue_type_id {
                tally.insert(issue, 0);
            }
        }
        tally
    }

    /// Year histogram over non-part items, in first-appearance order.
    fn years(&self, items: &[RawItem]) -> Vec<FacetEntry> {
        let mut order: Vec<String> = Vec::new();
        let mut tally: HashMap<String, u64> = HashMap::new();

        for item in items.iter().filter(|i| !self.normalizer.is_part(i)) {
            if let Some(year) = self.normalizer.year_of(item) {
                let count = tally.entry(year.clone()).or_insert(0);
                if *count == 0 {
                    order.push(year);
                }
                *count += 1;
            }
        }

        finish(
            order
                .into_iter()
                .map(|year| {
                    let count = tally[&year];
                    FacetEntry::year(year, count)
                })
                .collect(),
        )
    }
}

/// Drop zero counts, then stable sort by descending count.
fn finish(mut entries: Vec<FacetEntry>) -> Vec<FacetEntry> {
    entries.retain(|e| e.count > 0);
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::Config;
    use crate::testing::{fixtures, MockContentApi};
    use crate::testing::fixtures::ItemBuilder;

    fn engine_with(config: &Config, api: Arc<MockContentApi>) -> FacetEngine {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let mirror = Arc::new(MirrorFetcher::new(api, cache.clone(), config.mirror.clone()));
        let normalizer = Arc::new(Normalizer::new(
            config.properties.clone(),
            config.types.clone(),
        ));
        FacetEngine::new(mirror, cache, normalizer, config.cache.clone())
    }

    fn creator_scenario() -> Vec<RawItem> {
        vec![
            fixtures::creator(1, "Wu Zhen"),
            fixtures::creator(2, "Ni Zan"),
            fixtures::creator(3, "Huang Gongwang"),
            ItemBuilder::new(10).creators(&[1, 2]).build(),
            ItemBuilder::new(11).creators(&[1]).build(),
        ]
    }

    #[tokio::test]
    async fn test_creator_facet_counts_and_order() {
        let api = Arc::new(MockContentApi::new());
        api.set_items(creator_scenario()).await;
        let engine = engine_with(&fixtures::test_config(), api);

        let creators = engine.get_filter_by_type("creator").await.unwrap();

        let pairs: Vec<(Option<u64>, u64)> = creators.iter().map(|e| (e.id, e.count)).collect();
        assert_eq!(pairs, vec![(Some(1), 2), (Some(2), 1)]);
        assert_eq!(creators[0].title.as_ref().unwrap().resolve("en"), "Wu Zhen");
    }

    #[tokio::test]
    async fn test_unknown_facet_kind() {
        let api = Arc::new(MockContentApi::new());
        let engine = engine_with(&fixtures::test_config(), api);

        let err = engine.get_filter_by_type("color").await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownFacet(k) if k == "color"));
    }

    #[tokio::test]
    async fn test_filters_are_cached() {
        let api = Arc::new(MockContentApi::new());
        api.set_items(creator_scenario()).await;
        let engine = engine_with(&fixtures::test_config(), api.clone());

        let first = engine.get_filters(false).await.unwrap();
        api.add_item(ItemBuilder::new(12).creators(&[3]).build()).await;
        let second = engine.get_filters(false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(api.list_call_count().await, 1);
    }

    #[tokio::test]
    async fn test_creators_include_unreferenced() {
        let api = Arc::new(MockContentApi::new());
        api.set_items(creator_scenario()).await;
        let engine = engine_with(&fixtures::test_config(), api);

        let creators = engine.get_creators(false).await.unwrap();

        let ids: Vec<u64> = creators.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(creators.iter().all(|c| c.kind == ItemKind::Creator));
    }

    #[test]
    fn test_part_exclusion_asymmetry() {
        let mut config = fixtures::test_config();
        config.properties.issue_type_id = Some(21);
        let engine = engine_with(&config, Arc::new(MockContentApi::new()));

        let items = vec![
            fixtures::creator(1, "Editor"),
            fixtures::object_type(20, "Journal"),
            fixtures::object_type(21, "Issue"),
            fixtures::theme(30, "Poetry"),
            ItemBuilder::new(100)
                .creators(&[1])
                .object_types(&[20])
                .themes(&[30])
                .date("1920")
                .build(),
            // linked to a parent work
            ItemBuilder::new(101)
                .part_of(100)
                .creators(&[1])
                .object_types(&[20])
                .themes(&[30])
                .date("1921-04")
                .build(),
            // tagged with the issue category
            ItemBuilder::new(102)
                .creators(&[1])
                .object_types(&[21])
                .date("1922")
                .build(),
        ];

        let facets = engine.compute(&items);

        assert_eq!(facets.creator.len(), 1);
        assert_eq!(facets.creator[0].count, 1);
        assert_eq!(facets.theme[0].count, 1);
        // parts count toward object types; the issue category is zeroed and dropped
        assert_eq!(facets.object_type.len(), 1);
        assert_eq!(facets.object_type[0].id, Some(20));
        assert_eq!(facets.object_type[0].count, 2);
        assert_eq!(facets.year, vec![FacetEntry::year("1920", 1)]);

        let counts = engine.count(&items);
        assert_eq!(counts, Counts { creators: 1, objects: 1 });
    }

    #[test]
    fn test_ties_keep_mirror_order() {
        let engine = engine_with(&fixtures::test_config(), Arc::new(MockContentApi::new()));
        let items = vec![
            fixtures::theme(5, "E"),
            fixtures::theme(3, "C"),
            fixtures::theme(4, "D"),
            ItemBuilder::new(10).themes(&[3, 4, 5]).date("1500").build(),
            ItemBuilder::new(11).themes(&[4]).date("1400").build(),
            ItemBuilder::new(12).date("1500").build(),
        ];

        let facets = engine.compute(&items);

        let ids: Vec<Option<u64>> = facets.theme.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![Some(4), Some(5), Some(3)]);
        assert_eq!(
            facets.year,
            vec![FacetEntry::year("1500", 2), FacetEntry::year("1400", 1)]
        );
    }

    #[test]
    fn test_scoped_counts_never_exceed_global() {
        let engine = engine_with(&fixtures::test_config(), Arc::new(MockContentApi::new()));
        let items = creator_scenario();
        let global = engine.compute(&items);

        let scoped = engine.compute_scoped(&items[4..], &global);

        assert_eq!(scoped.creator, vec![FacetEntry::linked(1, "Wu Zhen".into(), 1)]);
        for entry in &scoped.creator {
            let total = global.find(FacetKind::Creator, entry.id.unwrap()).unwrap();
            assert!(entry.count <= total.count);
        }
    }
}
