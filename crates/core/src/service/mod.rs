//! Content service facade.
//!
//! Wires the cache, mirror, facet and query engines together and offers
//! the operations the HTTP layer and the change watcher need.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::{self, create_cache_store, keys, CacheStore};
use crate::config::Config;
use crate::content::{CollatorRegistry, Item, ItemDetails, Normalizer, Page};
use crate::error::ServiceError;
use crate::facets::{Counts, FacetEngine, FacetEntry, FacetSet};
use crate::metrics::FULL_FLUSHES;
use crate::mirror::MirrorFetcher;
use crate::query::{Query, QueryEngine, QueryOptions, QueryResult};
use crate::upstream::{ContentApi, OmekaClient, RawItem};

/// What a preload rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadSummary {
    pub items: usize,
    pub facets: usize,
    pub counts: Counts,
}

/// Read-through caching proxy over the content API.
pub struct ContentService {
    config: Config,
    api: Arc<dyn ContentApi>,
    cache: Arc<dyn CacheStore>,
    normalizer: Arc<Normalizer>,
    mirror: Arc<MirrorFetcher>,
    facets: Arc<FacetEngine>,
    query: QueryEngine,
    collators: CollatorRegistry,
}

impl ContentService {
    pub fn new(config: Config, api: Arc<dyn ContentApi>, cache: Arc<dyn CacheStore>) -> Self {
        let normalizer = Arc::new(Normalizer::new(
            config.properties.clone(),
            config.types.clone(),
        ));
        let collators = CollatorRegistry::default();
        let mirror = Arc::new(MirrorFetcher::new(
            Arc::clone(&api),
            Arc::clone(&cache),
            config.mirror.clone(),
        ));
        let facets = Arc::new(FacetEngine::new(
            Arc::clone(&mirror),
            Arc::clone(&cache),
            Arc::clone(&normalizer),
            config.cache.clone(),
        ));
        let query = QueryEngine::new(
            Arc::clone(&api),
            Arc::clone(&cache),
            Arc::clone(&facets),
            Arc::clone(&normalizer),
            collators.clone(),
            config.query.clone(),
            config.cache.clone(),
        );

        Self {
            config,
            api,
            cache,
            normalizer,
            mirror,
            facets,
            query,
            collators,
        }
    }

    /// Build the Omeka client and cache backend from configuration.
    pub fn from_config(config: Config) -> Result<Self, ServiceError> {
        let api: Arc<dyn ContentApi> = Arc::new(OmekaClient::new(&config.upstream)?);
        let cache = create_cache_store(&config.cache)?;
        Ok(Self::new(config, api, cache))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> &Arc<dyn ContentApi> {
        &self.api
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    // =========================================================================
    // Engine operations
    // =========================================================================

    pub async fn get_all_items(&self, force: bool) -> Result<Vec<RawItem>, ServiceError> {
        self.mirror.get_all_items(force).await
    }

    pub async fn get_filters(&self, force: bool) -> Result<FacetSet, ServiceError> {
        self.facets.get_filters(force).await
    }

    pub async fn get_filter_by_type(&self, kind: &str) -> Result<Vec<FacetEntry>, ServiceError> {
        self.facets.get_filter_by_type(kind).await
    }

    pub async fn get_counts(&self, force: bool) -> Result<Counts, ServiceError> {
        self.facets.get_counts(force).await
    }

    pub async fn query_items(
        &self,
        id: Option<u64>,
        query: &Query,
        options: QueryOptions,
    ) -> Result<QueryResult, ServiceError> {
        self.query.query_items(id, query, options).await
    }

    /// Cache keys of the first unfiltered listing page, one per language.
    pub fn listing_keys(&self) -> Vec<String> {
        self.config
            .query
            .languages
            .iter()
            .map(|lang| self.query.listing_key(lang))
            .collect()
    }

    // =========================================================================
    // Single resources
    // =========================================================================

    pub async fn get_item(&self, id: u64) -> Result<RawItem, ServiceError> {
        self.query.get_item(id).await
    }

    /// A normalized item with long-form text and its media.
    pub async fn get_item_details(&self, id: u64) -> Result<ItemDetails, ServiceError> {
        let key = keys::item_details(id);
        if let Some(details) = cache::get_json(self.cache.as_ref(), &key).await? {
            return Ok(details);
        }

        let raw = self.get_item(id).await?;
        let media = self.api.get_media(&raw.media_ids()).await?;
        let facets = self.get_filters(false).await?;
        let details = self.normalizer.details(&raw, &media, &facets);

        Ok(cache::set_json(
            self.cache.as_ref(),
            &key,
            Duration::from_secs(self.config.cache.details_ttl_secs),
            details,
        )
        .await?)
    }

    /// Every creator, ordered by title in `lang`.
    pub async fn get_creators(&self, lang: &str) -> Result<Vec<Item>, ServiceError> {
        let mut creators = self.facets.get_creators(false).await?;
        let collator = self.collators.for_language(lang);
        creators.sort_by(|a, b| collator.compare(a.title.resolve(lang), b.title.resolve(lang)));
        Ok(creators)
    }

    /// A site page by slug, from the site configured for `lang`.
    pub async fn get_page(&self, slug: &str, lang: &str) -> Result<Page, ServiceError> {
        let key = keys::page(slug, lang);
        if let Some(page) = cache::get_json(self.cache.as_ref(), &key).await? {
            return Ok(page);
        }

        let site = self.config.upstream.site_for(lang);
        let pages = self.api.get_site_pages(site, slug).await?;
        let raw = pages
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("page {} in site {}", slug, site)))?;
        let page = self.normalizer.page(raw, lang);

        Ok(cache::set_json(
            self.cache.as_ref(),
            &key,
            Duration::from_secs(self.config.cache.page_ttl_secs),
            page,
        )
        .await?)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Rebuild the mirror, then facets, counts and creators from it.
    pub async fn preload(&self) -> Result<PreloadSummary, ServiceError> {
        let items = self.mirror.get_all_items(true).await?;
        let (facets, counts) = futures::try_join!(
            self.facets.get_filters(true),
            self.facets.get_counts(true)
        )?;
        let creators = self.facets.get_creators(true).await?;

        let summary = PreloadSummary {
            items: items.len(),
            facets: facets.creator.len()
                + facets.object_type.len()
                + facets.theme.len()
                + facets.era.len()
                + facets.year.len(),
            counts,
        };
        info!(
            items = summary.items,
            creators = creators.len(),
            objects = counts.objects,
            "Preloaded caches"
        );
        Ok(summary)
    }

    /// Drop every cache entry, then preload.
    pub async fn flush_and_preload(&self, trigger: &str) -> Result<PreloadSummary, ServiceError> {
        warn!(trigger, "Flushing all caches");
        FULL_FLUSHES.with_label_values(&[trigger]).inc();
        self.cache.flush_all().await?;
        self.preload().await
    }
}
