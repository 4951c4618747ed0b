//! Bulk mirror of the full upstream item collection.
//!
//! Facets and creator cross-references need a global view that no single
//! paginated listing provides, so the whole collection is paged into one
//! cached entry (`allItems`). Building it can take hundreds of requests;
//! only one build runs at a time and concurrent callers share its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{self, keys, CacheStore};
use crate::config::MirrorConfig;
use crate::error::ServiceError;
use crate::metrics::{MIRROR_FETCH_DURATION, MIRROR_ITEMS, MIRROR_WAITERS};
use crate::upstream::{ContentApi, ItemsRequest, RawItem, SortOrder, UpstreamError};

/// Cache-backed, single-flight fetcher of the whole item collection.
pub struct MirrorFetcher {
    api: Arc<dyn ContentApi>,
    cache: Arc<dyn CacheStore>,
    config: MirrorConfig,
    /// Held for the duration of a build.
    in_flight: Mutex<()>,
    /// Bumped after every successful build.
    generation: AtomicU64,
}

impl MirrorFetcher {
    pub fn new(api: Arc<dyn ContentApi>, cache: Arc<dyn CacheStore>, config: MirrorConfig) -> Self {
        Self {
            api,
            cache,
            config,
            in_flight: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// The full collection, from cache unless `force` is set.
    ///
    /// Callers arriving while a build is running wait for it and return its
    /// result instead of starting their own. A failed or timed-out build
    /// caches nothing.
    pub async fn get_all_items(&self, force: bool) -> Result<Vec<RawItem>, ServiceError> {
        // Read before the cache so a build finishing in between is noticed.
        let seen = self.generation.load(Ordering::SeqCst);
        if !force {
            if let Some(items) = cache::get_json(self.cache.as_ref(), keys::ALL_ITEMS).await? {
                return Ok(items);
            }
        }

        let _guard = self.in_flight.lock().await;

        if self.generation.load(Ordering::SeqCst) != seen {
            MIRROR_WAITERS.inc();
            if let Some(items) = cache::get_json(self.cache.as_ref(), keys::ALL_ITEMS).await? {
                debug!("Mirror built by a concurrent caller");
                return Ok(items);
            }
        }

        let items = self.build().await?;
        let items = cache::set_json(
            self.cache.as_ref(),
            keys::ALL_ITEMS,
            Duration::from_secs(self.config.ttl_secs),
            items,
        )
        .await?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(items)
    }

    async fn build(&self) -> Result<Vec<RawItem>, ServiceError> {
        let bound = Duration::from_secs(self.config.fetch_timeout_secs);
        let started = Instant::now();
        info!("Building item mirror");

        let outcome = tokio::time::timeout(bound, self.fetch_pages()).await;
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(Ok(items)) => {
                MIRROR_FETCH_DURATION
                    .with_label_values(&["ok"])
                    .observe(elapsed);
                MIRROR_ITEMS.set(items.len() as i64);
                info!(items = items.len(), elapsed_secs = elapsed, "Item mirror built");
                Ok(items)
            }
            Ok(Err(e)) => {
                MIRROR_FETCH_DURATION
                    .with_label_values(&["error"])
                    .observe(elapsed);
                warn!(error = %e, "Item mirror build failed, nothing cached");
                Err(e.into())
            }
            Err(_) => {
                MIRROR_FETCH_DURATION
                    .with_label_values(&["timeout"])
                    .observe(elapsed);
                warn!(timeout = ?bound, "Item mirror build timed out, nothing cached");
                Err(ServiceError::MirrorTimeout(bound))
            }
        }
    }

    /// Page through `/items` until a short page.
    async fn fetch_pages(&self) -> Result<Vec<RawItem>, UpstreamError> {
        let per_page = self.config.page_size;
        let delay = Duration::from_millis(self.config.page_delay_ms);
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let request = ItemsRequest::new(page, per_page).sorted("id", SortOrder::Asc);
            let batch = self.api.list_items(&request).await?;
            let fetched = batch.len();
            items.extend(batch);
            debug!(page, fetched, total = items.len(), "Fetched mirror page");

            if fetched < per_page as usize {
                return Ok(items);
            }
            page += 1;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
