//! Change watcher implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::keys;
use crate::config::WatcherConfig;
use crate::error::ServiceError;
use crate::metrics::{FACET_REFRESHES, INVALIDATION_EVICTIONS};
use crate::service::ContentService;
use crate::upstream::ItemsRequest;

use super::types::{PollOutcome, WatcherStatus};

const MIN_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Background loop keeping cached entries consistent with upstream.
pub struct ChangeWatcher {
    service: Arc<ContentService>,
    config: WatcherConfig,

    // Runtime state
    running: Arc<AtomicBool>,
    status: Arc<RwLock<WatcherStatus>>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeWatcher {
    /// Create a new watcher.
    pub fn new(service: Arc<ContentService>, config: WatcherConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            service,
            config,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(WatcherStatus::default())),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    /// Start the watcher (spawns the polling loop).
    pub async fn start(&self) {
        if !self.config.enabled {
            info!("Change watcher disabled");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Change watcher already running");
            return;
        }

        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            recent_limit = self.config.recent_limit,
            "Starting change watcher"
        );
        self.status.write().await.running = true;
        *self.handle.lock().await = Some(self.spawn_loop());
    }

    /// Stop the watcher and wait for the loop to exit.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Change watcher not running");
            return;
        }

        info!("Stopping change watcher");
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Change watcher task ended abnormally: {}", e);
            }
        }
        self.status.write().await.running = false;
        info!("Change watcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Get current watcher status.
    pub async fn status(&self) -> WatcherStatus {
        self.status.read().await.clone()
    }

    /// Run one poll for modifications after `since`.
    pub async fn poll_once(&self, since: DateTime<Utc>) -> Result<PollOutcome, ServiceError> {
        Self::poll(&self.service, &self.config, &self.status, since).await
    }

    /// Delay until the next facet rebuild: the remaining `filters` TTL scaled
    /// by the safety factor, or one poll interval when facets are not cached.
    pub async fn refresh_delay(&self) -> Duration {
        Self::next_refresh_delay(&self.service, &self.config).await
    }

    fn spawn_loop(&self) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let config = self.config.clone();
        let status = Arc::clone(&self.status);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let interval = Duration::from_secs(config.poll_interval_secs);
            let mut poll = tokio::time::interval_at(Instant::now() + interval, interval);
            poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let delay = Self::next_refresh_delay(&service, &config).await;
            Self::record_next_refresh(&status, delay).await;
            let refresh = tokio::time::sleep(delay);
            tokio::pin!(refresh);

            let mut since = Utc::now() - chrono::Duration::seconds(config.poll_interval_secs as i64);

            info!("Change watcher loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Change watcher received shutdown signal");
                        break;
                    }
                    _ = poll.tick() => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let started = Utc::now();
                        match Self::poll(&service, &config, &status, since).await {
                            Ok(outcome) => {
                                since = started;
                                if outcome == PollOutcome::FullFlush {
                                    let delay = Self::next_refresh_delay(&service, &config).await;
                                    Self::record_next_refresh(&status, delay).await;
                                    refresh.as_mut().reset(Instant::now() + delay);
                                }
                            }
                            Err(e) => {
                                warn!("Change poll failed: {}", e);
                                status.write().await.last_error = Some(e.to_string());
                            }
                        }
                    }
                    _ = &mut refresh => {
                        info!("Rebuilding facets before the filters entry expires");
                        match service.preload().await {
                            Ok(_) => {
                                FACET_REFRESHES.inc();
                                let mut s = status.write().await;
                                s.last_refresh = Some(Utc::now());
                                s.last_error = None;
                            }
                            Err(e) => {
                                warn!("Facet refresh failed: {}", e);
                                status.write().await.last_error = Some(e.to_string());
                            }
                        }
                        let delay = Self::next_refresh_delay(&service, &config).await;
                        Self::record_next_refresh(&status, delay).await;
                        refresh.as_mut().reset(Instant::now() + delay);
                    }
                }
            }
            info!("Change watcher loop stopped");
        })
    }

    async fn poll(
        service: &ContentService,
        config: &WatcherConfig,
        status: &RwLock<WatcherStatus>,
        since: DateTime<Utc>,
    ) -> Result<PollOutcome, ServiceError> {
        let started = Utc::now();
        let request = ItemsRequest::recently_modified(config.recent_limit);
        let recent = service.api().list_items(&request).await?;

        match service.cache().purge_expired().await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "Purged expired cache entries"),
            Err(e) => warn!("Failed to purge expired entries: {}", e),
        }

        let changed: Vec<u64> = recent
            .iter()
            .filter(|item| item.modified().is_some_and(|at| at > since))
            .map(|item| item.id)
            .collect();

        let outcome = if changed.len() >= config.recent_limit as usize {
            info!(
                changed = changed.len(),
                "Modification batch is full, flushing everything"
            );
            service.flush_and_preload("watcher").await?;
            PollOutcome::FullFlush
        } else if changed.is_empty() {
            PollOutcome::Unchanged
        } else {
            let mut evicted = 0;
            let item_keys = changed
                .iter()
                .flat_map(|id| [keys::item(*id), keys::item_details(*id)]);
            for key in item_keys.chain(service.listing_keys()) {
                if service.cache().delete(&key).await? {
                    evicted += 1;
                }
            }
            INVALIDATION_EVICTIONS.inc_by(evicted as u64);
            info!(items = ?changed, evicted, "Evicted modified items");
            PollOutcome::Evicted {
                items: changed,
                keys: evicted,
            }
        };

        let mut s = status.write().await;
        s.last_poll = Some(started);
        s.polls += 1;
        s.last_error = None;
        match &outcome {
            PollOutcome::Evicted { keys, .. } => s.evictions += *keys as u64,
            PollOutcome::FullFlush => s.full_flushes += 1,
            PollOutcome::Unchanged => {}
        }
        Ok(outcome)
    }

    async fn next_refresh_delay(service: &ContentService, config: &WatcherConfig) -> Duration {
        match service.cache().ttl(keys::FILTERS).await {
            Ok(Some(ttl)) => ttl.mul_f64(config.ttl_safety_factor).max(MIN_REFRESH_DELAY),
            Ok(None) => Duration::from_secs(config.poll_interval_secs),
            Err(e) => {
                warn!("Failed to read filters TTL: {}", e);
                Duration::from_secs(config.poll_interval_secs)
            }
        }
    }

    async fn record_next_refresh(status: &RwLock<WatcherStatus>, delay: Duration) {
        let next = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d));
        status.write().await.next_refresh = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{self, MemoryCache};
    use crate::query::{Query, QueryOptions};
    use crate::testing::fixtures::{self, ItemBuilder};
    use crate::testing::MockContentApi;
    use crate::upstream::RawItem;

    fn modified_ago(id: u64, secs: i64) -> RawItem {
        let at = Utc::now() - chrono::Duration::seconds(secs);
        ItemBuilder::new(id).modified(&at.to_rfc3339()).build()
    }

    async fn watcher_with(items: Vec<RawItem>) -> (ChangeWatcher, Arc<MockContentApi>) {
        let api = Arc::new(MockContentApi::new());
        api.set_items(items).await;
        let config = fixtures::test_config();
        let watcher_config = config.watcher.clone();
        let service = Arc::new(ContentService::new(
            config,
            api.clone(),
            Arc::new(MemoryCache::new()),
        ));
        (ChangeWatcher::new(service, watcher_config), api)
    }

    async fn cache_marker(watcher: &ChangeWatcher, key: &str) {
        cache::set_json(
            watcher.service.cache().as_ref(),
            key,
            Duration::from_secs(600),
            "cached",
        )
        .await
        .unwrap();
    }

    async fn is_cached(watcher: &ChangeWatcher, key: &str) -> bool {
        watcher.service.cache().ttl(key).await.unwrap().is_some()
    }

    #[tokio::test]
    async fn test_full_batch_triggers_full_flush() {
        let items: Vec<RawItem> = (1..=25).map(|id| modified_ago(id, 5)).collect();
        let (watcher, api) = watcher_with(items).await;
        cache_marker(&watcher, &keys::item(3)).await;
        cache_marker(&watcher, "query:stale").await;

        let since = Utc::now() - chrono::Duration::seconds(60);
        let outcome = watcher.poll_once(since).await.unwrap();

        assert_eq!(outcome, PollOutcome::FullFlush);
        let first = &api.list_requests().await[0];
        assert_eq!(first.per_page, 20);
        assert_eq!(first.sort_by.as_deref(), Some("modified"));
        assert!(!is_cached(&watcher, &keys::item(3)).await);
        assert!(!is_cached(&watcher, "query:stale").await);
        for key in [keys::ALL_ITEMS, keys::FILTERS, keys::COUNTS, keys::CREATORS] {
            assert!(is_cached(&watcher, key).await, "{} not rebuilt", key);
        }
        assert_eq!(watcher.status().await.full_flushes, 1);
    }

    #[tokio::test]
    async fn test_changed_items_evicted_selectively() {
        let mut items: Vec<RawItem> = (1..=10).map(|id| modified_ago(id, 3600)).collect();
        items.push(modified_ago(11, 5));
        items.push(modified_ago(12, 5));
        let (watcher, _api) = watcher_with(items).await;

        let listing = watcher.service.listing_keys();
        assert_eq!(listing.len(), 2);
        for key in [keys::item(11), keys::item_details(12), keys::item(1)] {
            cache_marker(&watcher, &key).await;
        }
        for key in &listing {
            cache_marker(&watcher, key).await;
        }

        let since = Utc::now() - chrono::Duration::seconds(60);
        let outcome = watcher.poll_once(since).await.unwrap();

        match outcome {
            PollOutcome::Evicted { mut items, keys } => {
                items.sort();
                assert_eq!(items, vec![11, 12]);
                assert_eq!(keys, 4);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!is_cached(&watcher, &keys::item(11)).await);
        assert!(!is_cached(&watcher, &keys::item_details(12)).await);
        assert!(is_cached(&watcher, &keys::item(1)).await);
        for key in &listing {
            assert!(!is_cached(&watcher, key).await);
        }
    }

    #[tokio::test]
    async fn test_listing_key_matches_served_listing() {
        let (watcher, _api) = watcher_with(vec![modified_ago(1, 3600)]).await;

        watcher
            .service
            .query_items(None, &Query::in_language("en"), QueryOptions::listing())
            .await
            .unwrap();

        assert!(is_cached(&watcher, &watcher.service.listing_keys()[0]).await);
    }

    #[tokio::test]
    async fn test_quiet_poll_keeps_caches() {
        let (watcher, _api) =
            watcher_with((1..=3).map(|id| modified_ago(id, 3600)).collect()).await;
        let listing = watcher.service.listing_keys();
        cache_marker(&watcher, &listing[0]).await;

        let since = Utc::now() - chrono::Duration::seconds(60);
        assert_eq!(watcher.poll_once(since).await.unwrap(), PollOutcome::Unchanged);
        assert!(is_cached(&watcher, &listing[0]).await);
        assert_eq!(watcher.status().await.polls, 1);
    }

    #[tokio::test]
    async fn test_failed_poll_propagates() {
        let (watcher, api) = watcher_with(vec![]).await;
        api.set_next_error(500).await;

        let err = watcher.poll_once(Utc::now()).await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(500));
        assert_eq!(watcher.status().await.polls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_delay_follows_filters_ttl() {
        let (watcher, _api) = watcher_with(vec![fixtures::creator(1, "Wu Zhen")]).await;

        // nothing cached yet: one poll interval
        assert_eq!(watcher.refresh_delay().await, Duration::from_secs(60));

        watcher.service.get_filters(false).await.unwrap();
        let delay = watcher.refresh_delay().await.as_secs();
        assert!((82_078..=82_080).contains(&delay), "next delay {}s", delay);

        tokio::time::advance(Duration::from_secs(80_000)).await;
        assert_eq!(watcher.refresh_delay().await, Duration::from_secs(6_400).mul_f64(0.95));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_rebuilds_facets_before_filters_expire() {
        let api = Arc::new(MockContentApi::new());
        api.set_items(vec![fixtures::creator(1, "Wu Zhen")]).await;
        let mut config = fixtures::test_config();
        // keep polls out of the way of the refresh deadline
        config.watcher.poll_interval_secs = 1_000_000;
        let watcher_config = config.watcher.clone();
        let service = Arc::new(ContentService::new(
            config,
            api.clone(),
            Arc::new(MemoryCache::new()),
        ));
        let watcher = ChangeWatcher::new(service, watcher_config);

        watcher.service.get_filters(false).await.unwrap();
        let mirror_builds = |requests: Vec<ItemsRequest>| {
            requests
                .iter()
                .filter(|r| r.sort_by.as_deref() == Some("id"))
                .count()
        };
        assert_eq!(mirror_builds(api.list_requests().await), 1);

        watcher.start().await;

        // 86400s filters TTL x 0.95
        tokio::time::sleep(Duration::from_secs(82_081)).await;
        for _ in 0..100 {
            if watcher.status().await.last_refresh.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // let the loop finish re-arming after the rebuild
        tokio::time::sleep(Duration::from_secs(1)).await;
        let status = watcher.status().await;

        let last_refresh = status.last_refresh.expect("facets were not rebuilt");
        assert_eq!(mirror_builds(api.list_requests().await), 2);
        assert!(status.last_error.is_none());

        // re-armed from the fresh TTL, not the remainder of the old one
        let next_refresh = status.next_refresh.unwrap();
        let rearmed = (next_refresh - last_refresh).num_seconds();
        assert!((82_079..=82_081).contains(&rearmed), "re-armed after {}s", rearmed);
        let delay = watcher.refresh_delay().await.as_secs();
        assert!((82_078..=82_080).contains(&delay), "next delay {}s", delay);

        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let (watcher, _api) = watcher_with(vec![]).await;

        watcher.start().await;
        assert!(watcher.is_running());
        assert!(watcher.status().await.running);

        watcher.stop().await;
        assert!(!watcher.is_running());
        assert!(!watcher.status().await.running);
    }

    #[tokio::test]
    async fn test_disabled_watcher_does_not_start() {
        let api = Arc::new(MockContentApi::new());
        let mut config = fixtures::test_config();
        config.watcher.enabled = false;
        let watcher_config = config.watcher.clone();
        let service = Arc::new(ContentService::new(config, api, Arc::new(MemoryCache::new())));
        let watcher = ChangeWatcher::new(service, watcher_config);

        watcher.start().await;
        assert!(!watcher.is_running());
    }
}
