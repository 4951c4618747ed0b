//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Cache store (lookups by key family)
//! - Upstream content API (requests, latency)
//! - Mirror fetcher, query engine and invalidation watcher

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Cache Metrics
// =============================================================================

/// Cache lookups by key family and result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("omecache_cache_lookups_total", "Total cache lookups"),
        &["family", "result"], // result: "hit", "miss", "corrupt"
    )
    .unwrap()
});

// =============================================================================
// Upstream Metrics
// =============================================================================

/// Upstream requests by endpoint and result.
pub static UPSTREAM_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "omecache_upstream_requests_total",
            "Total requests sent to the content API",
        ),
        &["endpoint", "result"], // result: "ok", "error"
    )
    .unwrap()
});

/// Upstream request duration in seconds.
pub static UPSTREAM_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "omecache_upstream_request_duration_seconds",
            "Duration of content API requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"],
    )
    .unwrap()
});

// =============================================================================
// Mirror Metrics
// =============================================================================

/// Full mirror fetch duration in seconds.
pub static MIRROR_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "omecache_mirror_fetch_duration_seconds",
            "Duration of full collection fetches",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["result"], // "ok", "error", "timeout"
    )
    .unwrap()
});

/// Items in the last successfully built mirror.
pub static MIRROR_ITEMS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("omecache_mirror_items", "Items in the cached mirror").unwrap()
});

/// Callers that waited on an in-flight mirror fetch instead of starting one.
pub static MIRROR_WAITERS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "omecache_mirror_waiters_total",
        "Mirror requests served by an in-flight fetch",
    )
    .unwrap()
});

// =============================================================================
// Query Metrics
// =============================================================================

/// Query resolution duration in seconds.
pub static QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "omecache_query_duration_seconds",
            "Duration of query resolution",
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["source"], // "cache", "upstream", "empty"
    )
    .unwrap()
});

// =============================================================================
// Invalidation Metrics
// =============================================================================

/// Cache entries evicted by the watcher.
pub static INVALIDATION_EVICTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "omecache_invalidation_evictions_total",
        "Cache entries evicted after upstream modifications",
    )
    .unwrap()
});

/// Full flush and rebuild cycles.
pub static FULL_FLUSHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("omecache_full_flushes_total", "Total full cache flushes"),
        &["trigger"], // "watcher", "admin"
    )
    .unwrap()
});

/// Facet refreshes triggered by the watcher deadline.
pub static FACET_REFRESHES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "omecache_facet_refreshes_total",
        "Scheduled facet cache rebuilds",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Cache
        Box::new(CACHE_LOOKUPS.clone()),
        // Upstream
        Box::new(UPSTREAM_REQUESTS.clone()),
        Box::new(UPSTREAM_REQUEST_DURATION.clone()),
        // Mirror
        Box::new(MIRROR_FETCH_DURATION.clone()),
        Box::new(MIRROR_ITEMS.clone()),
        Box::new(MIRROR_WAITERS.clone()),
        // Query
        Box::new(QUERY_DURATION.clone()),
        // Invalidation
        Box::new(INVALIDATION_EVICTIONS.clone()),
        Box::new(FULL_FLUSHES.clone()),
        Box::new(FACET_REFRESHES.clone()),
    ]
}
