//! Prometheus metrics for observability.
//!
//! This module provides the HTTP-side metrics of the proxy and the registry
//! that also exposes the core engine metrics:
//! - HTTP request metrics (latency, counts, in-flight)
//! - Admin authentication failures
//! - Watcher state (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "omecache_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("omecache_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "omecache_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Rejected admin requests.
pub static ADMIN_AUTH_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "omecache_admin_auth_failures_total",
            "Total rejected admin requests",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Watcher Metrics (collected dynamically)
// =============================================================================

/// Watcher running state (1 = running, 0 = stopped).
pub static WATCHER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "omecache_watcher_running",
        "Whether the change watcher is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Seconds left on the cached filters entry.
pub static FILTERS_TTL_REMAINING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "omecache_filters_ttl_remaining_seconds",
        "Remaining lifetime of the cached facet set",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(ADMIN_AUTH_FAILURES.clone()))
        .unwrap();

    // Watcher
    registry
        .register(Box::new(WATCHER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(FILTERS_TTL_REMAINING.clone()))
        .unwrap();

    // Core metrics (cache, upstream, mirror, query, invalidation)
    for metric in omecache_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    WATCHER_RUNNING.set(if state.watcher().is_running() { 1 } else { 0 });

    let ttl = state
        .service()
        .cache()
        .ttl(omecache_core::cache::keys::FILTERS)
        .await;
    FILTERS_TTL_REMAINING.set(match ttl {
        Ok(Some(remaining)) => remaining.as_secs() as i64,
        _ => 0,
    });
}

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace ids and slugs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = NUMERIC_SEGMENT.replace_all(path, "/{id}$1").into_owned();
    if result
        .strip_prefix("/api/v1/pages/")
        .is_some_and(|slug| !slug.is_empty())
    {
        return "/api/v1/pages/{slug}".to_string();
    }
    result
}
