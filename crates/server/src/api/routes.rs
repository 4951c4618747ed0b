use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{admin, handlers, items};
use super::middleware::{admin_middleware, metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Admin routes (admin key required)
    let admin_routes = Router::new()
        .route("/flush", post(admin::flush))
        .route("/status", get(admin::status))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            admin_middleware,
        ));

    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Items
        .route("/items", get(items::list_items))
        .route("/items/{id}", get(items::get_item))
        .route("/items/{id}/related", get(items::related_items))
        // Facets and counts
        .route("/filters", get(items::get_filters))
        .route("/filters/{kind}", get(items::get_filter))
        .route("/counts", get(items::get_counts))
        .route("/creators", get(items::get_creators))
        // Site pages
        .route("/pages/{slug}", get(items::get_page))
        .nest("/admin", admin_routes)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
