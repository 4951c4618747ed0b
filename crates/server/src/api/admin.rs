//! Maintenance endpoints behind the admin key.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use omecache_core::{cache::keys, PreloadSummary, WatcherStatus};
use tracing::info;

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatusResponse {
    pub watcher: WatcherStatus,
    /// Remaining lifetime of the cached facet set.
    pub filters_ttl_secs: Option<u64>,
}

/// Flush every cache entry and rebuild the mirror, facets and counts.
pub async fn flush(State(state): State<Arc<AppState>>) -> Result<Json<PreloadSummary>, ApiError> {
    info!("Admin flush requested");
    let summary = state.service().flush_and_preload("admin").await?;
    Ok(Json(summary))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminStatusResponse>, ApiError> {
    let ttl = state
        .service()
        .cache()
        .ttl(keys::FILTERS)
        .await
        .map_err(omecache_core::ServiceError::from)?;

    Ok(Json(AdminStatusResponse {
        watcher: state.watcher().status().await,
        filters_ttl_secs: ttl.map(|d| d.as_secs()),
    }))
}
