//! Collection read API handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use omecache_core::{
    Counts, FacetEntry, FacetSet, Item, ItemDetails, Page, Query as ItemQuery, QueryOptions,
    QueryResult,
};

use super::ApiError;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Post-processing switches; unset ones keep the route's defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionParams {
    pub append_creators: Option<bool>,
    pub remove_creators: Option<bool>,
    pub exclude_parts: Option<bool>,
}

impl OptionParams {
    pub fn apply(&self, defaults: QueryOptions) -> QueryOptions {
        QueryOptions {
            append_creators: self.append_creators.unwrap_or(defaults.append_creators),
            remove_creators: self.remove_creators.unwrap_or(defaults.remove_creators),
            exclude_parts: self.exclude_parts.unwrap_or(defaults.exclude_parts),
        }
    }
}

/// Query parameters carrying only a language.
#[derive(Debug, Default, Deserialize)]
pub struct LangParams {
    pub lang: Option<String>,
}

impl LangParams {
    fn resolve<'a>(&'a self, state: &'a AppState) -> &'a str {
        self.lang.as_deref().unwrap_or(state.default_language())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Top-level listing, filtered and searched.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemQuery>,
    Query(options): Query<OptionParams>,
) -> Result<Json<QueryResult>, ApiError> {
    let options = options.apply(QueryOptions::listing());
    let result = state.service().query_items(None, &query, options).await?;
    Ok(Json(result))
}

/// Items linking to `id`.
pub async fn related_items(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Query(query): Query<ItemQuery>,
    Query(options): Query<OptionParams>,
) -> Result<Json<QueryResult>, ApiError> {
    let options = options.apply(QueryOptions::related());
    let result = state.service().query_items(Some(id), &query, options).await?;
    Ok(Json(result))
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<ItemDetails>, ApiError> {
    Ok(Json(state.service().get_item_details(id).await?))
}

pub async fn get_filters(State(state): State<Arc<AppState>>) -> Result<Json<FacetSet>, ApiError> {
    Ok(Json(state.service().get_filters(false).await?))
}

pub async fn get_filter(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<FacetEntry>>, ApiError> {
    Ok(Json(state.service().get_filter_by_type(&kind).await?))
}

pub async fn get_counts(State(state): State<Arc<AppState>>) -> Result<Json<Counts>, ApiError> {
    Ok(Json(state.service().get_counts(false).await?))
}

pub async fn get_creators(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LangParams>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let lang = params.resolve(&state);
    Ok(Json(state.service().get_creators(lang).await?))
}

pub async fn get_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<LangParams>,
) -> Result<Json<Page>, ApiError> {
    let lang = params.resolve(&state);
    Ok(Json(state.service().get_page(&slug, lang).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_params_override_defaults() {
        let params = OptionParams {
            exclude_parts: Some(false),
            remove_creators: Some(true),
            ..Default::default()
        };
        let options = params.apply(QueryOptions::listing());
        assert!(!options.exclude_parts);
        assert!(options.remove_creators);
        assert!(!options.append_creators);

        let options = OptionParams::default().apply(QueryOptions::related());
        assert_eq!(options, QueryOptions::related());
    }
}
