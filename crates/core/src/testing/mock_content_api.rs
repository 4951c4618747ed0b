//! Mock content API for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::upstream::{
    ContentApi, ItemsRequest, Joiner, PropertyFilter, PropertyMatch, RawItem, RawMedia,
    RawSitePage, SortOrder, UpstreamError,
};

/// A recorded API call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    ListItems(ItemsRequest),
    GetItem(u64),
    GetMedia(Vec<u64>),
    GetSitePages { site: String, slug: String },
}

/// Mock implementation of the ContentApi trait.
///
/// Holds an in-memory collection and answers `list_items` the way Omeka-S
/// does for the parameters this crate sends:
/// - `id` restricts to the given ids
/// - `property[i]` blocks (`res` / `in`) combined with their joiners
/// - `fulltext_search` matches any term anywhere in the record
/// - sorting by `id`, `created` or `modified`, then `page` / `per_page`
///
/// # Example
///
/// ```rust,ignore
/// use omecache_core::testing::{fixtures, MockContentApi};
///
/// let api = MockContentApi::new();
/// api.add_item(fixtures::creator(1, "Wu Zhen")).await;
/// api.fail_list_call(2, 503).await;
/// ```
#[derive(Debug)]
pub struct MockContentApi {
    /// Items in insertion order.
    items: Arc<RwLock<Vec<RawItem>>>,
    /// Media by id.
    media: Arc<RwLock<HashMap<u64, RawMedia>>>,
    /// Site pages by (site, slug).
    pages: Arc<RwLock<HashMap<(String, String), Vec<RawSitePage>>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// Failures keyed by 1-based `list_items` call number.
    list_failures: Arc<RwLock<HashMap<usize, u16>>>,
    /// If set, the next operation will fail with this status.
    next_error: Arc<RwLock<Option<u16>>>,
    /// Delay applied to every `list_items` call.
    list_delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockContentApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContentApi {
    /// Create a new empty mock API.
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            media: Arc::new(RwLock::new(HashMap::new())),
            pages: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            list_failures: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            list_delay: Arc::new(RwLock::new(None)),
        }
    }

    // =========================================================================
    // Content Configuration
    // =========================================================================

    /// Add an item, replacing any item with the same id.
    pub async fn add_item(&self, item: RawItem) {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Replace the whole collection.
    pub async fn set_items(&self, items: Vec<RawItem>) {
        *self.items.write().await = items;
    }

    /// Remove an item by id.
    pub async fn remove_item(&self, id: u64) {
        self.items.write().await.retain(|i| i.id != id);
    }

    /// Add a media record.
    pub async fn add_media(&self, media: RawMedia) {
        self.media.write().await.insert(media.id, media);
    }

    /// Add a site page reachable by `site` and its slug.
    pub async fn add_page(&self, site: &str, page: RawSitePage) {
        self.pages
            .write()
            .await
            .entry((site.to_string(), page.slug.clone()))
            .or_default()
            .push(page);
    }

    /// Delay every `list_items` call, to widen race windows.
    pub async fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.write().await = Some(delay);
    }

    // =========================================================================
    // Call Recording
    // =========================================================================

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Get the recorded `list_items` requests.
    pub async fn list_requests(&self) -> Vec<ItemsRequest> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedCall::ListItems(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `list_items` calls so far.
    pub async fn list_call_count(&self) -> usize {
        self.list_requests().await.len()
    }

    /// Total number of calls so far.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Make the `n`th `list_items` call (1-based, counting from now on
    /// including earlier calls) fail with `status`.
    pub async fn fail_list_call(&self, n: usize, status: u16) {
        self.list_failures.write().await.insert(n, status);
    }

    /// Configure the next operation to fail with the given status.
    pub async fn set_next_error(&self, status: u16) {
        *self.next_error.write().await = Some(status);
    }

    /// Clear any pending error.
    pub async fn clear_errors(&self) {
        *self.next_error.write().await = None;
        self.list_failures.write().await.clear();
    }

    async fn take_error(&self) -> Option<UpstreamError> {
        self.next_error
            .write()
            .await
            .take()
            .map(|status| api_error(status, "injected failure"))
    }

    async fn record(&self, call: RecordedCall) -> usize {
        let mut calls = self.calls.write().await;
        calls.push(call);
        calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::ListItems(_)))
            .count()
    }
}

fn api_error(status: u16, message: &str) -> UpstreamError {
    UpstreamError::ApiError {
        status,
        message: message.to_string(),
    }
}

fn matches_filter(item: &RawItem, filter: &PropertyFilter) -> bool {
    match filter.kind {
        PropertyMatch::Resource => filter
            .text
            .parse()
            .map(|id| item.links_to(&filter.property, id))
            .unwrap_or(false),
        PropertyMatch::Contains => {
            let needle = filter.text.to_lowercase();
            item.literals(&filter.property)
                .iter()
                .any(|v| v.value.to_lowercase().contains(&needle))
        }
    }
}

fn matches_properties(item: &RawItem, filters: &[PropertyFilter]) -> bool {
    let mut blocks = filters.iter();
    let Some(first) = blocks.next() else {
        return true;
    };
    blocks.fold(matches_filter(item, first), |acc, filter| match filter.joiner {
        Joiner::And => acc && matches_filter(item, filter),
        Joiner::Or => acc || matches_filter(item, filter),
    })
}

fn matches_fulltext(item: &RawItem, search: &str) -> bool {
    let haystack = serde_json::to_string(&item.fields)
        .unwrap_or_default()
        .to_lowercase();
    search
        .split_whitespace()
        .any(|term| haystack.contains(&term.to_lowercase()))
}

fn in_item_set(item: &RawItem, set: u64) -> bool {
    item.values("o:item_set")
        .iter()
        .any(|s| s.get("o:id").and_then(serde_json::Value::as_u64) == Some(set))
}

#[async_trait]
impl ContentApi for MockContentApi {
    async fn list_items(&self, request: &ItemsRequest) -> Result<Vec<RawItem>, UpstreamError> {
        let call_number = self.record(RecordedCall::ListItems(request.clone())).await;

        let delay = *self.list_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if let Some(status) = self.list_failures.read().await.get(&call_number) {
            return Err(api_error(*status, "injected page failure"));
        }

        let items = self.items.read().await;
        let mut matched: Vec<RawItem> = items
            .iter()
            .filter(|i| request.ids.is_empty() || request.ids.contains(&i.id))
            .filter(|i| matches_properties(i, &request.properties))
            .filter(|i| {
                request
                    .fulltext_search
                    .as_deref()
                    .map_or(true, |s| matches_fulltext(i, s))
            })
            .filter(|i| request.item_set_id.map_or(true, |s| in_item_set(i, s)))
            .cloned()
            .collect();

        match request.sort_by.as_deref() {
            Some("created") => matched.sort_by_key(|i| i.created()),
            Some("modified") => matched.sort_by_key(|i| i.modified()),
            _ => matched.sort_by_key(|i| i.id),
        }
        if request.sort_order == Some(SortOrder::Desc) {
            matched.reverse();
        }

        let per_page = request.per_page.max(1) as usize;
        let skip = (request.page.max(1) as usize - 1) * per_page;
        Ok(matched.into_iter().skip(skip).take(per_page).collect())
    }

    async fn get_item(&self, id: u64) -> Result<RawItem, UpstreamError> {
        self.record(RecordedCall::GetItem(id)).await;
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.items
            .read()
            .await
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| api_error(404, "Not Found"))
    }

    async fn get_media(&self, ids: &[u64]) -> Result<Vec<RawMedia>, UpstreamError> {
        self.record(RecordedCall::GetMedia(ids.to_vec())).await;
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let media = self.media.read().await;
        Ok(ids.iter().filter_map(|id| media.get(id).cloned()).collect())
    }

    async fn get_site_pages(
        &self,
        site: &str,
        slug: &str,
    ) -> Result<Vec<RawSitePage>, UpstreamError> {
        self.record(RecordedCall::GetSitePages {
            site: site.to_string(),
            slug: slug.to_string(),
        })
        .await;
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        Ok(self
            .pages
            .read()
            .await
            .get(&(site.to_string(), slug.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
