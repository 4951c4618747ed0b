//! Query engine integration tests.
//!
//! These tests drive `ContentService::query_items` against the mock content
//! API: canonical caching, pagination signals, search annotation, parent
//! scoping and creator cross-referencing.

use std::sync::Arc;

use omecache_core::{
    testing::{fixtures, fixtures::ItemBuilder, MockContentApi},
    upstream::RawItem,
    Config, ContentService, Counts, ItemKind, MemoryCache, Query, QueryOptions,
};

struct TestHarness {
    api: Arc<MockContentApi>,
    service: ContentService,
}

impl TestHarness {
    async fn new(items: Vec<RawItem>) -> Self {
        Self::with_config(fixtures::test_config(), items).await
    }

    async fn with_config(config: Config, items: Vec<RawItem>) -> Self {
        let api = Arc::new(MockContentApi::new());
        api.set_items(items).await;
        let service = ContentService::new(config, api.clone(), Arc::new(MemoryCache::new()));
        Self { api, service }
    }
}

fn creator(id: u64, en: &str, zh: &str, works: &[u64]) -> RawItem {
    ItemBuilder::new(id)
        .template(fixtures::CREATOR_TEMPLATE)
        .title_in(en, "en")
        .title_in(zh, "zh")
        .reverse(works)
        .build()
}

/// Three painters, one object type and four works, one of them a part.
fn collection() -> Vec<RawItem> {
    vec![
        creator(1, "Wu Zhen", "吴镇", &[100, 101]),
        creator(2, "Ni Zan", "倪瓒", &[100, 102]),
        creator(3, "Huang Gongwang", "黄公望", &[]),
        fixtures::object_type(20, "Painting"),
        ItemBuilder::new(100)
            .title("Ink Bamboo")
            .description("Bamboo in ink, bamboo in wind, bamboo in rain, bamboo in snow")
            .creators(&[1, 2])
            .object_types(&[20])
            .date("1350")
            .created("2024-01-01T00:00:00+00:00")
            .build(),
        ItemBuilder::new(101)
            .title("Fishermen")
            .creators(&[1])
            .date("1342")
            .created("2024-01-03T00:00:00+00:00")
            .build(),
        ItemBuilder::new(102)
            .title("Six Gentlemen")
            .creators(&[2])
            .date("1345")
            .created("2024-01-02T00:00:00+00:00")
            .build(),
        ItemBuilder::new(103)
            .title("Album leaf")
            .creators(&[1])
            .part_of(101)
            .created("2024-01-04T00:00:00+00:00")
            .build(),
    ]
}

fn ids(items: &[omecache_core::Item]) -> Vec<u64> {
    items.iter().map(|i| i.id).collect()
}

#[tokio::test]
async fn test_base_listing() {
    let h = TestHarness::new(collection()).await;

    let result = h
        .service
        .query_items(None, &Query::in_language("en"), QueryOptions::listing())
        .await
        .unwrap();

    // creators by title, then objects in upstream creation order without the
    // part or the object type record
    assert_eq!(ids(&result.items), vec![3, 2, 1, 101, 102, 100]);
    assert!(!result.has_next_page);
    assert!(result.filters.is_none());
    assert_eq!(result.counts, Counts { creators: 3, objects: 3 });

    let request = &h.api.list_requests().await[0];
    assert_eq!(request.per_page, 20);
    assert_eq!(request.sort_by.as_deref(), Some("created"));
}

#[tokio::test]
async fn test_single_page_counts_match_global_counts() {
    let h = TestHarness::new(vec![
        fixtures::creator(1, "Wu Zhen"),
        fixtures::object_type(20, "Painting"),
        fixtures::theme(30, "Bamboo"),
        ItemBuilder::new(100)
            .title("Ink Bamboo")
            .creators(&[1])
            .object_types(&[20])
            .themes(&[30])
            .build(),
        ItemBuilder::new(101).title("Fishermen").creators(&[1]).build(),
        ItemBuilder::new(102).title("Album leaf").part_of(101).build(),
    ])
    .await;

    for options in [QueryOptions::listing(), QueryOptions::default()] {
        let page = h
            .service
            .query_items(None, &Query::default(), options)
            .await
            .unwrap();
        assert!(!page.has_next_page);
        assert_eq!(page.counts, h.service.get_counts(false).await.unwrap());
        assert_eq!(page.counts, Counts { creators: 1, objects: 2 });
        assert!(page
            .items
            .iter()
            .all(|i| matches!(i.kind, ItemKind::Creator | ItemKind::Object)));
    }
}

#[tokio::test]
async fn test_has_next_page_at_exact_limit() {
    let objects = |n: u64| -> Vec<RawItem> {
        (1..=n).map(|id| fixtures::object(id, "Scroll")).collect()
    };

    let exact = TestHarness::new(objects(20)).await;
    let result = exact
        .service
        .query_items(None, &Query::default(), QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(result.items.len(), 20);
    assert!(result.has_next_page);

    let short = TestHarness::new(objects(19)).await;
    let result = short
        .service
        .query_items(None, &Query::default(), QueryOptions::default())
        .await
        .unwrap();
    assert!(!result.has_next_page);
    assert_eq!(result.counts, Counts { creators: 0, objects: 19 });
}

#[tokio::test]
async fn test_truncated_page_uses_global_counts() {
    let h = TestHarness::new((1..=21).map(|id| fixtures::object(id, "Scroll")).collect()).await;

    let result = h
        .service
        .query_items(None, &Query::default(), QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 20);
    assert_eq!(result.counts, Counts { creators: 0, objects: 21 });
}

#[tokio::test]
async fn test_filter_order_shares_cache_entry() {
    let h = TestHarness::new(collection()).await;
    let first = Query {
        creator: Some("2,1".to_string()),
        ..Default::default()
    };
    let second = Query {
        creator: Some(" 1, 2".to_string()),
        ..Default::default()
    };

    let a = h
        .service
        .query_items(None, &first, QueryOptions::default())
        .await
        .unwrap();
    let calls = h.api.call_count().await;
    let b = h
        .service
        .query_items(None, &second, QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(h.api.call_count().await, calls);
    assert!(a.filters.is_some());
    assert_eq!(h.api.list_requests().await[0].per_page, 1000);
}

#[tokio::test]
async fn test_search_annotates_snippets() {
    let mut config = fixtures::test_config();
    config.query.snippet_radius = 5;
    let h = TestHarness::with_config(config, collection()).await;
    let query = Query {
        search: Some("a, 竹, bamboo".to_string()),
        ..Default::default()
    };

    let result = h
        .service
        .query_items(None, &query, QueryOptions::default())
        .await
        .unwrap();

    let request = &h.api.list_requests().await[0];
    assert_eq!(request.fulltext_search.as_deref(), Some("竹 bamboo"));
    assert_eq!(ids(&result.items), vec![100]);

    let item = &result.items[0];
    assert_eq!(item.snippets.len(), 3);
    assert_eq!(item.snippets[0], "Ink Bamboo");
    assert!(item.description.is_none());
    assert!(item.text.is_none());
    assert!(result.filters.is_some());
}

#[tokio::test]
async fn test_parent_scope_appends_creators() {
    let h = TestHarness::new(collection()).await;

    let result = h
        .service
        .query_items(Some(1), &Query::in_language("en"), QueryOptions::related())
        .await
        .unwrap();

    // Ni Zan is linked from "Ink Bamboo"; Wu Zhen is the parent
    assert_eq!(ids(&result.items), vec![2, 101, 100]);
    assert_eq!(result.counts, Counts { creators: 1, objects: 2 });

    let scoped = result.filters.unwrap();
    let creators: Vec<(Option<u64>, u64)> = scoped.creator.iter().map(|e| (e.id, e.count)).collect();
    assert_eq!(creators, vec![(Some(1), 2), (Some(2), 1)]);

    let request = h
        .api
        .list_requests()
        .await
        .into_iter()
        .find(|r| !r.ids.is_empty())
        .unwrap();
    assert_eq!(request.ids, vec![100, 101]);
}

#[tokio::test]
async fn test_parent_scope_without_creators() {
    let h = TestHarness::new(collection()).await;
    let options = QueryOptions {
        remove_creators: true,
        ..QueryOptions::related()
    };

    let result = h
        .service
        .query_items(Some(2), &Query::in_language("en"), options)
        .await
        .unwrap();

    // objects ordered by title when scoped
    assert_eq!(ids(&result.items), vec![100, 102]);
}

#[tokio::test]
async fn test_empty_scope_skips_upstream_listing() {
    let h = TestHarness::new(collection()).await;

    let result = h
        .service
        .query_items(Some(3), &Query::default(), QueryOptions::related())
        .await
        .unwrap();

    assert!(result.items.is_empty());
    assert!(!result.has_next_page);
    assert_eq!(h.api.list_call_count().await, 0);
}

#[tokio::test]
async fn test_upstream_failure_is_not_cached() {
    let h = TestHarness::new(collection()).await;
    h.api.set_next_error(503).await;

    let err = h
        .service
        .query_items(None, &Query::default(), QueryOptions::listing())
        .await
        .unwrap_err();
    assert_eq!(err.upstream_status(), Some(503));

    let fresh = h
        .service
        .query_items(None, &Query::default(), QueryOptions::listing())
        .await
        .unwrap();
    let cached = h
        .service
        .query_items(None, &Query::default(), QueryOptions::listing())
        .await
        .unwrap();
    assert_eq!(fresh, cached);
}

#[tokio::test]
async fn test_creator_collation_follows_language() {
    let h = TestHarness::new(collection()).await;

    let zh = h
        .service
        .query_items(None, &Query::in_language("zh"), QueryOptions::listing())
        .await
        .unwrap();

    // huáng, ní, wú
    assert_eq!(ids(&zh.items)[..3], [3, 2, 1]);
    assert_eq!(zh.items[0].title.resolve("zh"), "黄公望");
}
