//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! over a `ContentService` backed by the mock content API, enabling route
//! tests without a running Omeka-S instance.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use omecache_core::{
    testing::MockContentApi, ChangeWatcher, Config, ContentService, MemoryCache,
};
use omecache_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use omecache_core::testing::fixtures;

/// Admin key configured by [`TestFixture::new`].
pub const ADMIN_KEY: &str = "test-admin-key";

/// Test fixture for API testing with a mock upstream.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_counts() {
///     let fixture = TestFixture::new().await;
///     fixture.api.add_item(fixtures::object(1, "Scroll")).await;
///
///     let response = fixture.get("/api/v1/counts").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock content API - configure items, pages and failures
    pub api: Arc<MockContentApi>,
    /// The service behind the router
    pub service: Arc<ContentService>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with the admin routes enabled.
    pub async fn new() -> Self {
        let mut config = fixtures::test_config();
        config.admin.api_key = Some(ADMIN_KEY.to_string());
        Self::with_config(config).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(config: Config) -> Self {
        let api = Arc::new(MockContentApi::new());
        let service = Arc::new(ContentService::new(
            config.clone(),
            api.clone(),
            Arc::new(MemoryCache::new()),
        ));
        let watcher = Arc::new(ChangeWatcher::new(
            Arc::clone(&service),
            config.watcher.clone(),
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&service), watcher));
        let router = create_router(state);

        Self {
            router,
            api,
            service,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with the admin key.
    pub async fn post_admin(&self, path: &str) -> TestResponse {
        self.request("POST", path, Some(ADMIN_KEY)).await
    }

    /// Send a GET request with the admin key.
    pub async fn get_admin(&self, path: &str) -> TestResponse {
        self.request("GET", path, Some(ADMIN_KEY)).await
    }

    /// Send a POST request without credentials.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, key: Option<&str>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        if let Some(key) = key {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", key));
        }
        let request = request_builder.body(Body::empty()).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into_owned()))
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
