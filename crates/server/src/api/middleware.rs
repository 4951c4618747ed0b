//! Admin authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::{
    normalize_path, ADMIN_AUTH_FAILURES, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Guards the admin routes with the configured admin key.
///
/// The key is accepted in either `Authorization: Bearer <key>` or
/// `X-API-Key: <key>`. Without a configured key the admin routes answer 404.
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.admin_key() else {
        ADMIN_AUTH_FAILURES.with_label_values(&["disabled"]).inc();
        return Err(StatusCode::NOT_FOUND);
    };

    match extract_key(request.headers()) {
        Some(provided) if constant_time_eq(provided.as_bytes(), expected.as_bytes()) => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            ADMIN_AUTH_FAILURES
                .with_label_values(&["invalid_credentials"])
                .inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            ADMIN_AUTH_FAILURES
                .with_label_values(&["not_authenticated"])
                .inc();
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

fn extract_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(key) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
        {
            return Some(key);
        }
    }
    headers.get("x-api-key").and_then(|v| v.to_str().ok())
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, middleware, routing::get, Router};
    use omecache_core::{
        testing::{fixtures, MockContentApi},
        ChangeWatcher, ContentService, MemoryCache,
    };
    use tower::ServiceExt;

    async fn dummy_handler() -> &'static str {
        "OK"
    }

    fn create_test_state(api_key: Option<&str>) -> Arc<AppState> {
        let mut config = fixtures::test_config();
        config.admin.api_key = api_key.map(str::to_string);

        let service = Arc::new(ContentService::new(
            config.clone(),
            Arc::new(MockContentApi::new()),
            Arc::new(MemoryCache::new()),
        ));
        let watcher = Arc::new(ChangeWatcher::new(
            Arc::clone(&service),
            config.watcher.clone(),
        ));
        Arc::new(AppState::new(config, service, watcher))
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/test", get(dummy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), admin_middleware))
            .with_state(state)
    }

    async fn status_for(state: Arc<AppState>, header: Option<(&str, &str)>) -> StatusCode {
        let mut request = Request::builder().uri("/test");
        if let Some((name, value)) = header {
            request = request.header(name, value);
        }
        let response = app(state)
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn test_admin_disabled_without_key() {
        let state = create_test_state(None);
        assert_eq!(
            status_for(state, Some((header::AUTHORIZATION.as_str(), "Bearer anything"))).await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_bearer_key_valid() {
        let state = create_test_state(Some("secret-key"));
        assert_eq!(
            status_for(state, Some((header::AUTHORIZATION.as_str(), "Bearer secret-key"))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_bearer_key_invalid() {
        let state = create_test_state(Some("secret-key"));
        assert_eq!(
            status_for(state, Some((header::AUTHORIZATION.as_str(), "Bearer wrong-key"))).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_key_missing() {
        let state = create_test_state(Some("secret-key"));
        assert_eq!(status_for(state, None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_x_api_key_header() {
        let state = create_test_state(Some("secret-key"));
        assert_eq!(
            status_for(state, Some(("X-API-Key", "secret-key"))).await,
            StatusCode::OK
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}
