//! Mapping of engine errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use omecache_core::{ServiceError, UpstreamError};
use serde::Serialize;
use tracing::warn;

/// Error body returned by every route.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`ServiceError`] at the route boundary.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status code for the wrapped error. Upstream statuses are mirrored.
    pub fn status(&self) -> StatusCode {
        if let Some(status) = self.0.upstream_status() {
            return StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
        }
        match &self.0 {
            ServiceError::Upstream(UpstreamError::NotConfigured(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServiceError::MirrorTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::UnknownFacet(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed with {}: {}", status, self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn status_of(err: ServiceError) -> StatusCode {
        ApiError(err).status()
    }

    #[test]
    fn test_upstream_status_is_mirrored() {
        let err = UpstreamError::ApiError {
            status: 404,
            message: "no such item".to_string(),
        };
        assert_eq!(status_of(err.into()), StatusCode::NOT_FOUND);

        let err = UpstreamError::ApiError {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(status_of(err.into()), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_local_errors() {
        assert_eq!(
            status_of(UpstreamError::ParseError("bad json".to_string()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ServiceError::MirrorTimeout(Duration::from_secs(600))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ServiceError::UnknownFacet("color".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::NotFound("page".to_string())),
            StatusCode::NOT_FOUND
        );
    }
}
