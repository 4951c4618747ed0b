//! Omeka-S content API integration.
//!
//! The proxy never writes upstream; it only lists items, fetches single
//! items, media and site pages.

mod client;
mod types;

pub use client::OmekaClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the content API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API answered with a non-success status; the status is forwarded to clients.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (bad base URL, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl UpstreamError {
    /// Upstream HTTP status, when the API produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::ApiError { status, .. } => Some(*status),
            UpstreamError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Read-only view of the content API.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// `GET /items` with the given parameters. An empty page ends pagination.
    async fn list_items(&self, request: &ItemsRequest) -> Result<Vec<RawItem>, UpstreamError>;

    /// `GET /items/{id}`.
    async fn get_item(&self, id: u64) -> Result<RawItem, UpstreamError>;

    /// `GET /media?id=a,b,c`.
    async fn get_media(&self, ids: &[u64]) -> Result<Vec<RawMedia>, UpstreamError>;

    /// `GET /site_pages?site=&slug=`.
    async fn get_site_pages(
        &self,
        site: &str,
        slug: &str,
    ) -> Result<Vec<RawSitePage>, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_carries_status() {
        let err = UpstreamError::ApiError {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "API error: 404 - not found");
    }

    #[test]
    fn test_parse_error_has_no_status() {
        let err = UpstreamError::ParseError("bad json".to_string());
        assert_eq!(err.status(), None);
    }
}
