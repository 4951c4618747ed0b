//! Errors surfaced by the engine to the route layer.

use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;
use crate::upstream::UpstreamError;

/// Errors returned by [`crate::ContentService`] and the engines behind it.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The content API failed; carries its status when it produced one.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// The full collection fetch did not finish within the safety bound.
    #[error("Mirror fetch timed out after {0:?}")]
    MirrorTimeout(Duration),

    #[error("Unknown facet: {0}")]
    UnknownFacet(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Upstream HTTP status to mirror back to clients, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ServiceError::Upstream(e) => e.status(),
            _ => None,
        }
    }
}
