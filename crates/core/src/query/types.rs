//! Query input and result types.

use serde::{Deserialize, Serialize};

use crate::content::Item;
use crate::facets::{Counts, FacetKind, FacetSet};

/// A structured query. Facet fields hold comma-separated values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Query {
    /// Raw comma-separated values of a facet.
    pub fn facet(&self, kind: FacetKind) -> Option<&str> {
        match kind {
            FacetKind::Year => self.year.as_deref(),
            FacetKind::Creator => self.creator.as_deref(),
            FacetKind::ObjectType => self.object_type.as_deref(),
            FacetKind::Theme => self.theme.as_deref(),
            FacetKind::Era => self.era.as_deref(),
        }
    }

    pub fn in_language(lang: &str) -> Self {
        Self {
            lang: Some(lang.to_string()),
            ..Default::default()
        }
    }
}

/// Post-processing switches for a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Append creators linked from the result's objects.
    #[serde(default)]
    pub append_creators: bool,
    /// Drop creator items from the output.
    #[serde(default)]
    pub remove_creators: bool,
    /// Leave part items out of unfiltered base listings.
    #[serde(default)]
    pub exclude_parts: bool,
}

impl QueryOptions {
    /// Options of the top-level item listing.
    pub fn listing() -> Self {
        Self {
            exclude_parts: true,
            ..Default::default()
        }
    }

    /// Options of a parent-scoped listing.
    pub fn related() -> Self {
        Self {
            append_creators: true,
            ..Default::default()
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub items: Vec<Item>,
    /// Facets scoped to this result; `None` for unfiltered queries.
    pub filters: Option<FacetSet>,
    pub has_next_page: bool,
    pub counts: Counts,
}

impl QueryResult {
    /// Result of a parent-scoped query whose parent has no linked items.
    pub fn empty_scope() -> Self {
        Self {
            items: Vec::new(),
            filters: Some(FacetSet::default()),
            has_next_page: false,
            counts: Counts::default(),
        }
    }
}
