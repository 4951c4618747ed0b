//! Facet types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::{ItemKind, Localizable};

/// A filterable dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetKind {
    Year,
    Creator,
    ObjectType,
    Theme,
    Era,
}

impl FacetKind {
    /// Facets backed by links to other items, in canonical query order.
    pub const LINKED: [FacetKind; 4] = [
        FacetKind::Creator,
        FacetKind::ObjectType,
        FacetKind::Theme,
        FacetKind::Era,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FacetKind::Year => "year",
            FacetKind::Creator => "creator",
            FacetKind::ObjectType => "objectType",
            FacetKind::Theme => "theme",
            FacetKind::Era => "era",
        }
    }

    /// The item category whose members are this facet's values.
    pub fn item_kind(&self) -> Option<ItemKind> {
        match self {
            FacetKind::Year => None,
            FacetKind::Creator => Some(ItemKind::Creator),
            FacetKind::ObjectType => Some(ItemKind::ObjectType),
            FacetKind::Theme => Some(ItemKind::Theme),
            FacetKind::Era => Some(ItemKind::Era),
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(FacetKind::Year),
            "creator" => Ok(FacetKind::Creator),
            "objectType" => Ok(FacetKind::ObjectType),
            "theme" => Ok(FacetKind::Theme),
            "era" => Ok(FacetKind::Era),
            other => Err(other.to_string()),
        }
    }
}

/// One facet value and how many items carry it.
///
/// Linked facets set `id` and `title`; the year facet sets `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Localizable>,
    pub count: u64,
}

impl FacetEntry {
    pub fn linked(id: u64, title: Localizable, count: u64) -> Self {
        Self {
            id: Some(id),
            value: None,
            title: Some(title),
            count,
        }
    }

    pub fn year(value: impl Into<String>, count: u64) -> Self {
        Self {
            id: None,
            value: Some(value.into()),
            title: None,
            count,
        }
    }
}

/// All facets, each sorted by descending count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSet {
    #[serde(default)]
    pub year: Vec<FacetEntry>,
    #[serde(default)]
    pub creator: Vec<FacetEntry>,
    #[serde(default)]
    pub object_type: Vec<FacetEntry>,
    #[serde(default)]
    pub theme: Vec<FacetEntry>,
    #[serde(default)]
    pub era: Vec<FacetEntry>,
}

impl FacetSet {
    pub fn get(&self, kind: FacetKind) -> &[FacetEntry] {
        match kind {
            FacetKind::Year => &self.year,
            FacetKind::Creator => &self.creator,
            FacetKind::ObjectType => &self.object_type,
            FacetKind::Theme => &self.theme,
            FacetKind::Era => &self.era,
        }
    }

    pub fn get_mut(&mut self, kind: FacetKind) -> &mut Vec<FacetEntry> {
        match kind {
            FacetKind::Year => &mut self.year,
            FacetKind::Creator => &mut self.creator,
            FacetKind::ObjectType => &mut self.object_type,
            FacetKind::Theme => &mut self.theme,
            FacetKind::Era => &mut self.era,
        }
    }

    /// Entry of a linked facet by item id.
    pub fn find(&self, kind: FacetKind, id: u64) -> Option<&FacetEntry> {
        self.get(kind).iter().find(|e| e.id == Some(id))
    }
}

/// Aggregate totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub creators: u64,
    pub objects: u64,
}
