//! Normalized, client-facing content types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::localizable::Localizable;

// ============================================================================
// Item Types
// ============================================================================

/// Category of an item, resolved from its resource template or class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    Creator,
    ObjectType,
    Theme,
    Era,
    /// Fallback for anything not matching a configured category.
    Object,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Creator => "creator",
            ItemKind::ObjectType => "objectType",
            ItemKind::Theme => "theme",
            ItemKind::Era => "era",
            ItemKind::Object => "object",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creator" => Ok(ItemKind::Creator),
            "objectType" => Ok(ItemKind::ObjectType),
            "theme" => Ok(ItemKind::Theme),
            "era" => Ok(ItemKind::Era),
            "object" => Ok(ItemKind::Object),
            other => Err(format!("unknown item type: {}", other)),
        }
    }
}

/// A resolved link to another item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedRef {
    pub id: u64,
    pub title: Localizable,
}

/// Links grouped by category. Only targets present in the facet set are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedProperties {
    #[serde(default)]
    pub creator: Vec<LinkedRef>,
    #[serde(default)]
    pub object_type: Vec<LinkedRef>,
    #[serde(default)]
    pub theme: Vec<LinkedRef>,
    #[serde(default)]
    pub era: Vec<LinkedRef>,
}

impl LinkedProperties {
    pub fn get(&self, kind: ItemKind) -> &[LinkedRef] {
        match kind {
            ItemKind::Creator => &self.creator,
            ItemKind::ObjectType => &self.object_type,
            ItemKind::Theme => &self.theme,
            ItemKind::Era => &self.era,
            ItemKind::Object => &[],
        }
    }
}

/// A normalized item.
///
/// `description` and `text` are only present on item details, or while a
/// search result is being annotated with snippets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: u64,
    pub title: Localizable,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_alt: Option<Localizable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default)]
    pub media: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub is_part: bool,
    #[serde(default)]
    pub linked_properties: LinkedProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Localizable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Localizable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snippets: Vec<String>,
}

impl Item {
    pub fn is_creator(&self) -> bool {
        self.kind == ItemKind::Creator
    }

    /// Drop the long-form fields staged for snippet extraction.
    pub fn strip_staged_text(&mut self) {
        self.description = None;
        self.text = None;
    }
}

// ============================================================================
// Detail Types
// ============================================================================

/// An attached media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Localizable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// A single item with its long-form text, media and reverse links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default)]
    pub media_items: Vec<Media>,
    /// Items that link to this one.
    #[serde(default)]
    pub related: Vec<u64>,
}

/// A site page rendered to HTML and plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: u64,
    pub slug: String,
    pub lang: String,
    pub title: String,
    pub html: String,
    pub text: String,
}
