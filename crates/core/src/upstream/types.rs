//! Raw Omeka-S resources and request parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw JSON-LD resource (item or media) as returned by the API.
///
/// Only the id is typed; everything else stays in `fields` and is read
/// through the accessors below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResource {
    #[serde(rename = "o:id")]
    pub id: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

pub type RawItem = RawResource;
pub type RawMedia = RawResource;

/// A literal property value with its optional language tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralValue<'a> {
    pub value: &'a str,
    pub language: Option<&'a str>,
}

impl RawResource {
    /// All values recorded for a vocabulary term.
    pub fn values(&self, term: &str) -> &[Value] {
        self.fields
            .get(term)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Literal values of a term, in upstream order.
    pub fn literals(&self, term: &str) -> Vec<LiteralValue<'_>> {
        self.values(term)
            .iter()
            .filter_map(|v| {
                let value = v.get("@value").and_then(Value::as_str)?;
                let language = v
                    .get("@language")
                    .and_then(Value::as_str)
                    .filter(|l| !l.is_empty());
                Some(LiteralValue { value, language })
            })
            .collect()
    }

    /// Ids of resources linked through a term, de-duplicated, in upstream order.
    pub fn linked_ids(&self, term: &str) -> Vec<u64> {
        let mut ids = Vec::new();
        for id in self
            .values(term)
            .iter()
            .filter_map(|v| v.get("value_resource_id").and_then(Value::as_u64))
        {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Whether any value of a term links to `id`.
    pub fn links_to(&self, term: &str, id: u64) -> bool {
        self.values(term)
            .iter()
            .any(|v| v.get("value_resource_id").and_then(Value::as_u64) == Some(id))
    }

    pub fn template_id(&self) -> Option<u64> {
        self.nested_id("o:resource_template")
    }

    pub fn class_id(&self) -> Option<u64> {
        self.nested_id("o:resource_class")
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.timestamp("o:created")
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.timestamp("o:modified")
    }

    /// Ids of attached media.
    pub fn media_ids(&self) -> Vec<u64> {
        self.fields
            .get("o:media")
            .and_then(Value::as_array)
            .map(|media| {
                media
                    .iter()
                    .filter_map(|m| m.get("o:id").and_then(Value::as_u64))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Display thumbnail URL of the given size ("large", "medium", "square").
    pub fn thumbnail(&self, size: &str) -> Option<&str> {
        self.fields
            .get("thumbnail_display_urls")
            .and_then(|t| t.get(size))
            .and_then(Value::as_str)
    }

    /// Ids of the items that link to this one (`@reverse`), de-duplicated.
    pub fn reverse_ids(&self) -> Vec<u64> {
        let mut ids = Vec::new();
        let Some(reverse) = self.fields.get("@reverse").and_then(Value::as_object) else {
            return ids;
        };

        for link in reverse.values().filter_map(Value::as_array).flatten() {
            let id = link
                .get("o:id")
                .and_then(Value::as_u64)
                .or_else(|| link.get("@id").and_then(Value::as_str).and_then(trailing_id));
            if let Some(id) = id {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// First string found at `key` (e.g. "o:original_url", "o:media_type").
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    fn nested_id(&self, key: &str) -> Option<u64> {
        self.fields
            .get(key)
            .and_then(|v| v.get("o:id"))
            .and_then(Value::as_u64)
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = self.fields.get(key)?;
        let text = raw
            .get("@value")
            .and_then(Value::as_str)
            .or_else(|| raw.as_str())?;
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }
}

/// "https://host/api/items/42" -> 42
fn trailing_id(url: &str) -> Option<u64> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

/// A site page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSitePage {
    #[serde(rename = "o:id")]
    pub id: u64,
    #[serde(rename = "o:slug", default)]
    pub slug: String,
    #[serde(rename = "o:title", default)]
    pub title: String,
    #[serde(rename = "o:block", default)]
    pub blocks: Vec<RawPageBlock>,
}

/// One layout block of a site page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPageBlock {
    #[serde(rename = "o:layout", default)]
    pub layout: String,
    #[serde(rename = "o:data", default)]
    pub data: Map<String, Value>,
}

impl RawPageBlock {
    /// HTML carried by an "html" block.
    pub fn html(&self) -> Option<&str> {
        self.data.get("html").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// How a property block combines with the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joiner {
    And,
    Or,
}

/// Omeka-S property query types used here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyMatch {
    /// Value links to the resource with this id.
    #[serde(rename = "res")]
    Resource,
    /// Value contains the text.
    #[serde(rename = "in")]
    Contains,
}

impl PropertyMatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyMatch::Resource => "res",
            PropertyMatch::Contains => "in",
        }
    }
}

/// One `property[i][...]` block of an items search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub joiner: Joiner,
    pub property: String,
    pub kind: PropertyMatch,
    pub text: String,
}

/// Parameters of `GET /items`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsRequest {
    pub page: u32,
    pub per_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(default)]
    pub properties: Vec<PropertyFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulltext_search: Option<String>,
    #[serde(default)]
    pub ids: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_set_id: Option<u64>,
}

impl ItemsRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            ..Default::default()
        }
    }

    pub fn sorted(mut self, by: &str, order: SortOrder) -> Self {
        self.sort_by = Some(by.to_string());
        self.sort_order = Some(order);
        self
    }

    /// The `limit` most recently modified items.
    pub fn recently_modified(limit: u32) -> Self {
        Self::new(1, limit).sorted("modified", SortOrder::Desc)
    }

    /// Query pairs in a fixed order; property blocks are numbered sequentially.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("per_page".to_string(), self.per_page.to_string()),
        ];
        if let Some(by) = &self.sort_by {
            pairs.push(("sort_by".to_string(), by.clone()));
        }
        if let Some(order) = self.sort_order {
            pairs.push(("sort_order".to_string(), order.as_str().to_string()));
        }
        for (i, filter) in self.properties.iter().enumerate() {
            if i > 0 {
                let joiner = match filter.joiner {
                    Joiner::And => "and",
                    Joiner::Or => "or",
                };
                pairs.push((format!("property[{}][joiner]", i), joiner.to_string()));
            }
            pairs.push((format!("property[{}][property]", i), filter.property.clone()));
            pairs.push((format!("property[{}][type]", i), filter.kind.as_str().to_string()));
            pairs.push((format!("property[{}][text]", i), filter.text.clone()));
        }
        if let Some(search) = &self.fulltext_search {
            pairs.push(("fulltext_search".to_string(), search.clone()));
        }
        if !self.ids.is_empty() {
            let ids: Vec<String> = self.ids.iter().map(u64::to_string).collect();
            pairs.push(("id".to_string(), ids.join(",")));
        }
        if let Some(set) = self.item_set_id {
            pairs.push(("item_set_id".to_string(), set.to_string()));
        }
        pairs
    }

    /// Percent-encoded `k=v&k=v` form of [`Self::to_query_pairs`].
    pub fn to_query_string(&self) -> String {
        encode_pairs(&self.to_query_pairs())
    }
}

/// Percent-encode and join query pairs.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_item() -> RawItem {
        serde_json::from_value(json!({
            "o:id": 42,
            "@type": ["o:Item", "bibo:Book"],
            "o:resource_template": {"@id": "https://x/api/resource_templates/3", "o:id": 3},
            "o:resource_class": {"@id": "https://x/api/resource_classes/40", "o:id": 40},
            "o:created": {"@value": "2023-04-01T10:00:00+00:00", "@type": "http://www.w3.org/2001/XMLSchema#dateTime"},
            "o:modified": {"@value": "2024-02-10T08:30:00+00:00"},
            "o:media": [{"@id": "https://x/api/media/7", "o:id": 7}, {"o:id": 8}],
            "thumbnail_display_urls": {"medium": "https://x/files/medium/a.jpg"},
            "dcterms:title": [
                {"type": "literal", "@value": "Book of Songs", "@language": "en"},
                {"type": "literal", "@value": "詩經", "@language": "zh"}
            ],
            "dcterms:creator": [
                {"type": "resource", "value_resource_id": 5},
                {"type": "resource", "value_resource_id": 6},
                {"type": "resource", "value_resource_id": 5}
            ],
            "@reverse": {
                "dcterms:isPartOf": [
                    {"@id": "https://x/api/items/100", "o:title": "Vol. 1"},
                    {"@id": "https://x/api/items/101"}
                ],
                "dcterms:relation": [{"@id": "https://x/api/items/100"}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let item = sample_item();
        assert_eq!(item.id, 42);
        assert_eq!(item.template_id(), Some(3));
        assert_eq!(item.class_id(), Some(40));
        assert_eq!(item.linked_ids("dcterms:creator"), vec![5, 6]);
        assert!(item.links_to("dcterms:creator", 6));
        assert!(!item.links_to("dcterms:subject", 6));
        assert_eq!(item.media_ids(), vec![7, 8]);
        assert_eq!(item.thumbnail("medium"), Some("https://x/files/medium/a.jpg"));
        assert_eq!(item.reverse_ids(), vec![100, 101]);
        assert_eq!(
            item.modified().unwrap().to_rfc3339(),
            "2024-02-10T08:30:00+00:00"
        );

        let titles = item.literals("dcterms:title");
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[1].value, "詩經");
        assert_eq!(titles[1].language, Some("zh"));
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let item: RawItem = serde_json::from_value(json!({"o:id": 1})).unwrap();
        assert!(item.values("dcterms:title").is_empty());
        assert!(item.linked_ids("dcterms:creator").is_empty());
        assert!(item.reverse_ids().is_empty());
        assert!(item.modified().is_none());
        assert!(item.template_id().is_none());
    }

    #[test]
    fn test_query_pairs_number_property_blocks() {
        let mut request = ItemsRequest::new(2, 50).sorted("created", SortOrder::Desc);
        request.properties = vec![
            PropertyFilter {
                joiner: Joiner::And,
                property: "dcterms:creator".to_string(),
                kind: PropertyMatch::Resource,
                text: "5".to_string(),
            },
            PropertyFilter {
                joiner: Joiner::Or,
                property: "dcterms:creator".to_string(),
                kind: PropertyMatch::Resource,
                text: "6".to_string(),
            },
        ];
        request.ids = vec![3, 4];

        assert_eq!(
            request.to_query_string(),
            "page=2&per_page=50&sort_by=created&sort_order=desc\
             &property%5B0%5D%5Bproperty%5D=dcterms%3Acreator\
             &property%5B0%5D%5Btype%5D=res&property%5B0%5D%5Btext%5D=5\
             &property%5B1%5D%5Bjoiner%5D=or\
             &property%5B1%5D%5Bproperty%5D=dcterms%3Acreator\
             &property%5B1%5D%5Btype%5D=res&property%5B1%5D%5Btext%5D=6\
             &id=3%2C4"
        );
    }

    #[test]
    fn test_site_page_blocks() {
        let page: RawSitePage = serde_json::from_value(json!({
            "o:id": 9,
            "o:slug": "about",
            "o:title": "About",
            "o:block": [
                {"o:layout": "html", "o:data": {"html": "<p>Hello</p>"}},
                {"o:layout": "itemShowcase", "o:data": {}}
            ]
        }))
        .unwrap();
        assert_eq!(page.blocks[0].html(), Some("<p>Hello</p>"));
        assert_eq!(page.blocks[1].html(), None);
    }
}
