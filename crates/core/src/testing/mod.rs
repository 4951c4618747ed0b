//! Testing utilities and mock implementations.
//!
//! This module provides a mock [`ContentApi`](crate::upstream::ContentApi)
//! and fixtures for building raw Omeka-S items, allowing the engines and the
//! HTTP layer to be tested without a live content API.
//!
//! # Example
//!
//! ```rust,ignore
//! use omecache_core::testing::{fixtures, MockContentApi};
//!
//! let api = MockContentApi::new();
//! api.add_item(fixtures::creator(1, "Wu Zhen")).await;
//! api.add_item(fixtures::ItemBuilder::new(10).title("Ink Bamboo").creators(&[1]).build()).await;
//!
//! // Use in ContentService::new...
//! ```

mod mock_content_api;

pub use mock_content_api::{MockContentApi, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Map, Value};

    use crate::config::{Config, TypeMatcher};
    use crate::upstream::{RawItem, RawMedia, RawSitePage};

    pub const CREATOR_TEMPLATE: u64 = 2;
    pub const OBJECT_TYPE_TEMPLATE: u64 = 3;
    pub const THEME_TEMPLATE: u64 = 4;
    pub const ERA_TEMPLATE: u64 = 5;

    /// Config whose type matchers agree with the fixture templates.
    ///
    /// Mirror pages are fetched without delay.
    pub fn test_config() -> Config {
        let mut config = Config::for_upstream("http://omeka.test/api");
        let template = |id| TypeMatcher {
            templates: vec![id],
            classes: vec![],
        };
        config.types.creator = template(CREATOR_TEMPLATE);
        config.types.object_type = template(OBJECT_TYPE_TEMPLATE);
        config.types.theme = template(THEME_TEMPLATE);
        config.types.era = template(ERA_TEMPLATE);
        config.mirror.page_delay_ms = 0;
        config
    }

    /// Builder for raw items using the default vocabulary terms.
    #[derive(Debug, Clone)]
    pub struct ItemBuilder {
        fields: Map<String, Value>,
        id: u64,
    }

    impl ItemBuilder {
        pub fn new(id: u64) -> Self {
            let mut fields = Map::new();
            fields.insert("@id".to_string(), json!(format!("http://omeka.test/api/items/{}", id)));
            fields.insert("o:title".to_string(), json!(format!("Item {}", id)));
            Self { fields, id }
        }

        pub fn template(mut self, template: u64) -> Self {
            self.fields
                .insert("o:resource_template".to_string(), json!({"o:id": template}));
            self
        }

        /// Untagged title.
        pub fn title(self, title: &str) -> Self {
            self.literal("dcterms:title", title, None)
        }

        /// Language-tagged title.
        pub fn title_in(self, title: &str, lang: &str) -> Self {
            self.literal("dcterms:title", title, Some(lang))
        }

        pub fn description(self, text: &str) -> Self {
            self.literal("dcterms:description", text, None)
        }

        pub fn date(self, date: &str) -> Self {
            self.literal("dcterms:date", date, None)
        }

        /// Append a literal value to a term.
        pub fn literal(mut self, term: &str, value: &str, lang: Option<&str>) -> Self {
            let mut entry = json!({"type": "literal", "@value": value});
            if let Some(lang) = lang {
                entry["@language"] = json!(lang);
            }
            self.push(term, entry);
            self
        }

        /// Append resource links to a term.
        pub fn links(mut self, term: &str, ids: &[u64]) -> Self {
            for id in ids {
                self.push(term, json!({"type": "resource", "value_resource_id": id}));
            }
            self
        }

        pub fn creators(self, ids: &[u64]) -> Self {
            self.links("dcterms:creator", ids)
        }

        pub fn object_types(self, ids: &[u64]) -> Self {
            self.links("dcterms:type", ids)
        }

        pub fn themes(self, ids: &[u64]) -> Self {
            self.links("dcterms:subject", ids)
        }

        pub fn eras(self, ids: &[u64]) -> Self {
            self.links("dcterms:temporal", ids)
        }

        pub fn part_of(self, parent: u64) -> Self {
            self.links("dcterms:isPartOf", &[parent])
        }

        /// Items linking back to this one.
        pub fn reverse(mut self, ids: &[u64]) -> Self {
            let links: Vec<Value> = ids
                .iter()
                .map(|id| json!({"@id": format!("http://omeka.test/api/items/{}", id), "o:id": id}))
                .collect();
            self.fields
                .insert("@reverse".to_string(), json!({"dcterms:relation": links}));
            self
        }

        pub fn media(mut self, ids: &[u64]) -> Self {
            let media: Vec<Value> = ids.iter().map(|id| json!({"o:id": id})).collect();
            self.fields.insert("o:media".to_string(), Value::Array(media));
            self
        }

        /// RFC 3339 creation timestamp.
        pub fn created(mut self, at: &str) -> Self {
            self.fields
                .insert("o:created".to_string(), json!({"@value": at}));
            self
        }

        /// RFC 3339 modification timestamp.
        pub fn modified(mut self, at: &str) -> Self {
            self.fields
                .insert("o:modified".to_string(), json!({"@value": at}));
            self
        }

        pub fn build(self) -> RawItem {
            RawItem {
                id: self.id,
                fields: self.fields,
            }
        }

        fn push(&mut self, term: &str, value: Value) {
            let entry = self
                .fields
                .entry(term.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = entry {
                values.push(value);
            }
        }
    }

    /// Create a creator item.
    pub fn creator(id: u64, name: &str) -> RawItem {
        ItemBuilder::new(id)
            .template(CREATOR_TEMPLATE)
            .title(name)
            .build()
    }

    /// Create an object-type item.
    pub fn object_type(id: u64, name: &str) -> RawItem {
        ItemBuilder::new(id)
            .template(OBJECT_TYPE_TEMPLATE)
            .title(name)
            .build()
    }

    /// Create a theme item.
    pub fn theme(id: u64, name: &str) -> RawItem {
        ItemBuilder::new(id)
            .template(THEME_TEMPLATE)
            .title(name)
            .build()
    }

    /// Create an era item.
    pub fn era(id: u64, name: &str) -> RawItem {
        ItemBuilder::new(id)
            .template(ERA_TEMPLATE)
            .title(name)
            .build()
    }

    /// Create a plain object item.
    pub fn object(id: u64, title: &str) -> RawItem {
        ItemBuilder::new(id).title(title).build()
    }

    /// Create a media record.
    pub fn media(id: u64, url: &str) -> RawMedia {
        RawMedia {
            id,
            fields: json!({
                "o:media_type": "image/jpeg",
                "o:original_url": url,
            })
            .as_object()
            .cloned()
            .unwrap_or_default(),
        }
    }

    /// Create a site page with one HTML block.
    pub fn site_page(id: u64, slug: &str, html: &str) -> RawSitePage {
        RawSitePage {
            id,
            slug: slug.to_string(),
            title: slug.to_string(),
            blocks: serde_json::from_value(json!([
                {"o:layout": "html", "o:data": {"html": html}}
            ]))
            .unwrap_or_default(),
        }
    }
}
