//! Raw upstream records to normalized items.

use crate::config::{PropertyConfig, TypeConfig};
use crate::facets::{FacetKind, FacetSet};
use crate::upstream::{RawItem, RawMedia, RawSitePage};

use super::localizable::Localizable;
use super::text::to_plain_text;
use super::types::{Item, ItemDetails, ItemKind, LinkedProperties, LinkedRef, Media, Page};

const THUMBNAIL_SIZE: &str = "medium";

/// Stateless transform from raw records to client-facing types.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    properties: PropertyConfig,
    types: TypeConfig,
}

impl Normalizer {
    pub fn new(properties: PropertyConfig, types: TypeConfig) -> Self {
        Self { properties, types }
    }

    pub fn properties(&self) -> &PropertyConfig {
        &self.properties
    }

    /// Category of a raw item; anything unmatched is an object.
    pub fn kind_of(&self, raw: &RawItem) -> ItemKind {
        let (template, class) = (raw.template_id(), raw.class_id());
        if self.types.creator.matches(template, class) {
            ItemKind::Creator
        } else if self.types.object_type.matches(template, class) {
            ItemKind::ObjectType
        } else if self.types.theme.matches(template, class) {
            ItemKind::Theme
        } else if self.types.era.matches(template, class) {
            ItemKind::Era
        } else {
            ItemKind::Object
        }
    }

    /// Whether the item is a sub-part of a larger work: it links to a parent,
    /// or its object type is the configured issue category.
    pub fn is_part(&self, raw: &RawItem) -> bool {
        if !raw.linked_ids(&self.properties.part_of).is_empty() {
            return true;
        }
        self.properties
            .issue_type_id
            .is_some_and(|issue| raw.links_to(&self.properties.object_type, issue))
    }

    /// Property term backing a linked facet.
    pub fn facet_property(&self, kind: FacetKind) -> &str {
        match kind {
            FacetKind::Year => &self.properties.date,
            FacetKind::Creator => &self.properties.creator,
            FacetKind::ObjectType => &self.properties.object_type,
            FacetKind::Theme => &self.properties.theme,
            FacetKind::Era => &self.properties.era,
        }
    }

    /// First four characters of the date, when they are digits.
    pub fn year_of(&self, raw: &RawItem) -> Option<String> {
        let date = self.published(raw)?;
        let year: String = date.chars().take(4).collect();
        (year.chars().count() == 4 && year.chars().all(|c| c.is_ascii_digit())).then_some(year)
    }

    pub fn title(&self, raw: &RawItem) -> Localizable {
        Localizable::from_literals(&raw.literals(&self.properties.title)).unwrap_or_else(|| {
            Localizable::Scalar(raw.str_field("o:title").unwrap_or_default().to_string())
        })
    }

    fn published(&self, raw: &RawItem) -> Option<String> {
        raw.literals(&self.properties.date)
            .first()
            .map(|v| v.value.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Normalize one item. Links are resolved against `facets`; unknown targets
    /// are dropped. With `stage_text`, description and text are kept for
    /// snippet extraction.
    pub fn normalize(&self, raw: &RawItem, facets: &FacetSet, stage_text: bool) -> Item {
        let linked = |kind: FacetKind| -> Vec<LinkedRef> {
            raw.linked_ids(self.facet_property(kind))
                .into_iter()
                .filter_map(|id| {
                    let entry = facets.find(kind, id)?;
                    Some(LinkedRef {
                        id,
                        title: entry.title.clone().unwrap_or_default(),
                    })
                })
                .collect()
        };

        let (description, text) = if stage_text {
            (
                self.long_text(raw, &self.properties.description),
                self.long_text(raw, &self.properties.text),
            )
        } else {
            (None, None)
        };

        Item {
            id: raw.id,
            title: self.title(raw),
            kind: self.kind_of(raw),
            title_alt: Localizable::from_literals(&raw.literals(&self.properties.alt_title)),
            published: self.published(raw),
            media: raw.media_ids(),
            thumbnail: raw.thumbnail(THUMBNAIL_SIZE).map(str::to_string),
            is_part: self.is_part(raw),
            linked_properties: LinkedProperties {
                creator: linked(FacetKind::Creator),
                object_type: linked(FacetKind::ObjectType),
                theme: linked(FacetKind::Theme),
                era: linked(FacetKind::Era),
            },
            description,
            text,
            snippets: Vec::new(),
        }
    }

    /// Item with long-form text, media and reverse links.
    pub fn details(&self, raw: &RawItem, media: &[RawMedia], facets: &FacetSet) -> ItemDetails {
        ItemDetails {
            item: self.normalize(raw, facets, true),
            media_items: media.iter().map(|m| self.media(m)).collect(),
            related: raw.reverse_ids(),
        }
    }

    pub fn media(&self, raw: &RawMedia) -> Media {
        Media {
            id: raw.id,
            title: Localizable::from_literals(&raw.literals(&self.properties.title)),
            media_type: raw.str_field("o:media_type").map(str::to_string),
            original_url: raw.str_field("o:original_url").map(str::to_string),
            thumbnail: raw.thumbnail(THUMBNAIL_SIZE).map(str::to_string),
        }
    }

    pub fn page(&self, raw: &RawSitePage, lang: &str) -> Page {
        let html = raw
            .blocks
            .iter()
            .filter_map(|b| b.html())
            .collect::<Vec<_>>()
            .join("\n");
        Page {
            id: raw.id,
            slug: raw.slug.clone(),
            lang: lang.to_string(),
            title: raw.title.clone(),
            text: to_plain_text(&html),
            html,
        }
    }

    /// Literal values as plain text, keeping the language split.
    fn long_text(&self, raw: &RawItem, term: &str) -> Option<Localizable> {
        let literals = raw.literals(term);
        match Localizable::from_literals(&literals)? {
            Localizable::Scalar(value) => Some(Localizable::Scalar(to_plain_text(&value))),
            Localizable::ByLanguage(map) => Some(Localizable::ByLanguage(
                map.into_iter()
                    .map(|(lang, value)| (lang, to_plain_text(&value)))
                    .collect(),
            )),
        }
    }
}
