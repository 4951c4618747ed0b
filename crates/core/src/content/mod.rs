//! Content normalization.
//!
//! Stateless helpers that turn raw Omeka-S records into the client-facing
//! shape:
//!
//! - **Localizable** (`localizable.rs`): scalar or per-language values
//! - **Text** (`text.rs`): HTML to plain text
//! - **Collation** (`collation.rs`): locale-aware title ordering
//! - **Normalizer** (`normalize.rs`): raw item to [`Item`]

mod collation;
mod localizable;
mod normalize;
pub mod text;
mod types;

pub use collation::{
    Collator, CollatorRegistry, EnglishCollator, OrdinalCollator, PinyinCollator,
};
pub use localizable::{primary_subtag, Localizable, UNTAGGED};
pub use normalize::Normalizer;
pub use types::{Item, ItemDetails, ItemKind, LinkedProperties, LinkedRef, Media, Page};
