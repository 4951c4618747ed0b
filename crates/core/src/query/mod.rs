//! Query engine.
//!
//! Resolves a structured [`Query`] in a fixed sequence:
//!
//! 1. parent scope (items linking to a given item), empty scope short-circuits
//! 2. canonical request and cache key
//! 3. cached result, if any
//! 4. upstream listing, sorted by creation date
//! 5. normalization and search snippets
//! 6. `hasNextPage` from the page being full
//! 7. cross-referenced creators
//! 8. creator/object split (taxonomy records dropped) and part exclusion
//! 9. counts of creators and non-part objects, global ones when the page is truncated
//! 10. scoped facets for narrowed queries
//! 11. collation by localized title
//! 12. cache write

mod canonical;
mod engine;
pub mod search;
mod types;

pub use canonical::{canonicalize, CanonicalQuery};
pub use engine::QueryEngine;
pub use types::{Query, QueryOptions, QueryResult};
