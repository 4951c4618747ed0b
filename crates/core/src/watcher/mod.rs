//! Change watcher for cache invalidation.
//!
//! Polls upstream for recently modified items and evicts their cached
//! entries. A full batch means more changed than one poll can see, so the
//! watcher flushes everything and rebuilds instead. Facets are rebuilt on a
//! separate deadline derived from the remaining TTL of the `filters` entry,
//! so the refresh cadence follows the facet cache's own lifetime.

mod runner;
mod types;

pub use runner::ChangeWatcher;
pub use types::{PollOutcome, WatcherStatus};
