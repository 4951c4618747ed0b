pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod facets;
pub mod metrics;
pub mod mirror;
pub mod query;
pub mod service;
pub mod testing;
pub mod upstream;
pub mod watcher;

pub use cache::{create_cache_store, CacheError, CacheStore, MemoryCache, SqliteCache};
pub use config::{
    load_config, load_config_from_str, validate_config, CacheBackend, Config, ConfigError,
    SanitizedConfig,
};
pub use content::{Item, ItemDetails, ItemKind, Localizable, Normalizer, Page};
pub use error::ServiceError;
pub use facets::{Counts, FacetEngine, FacetEntry, FacetKind, FacetSet};
pub use mirror::MirrorFetcher;
pub use query::{Query, QueryEngine, QueryOptions, QueryResult};
pub use service::{ContentService, PreloadSummary};
pub use upstream::{ContentApi, OmekaClient, UpstreamError};
pub use watcher::{ChangeWatcher, PollOutcome, WatcherStatus};
