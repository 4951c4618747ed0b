use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub properties: PropertyConfig,
    #[serde(default)]
    pub types: TypeConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

impl Config {
    /// Minimal configuration pointing at the given upstream, everything else defaulted.
    pub fn for_upstream(base_url: impl Into<String>) -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::new(base_url),
            cache: CacheConfig::default(),
            mirror: MirrorConfig::default(),
            query: QueryConfig::default(),
            properties: PropertyConfig::default(),
            types: TypeConfig::default(),
            watcher: WatcherConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Upstream Omeka-S API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// API root, e.g. "https://collection.example.org/api"
    pub base_url: String,
    /// Omeka-S key identity (optional, public collections need none)
    #[serde(default)]
    pub key_identity: Option<String>,
    /// Omeka-S key credential
    #[serde(default)]
    pub key_credential: Option<String>,
    /// Default site slug used for site pages
    #[serde(default = "default_site")]
    pub site: String,
    /// Per-language site slugs, falling back to `site`
    #[serde(default)]
    pub sites: HashMap<String, String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            key_identity: None,
            key_credential: None,
            site: default_site(),
            sites: HashMap::new(),
            timeout_secs: default_timeout(),
        }
    }

    /// Site slug serving pages for the given language ("zh-Hant" falls back to "zh").
    pub fn site_for(&self, lang: &str) -> &str {
        self.sites
            .get(lang)
            .or_else(|| self.sites.get(&crate::content::primary_subtag(lang)))
            .map(String::as_str)
            .unwrap_or(&self.site)
    }
}

fn default_site() -> String {
    "default".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Which cache backend to use
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Cache store configuration and per-key TTLs (seconds)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Database file for the sqlite backend
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    #[serde(default = "default_day")]
    pub filters_ttl_secs: u64,
    #[serde(default = "default_day")]
    pub counts_ttl_secs: u64,
    #[serde(default = "default_day")]
    pub creators_ttl_secs: u64,
    #[serde(default = "default_day")]
    pub item_ttl_secs: u64,
    #[serde(default = "default_day")]
    pub details_ttl_secs: u64,
    #[serde(default = "default_hour")]
    pub query_ttl_secs: u64,
    #[serde(default = "default_day")]
    pub page_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            path: default_cache_path(),
            filters_ttl_secs: default_day(),
            counts_ttl_secs: default_day(),
            creators_ttl_secs: default_day(),
            item_ttl_secs: default_day(),
            details_ttl_secs: default_day(),
            query_ttl_secs: default_hour(),
            page_ttl_secs: default_day(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("omecache.db")
}

fn default_day() -> u64 {
    86_400
}

fn default_hour() -> u64 {
    3_600
}

/// Bulk mirror fetch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    /// Items requested per upstream page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Pause between pages (milliseconds)
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
    /// TTL of the cached mirror (default: 6 hours)
    #[serde(default = "default_mirror_ttl")]
    pub ttl_secs: u64,
    /// Upper bound on a whole mirror build; the single-flight guard is released after it
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_delay_ms: default_page_delay(),
            ttl_secs: default_mirror_ttl(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_page_delay() -> u64 {
    100
}

fn default_mirror_ttl() -> u64 {
    6 * 3_600
}

fn default_fetch_timeout() -> u64 {
    600
}

/// Query engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Page size for unfiltered listings
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Page size once any filter, search term or parent scope is present
    #[serde(default = "default_filtered_limit")]
    pub filtered_limit: u32,
    #[serde(default = "default_max_snippets")]
    pub max_snippets: usize,
    /// Characters of context kept on each side of a search hit
    #[serde(default = "default_snippet_radius")]
    pub snippet_radius: usize,
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Languages served; used to evict every localized variant of a listing
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            filtered_limit: default_filtered_limit(),
            max_snippets: default_max_snippets(),
            snippet_radius: default_snippet_radius(),
            default_language: default_language(),
            languages: default_languages(),
        }
    }
}

fn default_limit() -> u32 {
    20
}

fn default_filtered_limit() -> u32 {
    1000
}

fn default_max_snippets() -> usize {
    3
}

fn default_snippet_radius() -> usize {
    40
}

fn default_language() -> String {
    "en".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string(), "zh".to_string()]
}

/// Vocabulary terms read from raw items
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PropertyConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_alt_title")]
    pub alt_title: String,
    #[serde(default = "default_description")]
    pub description: String,
    /// Long-form text searched for snippets
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_date")]
    pub date: String,
    #[serde(default = "default_creator")]
    pub creator: String,
    #[serde(default = "default_object_type")]
    pub object_type: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_era")]
    pub era: String,
    /// Link from a part/issue to the work it belongs to
    #[serde(default = "default_part_of")]
    pub part_of: String,
    /// objectType id marking issues; excluded from facet counts
    #[serde(default)]
    pub issue_type_id: Option<u64>,
}

impl Default for PropertyConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            alt_title: default_alt_title(),
            description: default_description(),
            text: default_text(),
            date: default_date(),
            creator: default_creator(),
            object_type: default_object_type(),
            theme: default_theme(),
            era: default_era(),
            part_of: default_part_of(),
            issue_type_id: None,
        }
    }
}

fn default_title() -> String {
    "dcterms:title".to_string()
}

fn default_alt_title() -> String {
    "dcterms:alternative".to_string()
}

fn default_description() -> String {
    "dcterms:description".to_string()
}

fn default_text() -> String {
    "bibo:content".to_string()
}

fn default_date() -> String {
    "dcterms:date".to_string()
}

fn default_creator() -> String {
    "dcterms:creator".to_string()
}

fn default_object_type() -> String {
    "dcterms:type".to_string()
}

fn default_theme() -> String {
    "dcterms:subject".to_string()
}

fn default_era() -> String {
    "dcterms:temporal".to_string()
}

fn default_part_of() -> String {
    "dcterms:isPartOf".to_string()
}

/// Resource template / class ids identifying one item type
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TypeMatcher {
    #[serde(default)]
    pub templates: Vec<u64>,
    #[serde(default)]
    pub classes: Vec<u64>,
}

impl TypeMatcher {
    pub fn matches(&self, template: Option<u64>, class: Option<u64>) -> bool {
        template.is_some_and(|t| self.templates.contains(&t))
            || class.is_some_and(|c| self.classes.contains(&c))
    }
}

/// How raw items are classified; anything unmatched is an object
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TypeConfig {
    #[serde(default)]
    pub creator: TypeMatcher,
    #[serde(default)]
    pub object_type: TypeMatcher,
    #[serde(default)]
    pub theme: TypeMatcher,
    #[serde(default)]
    pub era: TypeMatcher,
}

/// Change watcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// How often to ask upstream for recent modifications (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Most recently modified items requested per poll
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,
    /// Facet refresh fires at this fraction of the remaining `filters` TTL
    #[serde(default = "default_safety_factor")]
    pub ttl_safety_factor: f64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_interval_secs: default_poll_interval(),
            recent_limit: default_recent_limit(),
            ttl_safety_factor: default_safety_factor(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    60
}

fn default_recent_limit() -> u32 {
    20
}

fn default_safety_factor() -> f64 {
    0.95
}

/// Admin endpoints configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Key required on admin routes; admin routes are disabled when unset
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub upstream: SanitizedUpstreamConfig,
    pub cache: CacheConfig,
    pub mirror: MirrorConfig,
    pub query: QueryConfig,
    pub watcher: WatcherConfig,
    pub admin_enabled: bool,
}

/// Sanitized upstream config (credential hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUpstreamConfig {
    pub base_url: String,
    pub site: String,
    pub credentials_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            upstream: SanitizedUpstreamConfig {
                base_url: config.upstream.base_url.clone(),
                site: config.upstream.site.clone(),
                credentials_configured: config.upstream.key_identity.is_some()
                    && config.upstream.key_credential.is_some(),
                timeout_secs: config.upstream.timeout_secs,
            },
            cache: config.cache.clone(),
            mirror: config.mirror.clone(),
            query: config.query.clone(),
            watcher: config.watcher.clone(),
            admin_enabled: config.admin.api_key.is_some(),
        }
    }
}
