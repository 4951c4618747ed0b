//! Types for the change watcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What one poll did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// Nothing was modified within the window.
    Unchanged,
    /// These items were modified; their caches and the base listings were evicted.
    Evicted { items: Vec<u64>, keys: usize },
    /// The batch was full: everything was flushed and rebuilt.
    FullFlush,
}

/// Current status of the change watcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatcherStatus {
    /// Whether the watcher loop is running.
    pub running: bool,
    /// Start of the last successful poll.
    pub last_poll: Option<DateTime<Utc>>,
    /// Last scheduled facet rebuild.
    pub last_refresh: Option<DateTime<Utc>>,
    /// When the next facet rebuild is due.
    pub next_refresh: Option<DateTime<Utc>>,
    /// Successful polls.
    pub polls: u64,
    /// Cache entries evicted.
    pub evictions: u64,
    /// Full flush cycles.
    pub full_flushes: u64,
    /// Most recent failure, cleared by the next success.
    pub last_error: Option<String>,
}
