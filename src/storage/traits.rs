//! Storage trait definitions

use crate::config::ProviderConfig;
use crate::provider::Sentiment;
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("date parsing error: {0}")]
    DateParse(String),

    #[error("corrupt entry: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A cached classification with its write timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub result: Sentiment,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether the entry has outlived `ttl` as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.stored_at > ttl
    }
}

/// Durable fingerprint → classification cache plus settings persistence.
///
/// Expiry is lazy: an expired entry is purged when a lookup observes it,
/// never by a background sweep.
pub trait AnnotationStore: Send + Sync {
    // === Cache operations ===

    /// TTL-checked lookup. An expired entry is deleted and reported as a miss.
    fn lookup(&self, fingerprint: &str, ttl: Duration) -> StoreResult<Option<Sentiment>>;

    /// Raw entry access without TTL policy
    fn entry(&self, fingerprint: &str) -> StoreResult<Option<CacheEntry>>;

    /// Insert or replace an entry, stamped now
    fn insert(&self, fingerprint: &str, result: &Sentiment) -> StoreResult<()>;

    /// Remove an entry, reporting whether it existed
    fn remove(&self, fingerprint: &str) -> StoreResult<bool>;

    /// Number of entries, expired ones included
    fn entry_count(&self) -> StoreResult<usize>;

    /// Drop every cache entry, returning how many were removed
    fn clear(&self) -> StoreResult<usize>;

    // === Settings operations ===

    /// Load the persisted provider configuration, if any
    fn load_config(&self) -> StoreResult<Option<ProviderConfig>>;

    /// Persist the provider configuration
    fn save_config(&self, config: &ProviderConfig) -> StoreResult<()>;

    /// Load the highlighting-enabled preference, if set
    fn load_enabled(&self) -> StoreResult<Option<bool>>;

    /// Persist the highlighting-enabled preference
    fn save_enabled(&self, enabled: bool) -> StoreResult<()>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: AnnotationStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StoreResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StoreResult<Self>;
}
