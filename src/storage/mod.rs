//! Durable classification cache and settings persistence

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{AnnotationStore, CacheEntry, OpenStore, StoreError, StoreResult};
