//! Limn: Incremental Semantic Annotation Engine
//!
//! Overlays sentiment/category annotations onto the text of a live document
//! tree without blocking the host, classifying each discovered sentence
//! exactly once through a pluggable provider and caching results durably.
//!
//! # Core Concepts
//!
//! - **Document**: an arena-backed tree of elements and text nodes that
//!   notifies observers of structural mutations
//! - **Providers**: the classification capability — a local heuristic, a
//!   remote service, or anything implementing [`SentimentProvider`]
//! - **Engine**: scans the tree in bounded batches, dispatches cache misses
//!   to the provider, and paints results back as highlight wrappers
//!
//! # Example
//!
//! ```
//! use limn::dom::Document;
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let p = doc.create_element("p");
//! let text = doc.create_text("The report explains the findings.");
//! doc.append_child(root, p).unwrap();
//! doc.append_child(p, text).unwrap();
//! assert_eq!(doc.text_content(root), "The report explains the findings.");
//! ```

pub mod annotate;
pub mod config;
pub mod dom;
pub mod engine;
pub mod gateway;
pub mod provider;
pub mod storage;

pub use annotate::{
    highlight_range, highlight_text, unwrap_all, Dispatcher, HighlightStyle, MutationReconciler,
    RenderError, ScanPolicy, ScanScheduler, Sentence, TextRange, TextUnit,
};
pub use config::{ConfigError, ProviderConfig, ProviderMode};
pub use dom::{shared, Document, DomError, MutationEvent, Node, NodeId, SharedDocument};
pub use engine::{EngineError, HighlightEngine, ScanReport};
pub use gateway::{Gateway, GatewayError, Request, Response};
pub use provider::{
    LocalProvider, MockProvider, RemoteProvider, Sentiment, SentimentLabel, SentimentProvider,
};
pub use storage::{AnnotationStore, CacheEntry, OpenStore, SqliteStore, StoreError, StoreResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
