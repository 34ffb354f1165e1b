//! HighlightEngine: the main entry point for the annotation pipeline
//!
//! Owns the process-wide state: the active provider and configuration
//! (replaceable at runtime, snapshotted per dispatch), the scan scheduler's
//! identity sets, the cache store, and the global enabled toggle.

use crate::annotate::{
    render, segment, unwrap_all, Dispatcher, MutationReconciler, ScanPolicy, ScanScheduler,
    Sentence,
};
use crate::config::{ConfigError, ProviderConfig, ProviderMode};
use crate::dom::{NodeId, SharedDocument};
use crate::provider::{LocalProvider, RemoteProvider, Sentiment, SentimentProvider};
use crate::storage::{AnnotationStore, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur in engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// What one scan pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Text units drained into batches
    pub units: usize,
    /// Sentences sent through the dispatcher
    pub sentences: usize,
    /// Wrappers painted into the tree
    pub rendered: usize,
    /// Sentences skipped at render time
    pub skipped: usize,
}

/// The annotation engine
pub struct HighlightEngine {
    store: Arc<dyn AnnotationStore>,
    dispatcher: Dispatcher,
    provider: RwLock<Arc<dyn SentimentProvider>>,
    config: RwLock<ProviderConfig>,
    scheduler: Mutex<ScanScheduler>,
    policy: ScanPolicy,
    enabled: AtomicBool,
}

impl HighlightEngine {
    /// Create an engine with the default scan policy
    pub fn new(store: Arc<dyn AnnotationStore>) -> Self {
        Self::with_policy(store, ScanPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn AnnotationStore>, policy: ScanPolicy) -> Self {
        Self {
            dispatcher: Dispatcher::new(store.clone()),
            store,
            provider: RwLock::new(Arc::new(LocalProvider::new())),
            config: RwLock::new(ProviderConfig::default()),
            scheduler: Mutex::new(ScanScheduler::new(policy.clone())),
            policy,
            enabled: AtomicBool::new(true),
        }
    }

    /// Load persisted configuration and preferences, then build the provider.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        if let Some(config) = self.store.load_config()? {
            *self.config.write().unwrap() = config;
        }
        if let Some(enabled) = self.store.load_enabled()? {
            self.enabled.store(enabled, Ordering::SeqCst);
        }
        self.rebuild_provider().await;
        Ok(())
    }

    /// Build the provider the active configuration names. Remote without
    /// endpoint or credential falls back to local rather than failing.
    async fn rebuild_provider(&self) {
        let config = self.config();
        let provider: Arc<dyn SentimentProvider> =
            match (config.mode, &config.endpoint, &config.credential) {
                (ProviderMode::Remote, Some(endpoint), Some(credential)) => {
                    Arc::new(RemoteProvider::new(endpoint.as_str(), credential.as_str()))
                }
                (ProviderMode::Remote, _, _) => {
                    warn!("remote mode without endpoint or credential, using local provider");
                    Arc::new(LocalProvider::new())
                }
                (ProviderMode::Local, _, _) => Arc::new(LocalProvider::new()),
            };
        let ready = provider.initialize().await;
        if !ready {
            warn!(provider = provider.name(), "provider initialization failed");
        }
        *self.provider.write().unwrap() = provider;
    }

    /// Validate, persist, and activate a new configuration, rebuilding the
    /// provider (the explicit retry point for a failed remote
    /// initialization). A rejected update leaves the previous configuration
    /// active.
    pub async fn update_config(&self, config: ProviderConfig) -> Result<(), EngineError> {
        config.validate()?;
        self.store.save_config(&config)?;
        *self.config.write().unwrap() = config;
        self.rebuild_provider().await;
        Ok(())
    }

    /// Snapshot of the active configuration
    pub fn config(&self) -> ProviderConfig {
        self.config.read().unwrap().clone()
    }

    /// Snapshot of the active provider. In-flight dispatches keep the
    /// instance they captured; switching providers tears down nothing.
    pub fn provider(&self) -> Arc<dyn SentimentProvider> {
        self.provider.read().unwrap().clone()
    }

    /// Replace the provider directly (embedding and tests)
    pub fn set_provider(&self, provider: Arc<dyn SentimentProvider>) {
        *self.provider.write().unwrap() = provider;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Flip the global toggle, persisting it. Disabling unwraps every
    /// still-present wrapper; the count of removed wrappers is returned and
    /// a repeated disable is a no-op.
    pub fn set_enabled(&self, doc: &SharedDocument, enabled: bool) -> Result<usize, EngineError> {
        self.enabled.store(enabled, Ordering::SeqCst);
        self.store.save_enabled(enabled)?;
        if enabled {
            Ok(0)
        } else {
            let mut doc = doc.lock().unwrap();
            Ok(unwrap_all(&mut doc))
        }
    }

    /// Scan text descendants of `root`, classify them, and paint results.
    ///
    /// Work drains in bounded batches with a yield between them, so a large
    /// document never monopolizes the event loop. Identity sets are mutated
    /// strictly before every suspension point: a concurrent scan observes
    /// each node as already claimed.
    pub async fn scan(&self, doc: &SharedDocument, root: NodeId) -> ScanReport {
        let mut report = ScanReport::default();
        if !self.is_enabled() {
            return report;
        }
        {
            let d = doc.lock().unwrap();
            let mut scheduler = self.scheduler.lock().unwrap();
            scheduler.prune_detached(&d);
            let added = scheduler.collect(&d, root);
            debug!(%root, added, "scan collected candidates");
        }
        loop {
            let batch = {
                let d = doc.lock().unwrap();
                self.scheduler.lock().unwrap().next_batch(&d)
            };
            if batch.is_empty() {
                break;
            }
            report.units += batch.len();

            let mut sentences: Vec<Sentence> = Vec::new();
            for (i, unit) in batch.iter().enumerate() {
                for text in segment(&unit.snapshot, self.policy.min_sentence_len) {
                    sentences.push(Sentence::new(text, i));
                }
            }
            if sentences.is_empty() {
                tokio::task::yield_now().await;
                continue;
            }
            report.sentences += sentences.len();

            // Snapshots captured at dispatch time; a mid-flight config change
            // does not touch this batch.
            let provider = self.provider();
            let config = self.config();
            let results = self.dispatcher.resolve(provider, &config, &sentences).await;

            {
                let mut d = doc.lock().unwrap();
                let mut scheduler = self.scheduler.lock().unwrap();
                let mut targets: Vec<NodeId> = batch.iter().map(|u| u.node).collect();
                for (sentence, result) in sentences.iter().zip(&results) {
                    if result.error {
                        debug!("skipping render of transient failure");
                        report.skipped += 1;
                        continue;
                    }
                    let target = targets[sentence.unit];
                    match render(&mut d, target, &sentence.text, result) {
                        Some(span) => {
                            report.rendered += 1;
                            // Residue text was part of an already-classified
                            // unit; claim it before yielding.
                            if let Some(before) = span.before {
                                scheduler.mark_processed(before);
                            }
                            if let Some(after) = span.after {
                                scheduler.mark_processed(after);
                                targets[sentence.unit] = after;
                            }
                        }
                        None => report.skipped += 1,
                    }
                }
            }
            // The idle-slice boundary: let the host breathe between batches.
            tokio::task::yield_now().await;
        }
        report
    }

    /// Classify a batch of raw texts through the cache, without rendering
    pub async fn classify_batch(&self, texts: &[String]) -> Vec<Sentiment> {
        let sentences: Vec<Sentence> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Sentence::new(t.trim(), i))
            .collect();
        let provider = self.provider();
        let config = self.config();
        self.dispatcher.resolve(provider, &config, &sentences).await
    }

    /// Classify a single selection (the interactive path)
    pub async fn classify_selection(&self, text: &str) -> Sentiment {
        if text.trim().is_empty() {
            return Sentiment::neutral();
        }
        self.classify_batch(&[text.to_string()])
            .await
            .into_iter()
            .next()
            .unwrap_or_else(Sentiment::neutral)
    }

    /// Spawn a reconciler task observing the document's mutations
    pub fn watch(self: Arc<Self>, doc: &SharedDocument) -> tokio::task::JoinHandle<()> {
        let events = doc.lock().unwrap().subscribe();
        let reconciler = MutationReconciler::new(self.policy.debounce);
        tokio::spawn(reconciler.run(self, doc.clone(), events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{self, Document};
    use crate::provider::{MockProvider, SentimentLabel};
    use crate::storage::{OpenStore, SqliteStore};

    fn engine() -> Arc<HighlightEngine> {
        Arc::new(HighlightEngine::new(Arc::new(
            SqliteStore::open_in_memory().unwrap(),
        )))
    }

    fn doc_with_texts(texts: &[&str]) -> SharedDocument {
        let mut doc = Document::new();
        for text in texts {
            let p = doc.create_element("p");
            let t = doc.create_text(text);
            doc.append_child(doc.root(), p).unwrap();
            doc.append_child(p, t).unwrap();
        }
        dom::shared(doc)
    }

    #[tokio::test]
    async fn update_config_rejection_keeps_previous_config() {
        let engine = engine();
        let valid = ProviderConfig {
            cache_enabled: false,
            ..ProviderConfig::default()
        };
        engine.update_config(valid.clone()).await.unwrap();

        let invalid = ProviderConfig {
            mode: ProviderMode::Remote,
            ..ProviderConfig::default()
        };
        let err = engine.update_config(invalid).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config(ConfigError::MissingEndpoint)
        ));
        assert_eq!(engine.config(), valid);
    }

    #[tokio::test]
    async fn initialize_restores_persisted_state() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let saved = ProviderConfig {
            ttl_ms: 1234,
            ..ProviderConfig::default()
        };
        store.save_config(&saved).unwrap();
        store.save_enabled(false).unwrap();

        let engine = HighlightEngine::new(store);
        engine.initialize().await.unwrap();
        assert_eq!(engine.config(), saved);
        assert!(!engine.is_enabled());
    }

    #[tokio::test]
    async fn disabled_engine_scans_nothing() {
        let engine = engine();
        let doc = doc_with_texts(&["A sentence that would match."]);
        engine.set_enabled(&doc, false).unwrap();

        let root = doc.lock().unwrap().root();
        let report = engine.scan(&doc, root).await;
        assert_eq!(report, ScanReport::default());
    }

    #[tokio::test]
    async fn scan_renders_multiple_sentences_per_node() {
        let engine = engine();
        let doc = doc_with_texts(&["The report explains. This is fantastic! Warning ahead."]);
        let root = doc.lock().unwrap().root();

        let report = engine.scan(&doc, root).await;
        assert_eq!(report.units, 1);
        assert_eq!(report.sentences, 3);
        assert_eq!(report.rendered, 3);

        let d = doc.lock().unwrap();
        let labels: Vec<String> = d
            .descendants(root)
            .into_iter()
            .filter_map(|id| d.attr(id, crate::annotate::ANNOTATION_ATTR))
            .map(String::from)
            .collect();
        assert_eq!(labels, vec!["informative", "positive", "risk"]);
        assert_eq!(
            d.text_content(root),
            "The report explains. This is fantastic! Warning ahead."
        );
    }

    #[tokio::test]
    async fn transient_failures_leave_text_unannotated() {
        let engine = engine();
        engine.set_provider(Arc::new(MockProvider::failing()));
        let doc = doc_with_texts(&["A sentence that will fail."]);
        let root = doc.lock().unwrap().root();

        let report = engine.scan(&doc, root).await;
        assert_eq!(report.rendered, 0);
        assert_eq!(report.skipped, 1);

        let d = doc.lock().unwrap();
        assert_eq!(d.text_content(root), "A sentence that will fail.");
    }

    #[tokio::test]
    async fn overlapping_scans_classify_each_sentence_once() {
        let engine = engine();
        let provider = Arc::new(MockProvider::new());
        engine.set_provider(provider.clone());
        let doc = doc_with_texts(&[
            "First sentence of the page.",
            "Second sentence of the page.",
            "Third sentence of the page.",
        ]);
        let root = doc.lock().unwrap().root();

        let (a, b) = tokio::join!(engine.scan(&doc, root), engine.scan(&doc, root));
        assert_eq!(a.units + b.units, 3);

        let classified: usize = provider.batches().iter().map(Vec::len).sum();
        assert_eq!(classified, 3);
    }

    #[tokio::test]
    async fn selection_classification_uses_the_cache() {
        let engine = engine();
        let provider = Arc::new(MockProvider::new().with_response(
            "A selection worth caching.",
            Sentiment::new(SentimentLabel::Positive, 0.9),
        ));
        engine.set_provider(provider.clone());

        let first = engine.classify_selection("A selection worth caching.").await;
        let second = engine
            .classify_selection("  A selection worth caching.  ")
            .await;
        assert_eq!(first.label, SentimentLabel::Positive);
        assert_eq!(first, second);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_selection_short_circuits() {
        let engine = engine();
        let provider = Arc::new(MockProvider::new());
        engine.set_provider(provider.clone());

        let result = engine.classify_selection("   ").await;
        assert_eq!(result, Sentiment::neutral());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn toggle_off_unwraps_and_is_idempotent() {
        let engine = engine();
        let doc = doc_with_texts(&["The report explains everything."]);
        let root = doc.lock().unwrap().root();
        engine.scan(&doc, root).await;

        assert_eq!(engine.set_enabled(&doc, false).unwrap(), 1);
        assert_eq!(engine.set_enabled(&doc, false).unwrap(), 0);
        assert_eq!(
            doc.lock().unwrap().text_content(root),
            "The report explains everything."
        );
    }
}
