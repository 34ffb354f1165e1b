//! Classification dispatch — cache partitioning around the provider
//!
//! One provider call per batch of misses, output order matching input order
//! regardless of the hit/miss split. Only successful results are written
//! back; a transient failure is surfaced to the caller but never cached.

use super::segment::Sentence;
use crate::config::ProviderConfig;
use crate::provider::{Sentiment, SentimentProvider};
use crate::storage::AnnotationStore;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Dispatcher {
    store: Arc<dyn AnnotationStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn AnnotationStore>) -> Self {
        Self { store }
    }

    /// Resolve a batch of sentences to sentiments, one per input.
    ///
    /// `provider` and `config` are the snapshots captured at dispatch time;
    /// a configuration change mid-flight does not affect this call.
    pub async fn resolve(
        &self,
        provider: Arc<dyn SentimentProvider>,
        config: &ProviderConfig,
        sentences: &[Sentence],
    ) -> Vec<Sentiment> {
        if sentences.is_empty() {
            return Vec::new();
        }
        if !config.cache_enabled {
            let texts: Vec<String> = sentences.iter().map(|s| s.text.clone()).collect();
            return provider.classify(&texts).await;
        }

        let ttl = config.ttl();
        let mut results: Vec<Option<Sentiment>> = vec![None; sentences.len()];
        let mut misses: Vec<usize> = Vec::new();
        for (i, sentence) in sentences.iter().enumerate() {
            match self.store.lookup(&sentence.fingerprint, ttl) {
                Ok(Some(hit)) => results[i] = Some(hit),
                Ok(None) => misses.push(i),
                Err(e) => {
                    warn!(error = %e, "cache lookup failed, treating as miss");
                    misses.push(i);
                }
            }
        }
        debug!(
            total = sentences.len(),
            misses = misses.len(),
            "dispatching batch"
        );

        if !misses.is_empty() {
            // Each unique fingerprint goes to the provider once; duplicates
            // within the batch share the result.
            let mut unique_texts: Vec<String> = Vec::new();
            let mut unique_pos: std::collections::HashMap<&str, usize> =
                std::collections::HashMap::new();
            for &i in &misses {
                let fp = sentences[i].fingerprint.as_str();
                if !unique_pos.contains_key(fp) {
                    unique_pos.insert(fp, unique_texts.len());
                    unique_texts.push(sentences[i].text.clone());
                }
            }

            let classified = provider.classify(&unique_texts).await;
            if classified.len() != unique_texts.len() {
                warn!(
                    provider = provider.name(),
                    expected = unique_texts.len(),
                    got = classified.len(),
                    "provider broke the one-result-per-input contract"
                );
                for &i in &misses {
                    results[i] = Some(Sentiment::transient_failure());
                }
            } else {
                for (&fp, &pos) in &unique_pos {
                    let sentiment = &classified[pos];
                    if !sentiment.error {
                        if let Err(e) = self.store.insert(fp, sentiment) {
                            warn!(error = %e, "cache write failed");
                        }
                    }
                }
                for &i in &misses {
                    let pos = unique_pos[sentences[i].fingerprint.as_str()];
                    results[i] = Some(classified[pos].clone());
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(Sentiment::transient_failure))
            .collect()
    }
}
