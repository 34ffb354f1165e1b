//! Remote provider — batched classification over HTTP
//!
//! One POST per batch; any transport or shape failure yields a transient
//! failure for every item in the call, never a partially fabricated batch.
//! Initialization is attempted at most once on its own; a configuration
//! update rebuilds the provider, which is the explicit retry point.

use super::{map_to_category, Sentiment, SentimentProvider};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    sentences: &'a [String],
}

#[derive(Deserialize)]
struct ClassifyResponse {
    results: Vec<RawResult>,
}

#[derive(Deserialize)]
struct RawResult {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    risk: Option<f32>,
}

/// Network-backed classifier
pub struct RemoteProvider {
    endpoint: String,
    credential: String,
    client: Client,
    initialized: AtomicBool,
    init_attempted: AtomicBool,
}

impl RemoteProvider {
    pub fn new(endpoint: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: credential.into(),
            client: Client::new(),
            initialized: AtomicBool::new(false),
            init_attempted: AtomicBool::new(false),
        }
    }

    /// Whether the connectivity probe has succeeded
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Whether initialization has been tried, successfully or not
    pub fn init_attempted(&self) -> bool {
        self.init_attempted.load(Ordering::SeqCst)
    }

    fn classify_url(&self) -> String {
        format!("{}/classify", self.endpoint.trim_end_matches('/'))
    }

    async fn fetch(&self, texts: &[String]) -> Result<Vec<Sentiment>, String> {
        let response = self
            .client
            .post(self.classify_url())
            .bearer_auth(&self.credential)
            .json(&ClassifyRequest { sentences: texts })
            .send()
            .await
            .map_err(|e| format!("transport failure: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("classification request failed: {status}"));
        }

        let payload: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| format!("malformed response body: {e}"))?;
        if payload.results.len() != texts.len() {
            return Err(format!(
                "result count mismatch: expected {}, got {}",
                texts.len(),
                payload.results.len()
            ));
        }

        Ok(payload
            .results
            .into_iter()
            .map(|raw| {
                let label = map_to_category(raw.label.as_deref(), raw.score, raw.risk);
                Sentiment::new(label, raw.score)
            })
            .collect())
    }
}

#[async_trait]
impl SentimentProvider for RemoteProvider {
    /// Lightweight connectivity probe. Sets the one-shot attempted flag so a
    /// failed probe is not repeated on every classify call.
    async fn initialize(&self) -> bool {
        self.init_attempted.store(true, Ordering::SeqCst);
        let probe = self
            .client
            .request(Method::OPTIONS, self.endpoint.as_str())
            .bearer_auth(&self.credential)
            .send()
            .await;
        let ready = match probe {
            Ok(response) => {
                let status = response.status();
                status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "remote provider probe failed");
                false
            }
        };
        self.initialized.store(ready, Ordering::SeqCst);
        if ready {
            debug!(endpoint = %self.endpoint, "remote provider initialized");
        }
        ready
    }

    async fn classify(&self, texts: &[String]) -> Vec<Sentiment> {
        if !self.is_initialized() && !self.init_attempted() {
            self.initialize().await;
        }
        if !self.is_initialized() {
            return texts.iter().map(|_| Sentiment::transient_failure()).collect();
        }
        match self.fetch(texts).await {
            Ok(results) => results,
            Err(reason) => {
                warn!(%reason, "remote classification failed");
                texts.iter().map(|_| Sentiment::transient_failure()).collect()
            }
        }
    }

    fn name(&self) -> &str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Port 1 is reserved and nothing listens there; connections are refused
    // immediately, which is exactly the failure path under test.
    const DEAD_ENDPOINT: &str = "http://127.0.0.1:1";

    #[tokio::test]
    async fn failed_probe_sets_attempted_but_not_initialized() {
        let provider = RemoteProvider::new(DEAD_ENDPOINT, "key");
        assert!(!provider.init_attempted());

        let ready = provider.initialize().await;
        assert!(!ready);
        assert!(provider.init_attempted());
        assert!(!provider.is_initialized());
    }

    #[tokio::test]
    async fn classify_against_dead_endpoint_flags_every_item() {
        let provider = RemoteProvider::new(DEAD_ENDPOINT, "key");
        let texts = vec!["one sentence.".to_string(), "another one.".to_string()];
        let results = provider.classify(&texts).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.error));
        // The implicit initialization attempt happened exactly once.
        assert!(provider.init_attempted());
    }

    #[test]
    fn classify_url_normalizes_trailing_slash() {
        let provider = RemoteProvider::new("https://api.example.com/", "key");
        assert_eq!(provider.classify_url(), "https://api.example.com/classify");
    }
}
