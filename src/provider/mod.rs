//! Classification providers — the pluggable capability that turns sentences
//! into sentiment categories
//!
//! Two production variants behind one trait:
//! - `LocalProvider`: deterministic keyword scoring, always available (default
//!   and fallback)
//! - `RemoteProvider`: batched network classification against a configured
//!   endpoint
//!
//! `MockProvider` returns preconfigured responses and counts calls, for
//! testing dispatch behavior.

mod local;
mod remote;

pub use local::LocalProvider;
pub use remote::RemoteProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Sentiment category assigned to a sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Risk,
    Informative,
}

impl SentimentLabel {
    /// Lowercase form used for wrapper attributes and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Risk => "risk",
            SentimentLabel::Informative => "informative",
        }
    }

    /// Normalize a raw provider label. Accepts any casing; "warning" maps to
    /// `Risk`.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "POSITIVE" => Some(SentimentLabel::Positive),
            "NEGATIVE" => Some(SentimentLabel::Negative),
            "NEUTRAL" => Some(SentimentLabel::Neutral),
            "RISK" | "WARNING" => Some(SentimentLabel::Risk),
            "INFORMATIVE" => Some(SentimentLabel::Informative),
            _ => None,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A classification result for one sentence.
///
/// Immutable once produced. `error` marks a transient provider failure; such
/// results are surfaced to the caller but never cached, so a failed call does
/// not poison future classification of the same text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub score: f32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
}

impl Sentiment {
    pub fn new(label: SentimentLabel, score: f32) -> Self {
        Self {
            label,
            score,
            error: false,
        }
    }

    /// The do-nothing result
    pub fn neutral() -> Self {
        Self::new(SentimentLabel::Neutral, 0.0)
    }

    /// Neutral flagged as a transient failure — returned, never cached
    pub fn transient_failure() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
            error: true,
        }
    }
}

/// Map a raw provider payload entry to a category.
///
/// Label string wins when it names a known category; otherwise score
/// thresholds apply (risk over 0.6, then ±0.35 for positive/negative).
pub fn map_to_category(label: Option<&str>, score: f32, risk: Option<f32>) -> SentimentLabel {
    if let Some(raw) = label {
        if let Some(category) = SentimentLabel::from_raw(raw) {
            return category;
        }
    }
    if risk.map_or(false, |r| r > 0.6) {
        return SentimentLabel::Risk;
    }
    if score > 0.35 {
        return SentimentLabel::Positive;
    }
    if score < -0.35 {
        return SentimentLabel::Negative;
    }
    SentimentLabel::Neutral
}

/// The classification capability.
///
/// `classify` is infallible by signature: failures are encoded per-result
/// (`error: true`), one result per input in input order — never a partial
/// batch.
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    /// Prepare the provider. Returns whether it is ready to classify.
    async fn initialize(&self) -> bool;

    /// Classify a batch of sentences
    async fn classify(&self, texts: &[String]) -> Vec<Sentiment>;

    /// Short identifier for logging
    fn name(&self) -> &str;
}

/// Test provider — preconfigured responses and a call counter.
pub struct MockProvider {
    responses: HashMap<String, Sentiment>,
    default: Sentiment,
    fail: bool,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl MockProvider {
    /// A provider answering neutral for everything
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            default: Sentiment::neutral(),
            fail: false,
            calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose every result is a transient failure
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Register a response for a specific text
    pub fn with_response(mut self, text: impl Into<String>, sentiment: Sentiment) -> Self {
        self.responses.insert(text.into(), sentiment);
        self
    }

    /// How many times `classify` was invoked
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every batch of texts seen, in call order
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentProvider for MockProvider {
    async fn initialize(&self) -> bool {
        true
    }

    async fn classify(&self, texts: &[String]) -> Vec<Sentiment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(texts.to_vec());
        texts
            .iter()
            .map(|t| {
                if self.fail {
                    Sentiment::transient_failure()
                } else {
                    self.responses.get(t).cloned().unwrap_or_else(|| self.default.clone())
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
