//! Local provider — deterministic keyword scoring, no I/O
//!
//! Each category carries a keyword list, an accumulation weight, and a fixed
//! output score. Every keyword hit adds the category weight; the highest
//! total wins. Weights order actionable categories above plain praise, so a
//! sentence like "Great, please see the attached report." lands on
//! `Informative` rather than `Positive`.

use super::{Sentiment, SentimentLabel, SentimentProvider};
use async_trait::async_trait;

struct KeywordCategory {
    label: SentimentLabel,
    keywords: &'static [&'static str],
    weight: f32,
    score: f32,
}

const CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        label: SentimentLabel::Risk,
        keywords: &["warning", "caution", "legal", "risk"],
        weight: 1.0,
        score: 0.7,
    },
    KeywordCategory {
        label: SentimentLabel::Negative,
        keywords: &["disappointing", "bad", "terrible", "awful"],
        weight: 0.9,
        score: -0.8,
    },
    KeywordCategory {
        label: SentimentLabel::Informative,
        keywords: &["details", "report", "explains", "finding", "information"],
        weight: 0.8,
        score: 0.6,
    },
    KeywordCategory {
        label: SentimentLabel::Positive,
        keywords: &["fantastic", "great", "excellent", "happy"],
        weight: 0.7,
        score: 0.9,
    },
];

fn score_sentence(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let mut best: Option<(&KeywordCategory, f32)> = None;
    for category in CATEGORIES {
        let hits = category
            .keywords
            .iter()
            .filter(|k| lower.contains(**k))
            .count();
        if hits == 0 {
            continue;
        }
        let total = hits as f32 * category.weight;
        if best.map_or(true, |(_, t)| total > t) {
            best = Some((category, total));
        }
    }
    match best {
        Some((category, _)) => Sentiment::new(category.label, category.score),
        None => Sentiment::new(SentimentLabel::Neutral, 0.1),
    }
}

/// Heuristic offline classifier — the default provider and the fallback when
/// remote classification is unavailable or unconfigured.
#[derive(Debug, Default)]
pub struct LocalProvider;

impl LocalProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SentimentProvider for LocalProvider {
    async fn initialize(&self) -> bool {
        true
    }

    async fn classify(&self, texts: &[String]) -> Vec<Sentiment> {
        texts.iter().map(|t| score_sentence(t)).collect()
    }

    fn name(&self) -> &str {
        "local"
    }
}
