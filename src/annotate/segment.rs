//! Sentence segmentation and fingerprinting
//!
//! Pure functions, no state carried between calls.

use uuid::Uuid;

/// Namespace for sentence fingerprints
const FINGERPRINT_NAMESPACE: Uuid = Uuid::from_u128(0x9f2c_41d6_7a03_4b8e_b15a_c4de_0f62_8a17);

/// A sentence candidate bound to the batch unit it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub text: String,
    /// Deterministic cache key for `text`
    pub fingerprint: String,
    /// Index of the source unit within its batch
    pub unit: usize,
}

impl Sentence {
    pub fn new(text: impl Into<String>, unit: usize) -> Self {
        let text = text.into();
        let fingerprint = fingerprint(&text);
        Self {
            text,
            fingerprint,
            unit,
        }
    }
}

/// Deterministic, order-sensitive hash of sentence text
pub fn fingerprint(text: &str) -> String {
    Uuid::new_v5(&FINGERPRINT_NAMESPACE, text.as_bytes()).to_string()
}

/// Split `text` into sentence candidates.
///
/// A candidate runs up to and including a terminal punctuation run
/// (`.`, `!`, `?`); unterminated trailing text is dropped. Candidates are
/// trimmed and must contain at least `min_len` characters and at least one
/// non-punctuation character.
pub fn segment(text: &str, min_len: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_terminal = false;
    for (i, ch) in text.char_indices() {
        let terminal = matches!(ch, '.' | '!' | '?');
        if in_terminal && !terminal {
            push_candidate(&mut out, &text[start..i], min_len);
            start = i;
            in_terminal = false;
        } else if terminal {
            in_terminal = true;
        }
    }
    if in_terminal {
        push_candidate(&mut out, &text[start..], min_len);
    }
    out
}

fn push_candidate(out: &mut Vec<String>, raw: &str, min_len: usize) {
    let trimmed = raw.trim();
    if trimmed.chars().count() < min_len {
        return;
    }
    if !trimmed.chars().any(|c| !matches!(c, '.' | '!' | '?')) {
        return;
    }
    out.push(trimmed.to_string());
}
