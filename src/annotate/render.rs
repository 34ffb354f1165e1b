//! Highlight rendering — painting classifications back into the tree
//!
//! The renderer replaces a matched text run with (before?, wrapper, after?)
//! and never nests a wrapper inside another. Every precondition failure is a
//! silent skip: the scan pipeline degrades to "no annotation for this unit",
//! it never aborts.

use super::{wrapped_in_annotation, ANNOTATION_ATTR, COLOR_ATTR, WRAPPER_TAG};
use crate::dom::{Document, NodeId};
use crate::provider::{Sentiment, SentimentLabel};
use thiserror::Error;
use tracing::debug;

/// Errors from the manual highlight path. The automatic pipeline path skips
/// instead of erroring.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("target node is gone or not a text node")]
    TargetGone,

    #[error("target is already inside an annotation")]
    AlreadyAnnotated,

    #[error("range does not fall on character boundaries of the target")]
    InvalidRange,
}

/// How a manual highlight is styled
#[derive(Debug, Clone, PartialEq)]
pub enum HighlightStyle {
    Sentiment(SentimentLabel),
    Color(String),
}

impl HighlightStyle {
    fn attr(&self) -> (&'static str, &str) {
        match self {
            HighlightStyle::Sentiment(label) => (ANNOTATION_ATTR, label.as_str()),
            HighlightStyle::Color(color) => (COLOR_ATTR, color),
        }
    }
}

/// A byte range within one text node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextRange {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

/// What a successful render produced
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSpan {
    /// The wrapper element carrying the annotation attribute
    pub wrapper: NodeId,
    /// Text split off before the match, if any
    pub before: Option<NodeId>,
    /// Text split off after the match, if any
    pub after: Option<NodeId>,
}

/// Render a classification over `matched` within the text node `node`.
///
/// Skips (returning `None`) when the node is gone, detached, already inside
/// an annotation, or no longer contains `matched` — the text may have changed
/// between scheduling and render. Skipped renders are not retried.
pub fn render(
    doc: &mut Document,
    node: NodeId,
    matched: &str,
    result: &Sentiment,
) -> Option<RenderedSpan> {
    let Some(text) = doc.text(node) else {
        debug!(%node, "render skipped: node gone");
        return None;
    };
    let text = text.to_string();
    if !doc.is_attached(node) {
        debug!(%node, "render skipped: node detached");
        return None;
    }
    if wrapped_in_annotation(doc, node) {
        debug!(%node, "render skipped: already inside an annotation");
        return None;
    }
    let Some(start) = text.find(matched) else {
        debug!(%node, "render skipped: matched text no longer present");
        return None;
    };
    splice(
        doc,
        node,
        &text,
        start,
        start + matched.len(),
        (ANNOTATION_ATTR, result.label.as_str()),
    )
}

/// Wrap an explicit range within a text node (the interactive path).
///
/// Unlike `render`, a range that falls inside an existing annotation is a
/// hard rejection, not a silent skip.
pub fn highlight_range(
    doc: &mut Document,
    range: TextRange,
    style: &HighlightStyle,
) -> Result<NodeId, RenderError> {
    let Some(text) = doc.text(range.node) else {
        return Err(RenderError::TargetGone);
    };
    let text = text.to_string();
    if !doc.is_attached(range.node) {
        return Err(RenderError::TargetGone);
    }
    if wrapped_in_annotation(doc, range.node) {
        return Err(RenderError::AlreadyAnnotated);
    }
    if range.start >= range.end
        || range.end > text.len()
        || !text.is_char_boundary(range.start)
        || !text.is_char_boundary(range.end)
    {
        return Err(RenderError::InvalidRange);
    }
    let (attr, value) = style.attr();
    let value = value.to_string();
    splice(doc, range.node, &text, range.start, range.end, (attr, &value))
        .map(|span| span.wrapper)
        .ok_or(RenderError::TargetGone)
}

/// Fallback when no live range is available: wrap only the first textual
/// occurrence of `needle` found in document order. A single user action never
/// edits more than one location.
pub fn highlight_text(
    doc: &mut Document,
    needle: &str,
    style: &HighlightStyle,
) -> Option<NodeId> {
    if needle.is_empty() {
        return None;
    }
    for id in doc.text_descendants(doc.root()) {
        if wrapped_in_annotation(doc, id) {
            continue;
        }
        let Some(text) = doc.text(id) else { continue };
        if let Some(start) = text.find(needle) {
            let range = TextRange {
                node: id,
                start,
                end: start + needle.len(),
            };
            return highlight_range(doc, range, style).ok();
        }
    }
    debug!(%needle, "fallback highlight found no occurrence");
    None
}

fn splice(
    doc: &mut Document,
    node: NodeId,
    text: &str,
    start: usize,
    end: usize,
    (attr, value): (&str, &str),
) -> Option<RenderedSpan> {
    let before_text = &text[..start];
    let matched = &text[start..end];
    let after_text = &text[end..];

    let wrapper = doc.create_element(WRAPPER_TAG);
    doc.set_attr(wrapper, attr, value).ok()?;
    let inner = doc.create_text(matched);
    doc.append_child(wrapper, inner).ok()?;

    let mut replacements = Vec::with_capacity(3);
    let before = (!before_text.is_empty()).then(|| doc.create_text(before_text));
    if let Some(b) = before {
        replacements.push(b);
    }
    replacements.push(wrapper);
    let after = (!after_text.is_empty()).then(|| doc.create_text(after_text));
    if let Some(a) = after {
        replacements.push(a);
    }

    doc.replace_with(node, replacements).ok()?;
    Some(RenderedSpan {
        wrapper,
        before,
        after,
    })
}

/// Unwrap every still-present wrapper back to plain text.
///
/// Idempotent: a second pass finds nothing and returns 0.
pub fn unwrap_all(doc: &mut Document) -> usize {
    let wrappers: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| {
            doc.attr(id, ANNOTATION_ATTR).is_some() || doc.attr(id, COLOR_ATTR).is_some()
        })
        .collect();
    let mut unwrapped = 0;
    for wrapper in wrappers {
        if !doc.contains(wrapper) {
            continue;
        }
        let text = doc.text_content(wrapper);
        let replacement = doc.create_text(&text);
        if doc.replace_with(wrapper, vec![replacement]).is_ok() {
            unwrapped += 1;
        }
    }
    unwrapped
}
