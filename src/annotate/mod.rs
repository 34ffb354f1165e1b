//! The incremental annotation pipeline
//!
//! Scan Scheduler → Segmenter → Dispatcher → (cache | provider) → Renderer,
//! with the Mutation Reconciler re-entering the scheduler for added subtrees.

pub mod dispatch;
pub mod reconcile;
pub mod render;
pub mod scan;
pub mod segment;

pub use dispatch::Dispatcher;
pub use reconcile::MutationReconciler;
pub use render::{
    highlight_range, highlight_text, render, unwrap_all, HighlightStyle, RenderError,
    RenderedSpan, TextRange,
};
pub use scan::{ScanPolicy, ScanScheduler, TextUnit};
pub use segment::{fingerprint, segment, Sentence};

use crate::dom::{Document, NodeId};

/// Tag used for highlight wrappers
pub const WRAPPER_TAG: &str = "span";
/// Attribute carrying the classification label; also how already-annotated
/// regions are recognized
pub const ANNOTATION_ATTR: &str = "data-annotation";
/// Attribute carrying a raw color for manual highlights
pub const COLOR_ATTR: &str = "data-color";

/// Whether any ancestor of `id` is a highlight wrapper
pub(crate) fn wrapped_in_annotation(doc: &Document, id: NodeId) -> bool {
    let mut cur = doc.parent(id);
    while let Some(p) = cur {
        if doc.attr(p, ANNOTATION_ATTR).is_some() || doc.attr(p, COLOR_ATTR).is_some() {
            return true;
        }
        cur = doc.parent(p);
    }
    false
}
