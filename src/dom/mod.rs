//! Document tree substrate the annotation pipeline operates on

mod document;
mod node;

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex};

pub use document::{Document, DomError, MutationEvent};
pub use node::{Attrs, Node, NodeId, NodeKind};

/// A document shared between the scan pipeline and a reconciler task.
///
/// Guards are only ever held between suspension points, never across them.
pub type SharedDocument = Arc<Mutex<Document>>;

/// Wrap a document for shared use
pub fn shared(doc: Document) -> SharedDocument {
    Arc::new(Mutex::new(doc))
}
