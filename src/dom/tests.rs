//! Document tree tests

use super::*;

fn doc_with_paragraph(text: &str) -> (Document, NodeId, NodeId) {
    let mut doc = Document::new();
    let p = doc.create_element("p");
    let t = doc.create_text(text);
    doc.append_child(doc.root(), p).unwrap();
    doc.append_child(p, t).unwrap();
    (doc, p, t)
}

#[test]
fn append_builds_tree() {
    let (doc, p, t) = doc_with_paragraph("hello world");
    assert_eq!(doc.parent(t), Some(p));
    assert_eq!(doc.parent(p), Some(doc.root()));
    assert!(doc.is_attached(t));
    assert_eq!(doc.text_content(doc.root()), "hello world");
}

#[test]
fn detached_nodes_are_not_attached() {
    let mut doc = Document::new();
    let orphan = doc.create_text("floating");
    assert!(doc.contains(orphan));
    assert!(!doc.is_attached(orphan));
}

#[test]
fn detach_drops_subtree_from_arena() {
    let (mut doc, p, t) = doc_with_paragraph("gone soon");
    doc.detach(p).unwrap();
    assert!(!doc.contains(p));
    assert!(!doc.contains(t));
    assert!(doc.children(doc.root()).is_empty());
}

#[test]
fn append_moves_existing_child() {
    let (mut doc, p, t) = doc_with_paragraph("moving");
    let q = doc.create_element("p");
    doc.append_child(doc.root(), q).unwrap();
    doc.append_child(q, t).unwrap();
    assert_eq!(doc.parent(t), Some(q));
    assert!(doc.children(p).is_empty());
}

#[test]
fn append_rejects_cycles() {
    let (mut doc, p, _) = doc_with_paragraph("loop");
    let err = doc.append_child(p, doc.root()).unwrap_err();
    assert!(matches!(err, DomError::CircularInsertion(_)));
}

#[test]
fn replace_with_splices_in_place() {
    let (mut doc, p, t) = doc_with_paragraph("abc");
    let left = doc.create_text("a");
    let mid = doc.create_element("span");
    let right = doc.create_text("c");
    doc.replace_with(t, vec![left, mid, right]).unwrap();
    assert_eq!(doc.children(p), &[left, mid, right]);
    assert!(!doc.contains(t));
    assert_eq!(doc.parent(mid), Some(p));
}

#[test]
fn replace_detached_target_fails() {
    let mut doc = Document::new();
    let orphan = doc.create_text("x");
    let repl = doc.create_text("y");
    let err = doc.replace_with(orphan, vec![repl]).unwrap_err();
    assert_eq!(err, DomError::Detached(orphan));
}

#[test]
fn text_descendants_in_document_order() {
    let mut doc = Document::new();
    let a = doc.create_element("p");
    let b = doc.create_element("p");
    let t1 = doc.create_text("one");
    let t2 = doc.create_text("two");
    let t3 = doc.create_text("three");
    doc.append_child(doc.root(), a).unwrap();
    doc.append_child(doc.root(), b).unwrap();
    doc.append_child(a, t1).unwrap();
    doc.append_child(a, t2).unwrap();
    doc.append_child(b, t3).unwrap();
    assert_eq!(doc.text_descendants(doc.root()), vec![t1, t2, t3]);
}

#[test]
fn text_descendants_includes_text_root() {
    let (doc, _, t) = doc_with_paragraph("just me");
    assert_eq!(doc.text_descendants(t), vec![t]);
}

#[tokio::test]
async fn append_notifies_subscribers() {
    let mut doc = Document::new();
    let mut events = doc.subscribe();
    let p = doc.create_element("p");
    doc.append_child(doc.root(), p).unwrap();
    assert_eq!(events.recv().await, Some(MutationEvent::SubtreeAdded(p)));
}

#[tokio::test]
async fn detached_appends_are_not_observed() {
    let mut doc = Document::new();
    let mut events = doc.subscribe();
    let orphan = doc.create_element("div");
    let t = doc.create_text("quiet");
    doc.append_child(orphan, t).unwrap();
    // Attaching the subtree root is the first observable event.
    doc.append_child(doc.root(), orphan).unwrap();
    assert_eq!(
        events.recv().await,
        Some(MutationEvent::SubtreeAdded(orphan))
    );
    assert!(events.try_recv().is_err());
}

#[test]
fn attrs_roundtrip() {
    let mut doc = Document::new();
    let span = doc.create_element("SPAN");
    doc.set_attr(span, "data-annotation", "positive").unwrap();
    assert_eq!(doc.tag(span), Some("span"));
    assert_eq!(doc.attr(span, "data-annotation"), Some("positive"));
    assert_eq!(doc.attr(span, "data-color"), None);
}
