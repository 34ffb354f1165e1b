//! Scan scheduling — which text nodes enter the pipeline, and when
//!
//! The scheduler tracks node identity, not content: a node is enqueued at
//! most once, and marked processed the moment it is drained into a batch,
//! before classification completes. Both identity sets are mutated strictly
//! between suspension points, so two overlapping scans can never both claim
//! the same node.

use super::wrapped_in_annotation;
use crate::dom::{Document, NodeId};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

/// One table governs every scan path — the initial walk and
/// mutation-triggered rescans use identical exclusions.
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    /// Element tags whose text content is never scanned
    pub excluded_tags: HashSet<String>,
    /// Nodes drained per idle slice
    pub batch_size: usize,
    /// Minimum characters for a sentence candidate
    pub min_sentence_len: usize,
    /// Quiet period before a mutation burst is reconciled
    pub debounce: Duration,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            excluded_tags: ["script", "style", "noscript", "textarea", "input"]
                .into_iter()
                .map(String::from)
                .collect(),
            batch_size: 50,
            min_sentence_len: 5,
            debounce: Duration::from_millis(300),
        }
    }
}

/// A text node captured for classification, with its text snapshot.
///
/// Non-owning: detaching the node from the document invalidates the unit,
/// which is then skipped at render time.
#[derive(Debug, Clone)]
pub struct TextUnit {
    pub node: NodeId,
    pub snapshot: String,
}

/// Tracks processed nodes and releases new ones in bounded batches
#[derive(Debug)]
pub struct ScanScheduler {
    policy: ScanPolicy,
    processed: HashSet<NodeId>,
    queued: HashSet<NodeId>,
    queue: VecDeque<NodeId>,
}

impl ScanScheduler {
    pub fn new(policy: ScanPolicy) -> Self {
        Self {
            policy,
            processed: HashSet::new(),
            queued: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// Walk text descendants of `root` and enqueue eligible ones.
    /// Returns how many were added.
    pub fn collect(&mut self, doc: &Document, root: NodeId) -> usize {
        let mut added = 0;
        for id in doc.text_descendants(root) {
            if self.processed.contains(&id) || self.queued.contains(&id) {
                continue;
            }
            if !self.eligible(doc, id) {
                continue;
            }
            self.queued.insert(id);
            self.queue.push_back(id);
            added += 1;
        }
        added
    }

    fn eligible(&self, doc: &Document, id: NodeId) -> bool {
        let Some(text) = doc.text(id) else {
            return false;
        };
        if text.trim().is_empty() {
            return false;
        }
        if self.under_excluded_tag(doc, id) {
            return false;
        }
        if wrapped_in_annotation(doc, id) {
            return false;
        }
        true
    }

    fn under_excluded_tag(&self, doc: &Document, id: NodeId) -> bool {
        let mut cur = doc.parent(id);
        while let Some(p) = cur {
            if let Some(tag) = doc.tag(p) {
                if self.policy.excluded_tags.contains(tag) {
                    return true;
                }
            }
            cur = doc.parent(p);
        }
        false
    }

    /// Drain up to `batch_size` units, marking each processed as it leaves
    /// the queue. Nodes detached while queued are dropped silently.
    pub fn next_batch(&mut self, doc: &Document) -> Vec<TextUnit> {
        let mut batch = Vec::new();
        while batch.len() < self.policy.batch_size {
            let Some(id) = self.queue.pop_front() else {
                break;
            };
            self.queued.remove(&id);
            if !self.processed.insert(id) {
                continue;
            }
            let Some(text) = doc.text(id) else {
                continue;
            };
            batch.push(TextUnit {
                node: id,
                snapshot: text.to_string(),
            });
        }
        batch
    }

    /// Mark a node processed outside the drain path (renderer residue).
    /// Returns whether it was newly marked.
    pub fn mark_processed(&mut self, id: NodeId) -> bool {
        self.processed.insert(id)
    }

    pub fn is_processed(&self, id: NodeId) -> bool {
        self.processed.contains(&id)
    }

    /// Units waiting to be drained
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drop identity-set entries whose nodes left the document arena.
    /// Detached node ids can never recur, so this only bounds memory.
    pub fn prune_detached(&mut self, doc: &Document) -> usize {
        let before = self.processed.len() + self.queue.len();
        self.processed.retain(|id| doc.contains(*id));
        self.queued.retain(|id| doc.contains(*id));
        self.queue.retain(|id| doc.contains(*id));
        before - (self.processed.len() + self.queue.len())
    }
}

impl Default for ScanScheduler {
    fn default() -> Self {
        Self::new(ScanPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::ANNOTATION_ATTR;
    use crate::dom::Document;

    fn setup(texts: &[&str]) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let mut ids = Vec::new();
        for text in texts {
            let p = doc.create_element("p");
            let t = doc.create_text(text);
            doc.append_child(doc.root(), p).unwrap();
            doc.append_child(p, t).unwrap();
            ids.push(t);
        }
        (doc, ids)
    }

    #[test]
    fn collect_finds_each_node_once() {
        let (doc, ids) = setup(&["First text here.", "Second text here."]);
        let mut sched = ScanScheduler::default();

        assert_eq!(sched.collect(&doc, doc.root()), 2);
        // Re-collecting while queued adds nothing.
        assert_eq!(sched.collect(&doc, doc.root()), 0);

        let batch = sched.next_batch(&doc);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].node, ids[0]);

        // Drained nodes are processed and never re-enqueued.
        assert_eq!(sched.collect(&doc, doc.root()), 0);
        assert!(sched.is_processed(ids[0]));
    }

    #[test]
    fn batches_are_bounded() {
        let texts: Vec<String> = (0..7).map(|i| format!("Sentence number {i}.")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let (doc, _) = setup(&refs);

        let mut sched = ScanScheduler::new(ScanPolicy {
            batch_size: 3,
            ..ScanPolicy::default()
        });
        sched.collect(&doc, doc.root());

        assert_eq!(sched.next_batch(&doc).len(), 3);
        assert_eq!(sched.next_batch(&doc).len(), 3);
        assert_eq!(sched.next_batch(&doc).len(), 1);
        assert!(sched.next_batch(&doc).is_empty());
    }

    #[test]
    fn excluded_tags_are_skipped_at_any_depth() {
        let mut doc = Document::new();
        let script = doc.create_element("script");
        let inner = doc.create_element("span");
        let t = doc.create_text("var x = 1; should never be scanned.");
        doc.append_child(doc.root(), script).unwrap();
        doc.append_child(script, inner).unwrap();
        doc.append_child(inner, t).unwrap();

        let mut sched = ScanScheduler::default();
        assert_eq!(sched.collect(&doc, doc.root()), 0);
    }

    #[test]
    fn whitespace_only_nodes_are_skipped() {
        let (doc, _) = setup(&["   \n\t  "]);
        let mut sched = ScanScheduler::default();
        assert_eq!(sched.collect(&doc, doc.root()), 0);
    }

    #[test]
    fn annotated_regions_are_skipped() {
        let mut doc = Document::new();
        let span = doc.create_element("span");
        doc.set_attr(span, ANNOTATION_ATTR, "positive").unwrap();
        let t = doc.create_text("Already classified sentence.");
        doc.append_child(doc.root(), span).unwrap();
        doc.append_child(span, t).unwrap();

        let mut sched = ScanScheduler::default();
        assert_eq!(sched.collect(&doc, doc.root()), 0);
    }

    #[test]
    fn node_detached_while_queued_is_dropped() {
        let (mut doc, ids) = setup(&["Going away soon."]);
        let mut sched = ScanScheduler::default();
        sched.collect(&doc, doc.root());

        doc.detach(ids[0]).unwrap();
        assert!(sched.next_batch(&doc).is_empty());
    }

    #[test]
    fn moved_nodes_are_not_reprocessed() {
        let (mut doc, ids) = setup(&["A sentence that moves."]);
        let mut sched = ScanScheduler::default();
        sched.collect(&doc, doc.root());
        sched.next_batch(&doc);

        // Move the text node under a new parent; identity is unchanged.
        let div = doc.create_element("div");
        doc.append_child(doc.root(), div).unwrap();
        doc.append_child(div, ids[0]).unwrap();

        assert_eq!(sched.collect(&doc, div), 0);
    }

    #[test]
    fn prune_drops_detached_identities() {
        let (mut doc, ids) = setup(&["Short lived sentence."]);
        let mut sched = ScanScheduler::default();
        sched.collect(&doc, doc.root());
        sched.next_batch(&doc);
        assert!(sched.is_processed(ids[0]));

        doc.detach(ids[0]).unwrap();
        assert_eq!(sched.prune_detached(&doc), 1);
        assert!(!sched.is_processed(ids[0]));
    }
}
