//! Arena-backed document tree with mutation notification
//!
//! The document owns every node in a flat arena keyed by `NodeId`. Structural
//! mutations (`append_child`, `replace_with`) notify subscribers so a
//! reconciler can pick up dynamically added content. Detached subtrees are
//! dropped from the arena entirely, so identity sets held elsewhere cannot
//! resurrect removed nodes.

use super::node::{Attrs, Node, NodeId, NodeKind};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Errors from document tree operations
#[derive(Debug, Error, PartialEq)]
pub enum DomError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("not an element: {0}")]
    NotAnElement(NodeId),

    #[error("not a text node: {0}")]
    NotAText(NodeId),

    #[error("node is detached: {0}")]
    Detached(NodeId),

    #[error("insertion would create a cycle at: {0}")]
    CircularInsertion(NodeId),
}

/// A structural change observers are notified about.
///
/// Only subtree additions are observed. Text edits and attribute changes are
/// not — the scan pipeline re-discovers content through added subtrees only.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent {
    SubtreeAdded(NodeId),
}

/// The document tree
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    observers: Vec<UnboundedSender<MutationEvent>>,
}

impl Document {
    /// Create an empty document with a `body` root element
    pub fn new() -> Self {
        let root = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                id: root,
                parent: None,
                kind: NodeKind::Element {
                    tag: "body".to_string(),
                    attrs: Attrs::new(),
                    children: Vec::new(),
                },
            },
        );
        Self {
            nodes,
            root,
            observers: Vec::new(),
        }
    }

    /// The root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Subscribe to structural mutations
    pub fn subscribe(&mut self) -> UnboundedReceiver<MutationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    fn notify(&mut self, event: MutationEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Create a detached element node. Tags are normalized to lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(
            id,
            Node {
                id,
                parent: None,
                kind: NodeKind::Element {
                    tag: tag.to_lowercase(),
                    attrs: Attrs::new(),
                    children: Vec::new(),
                },
            },
        );
        id
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(
            id,
            Node {
                id,
                parent: None,
                kind: NodeKind::Text {
                    content: content.to_string(),
                },
            },
        );
        id
    }

    /// Whether the arena still holds this node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Borrow a node
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Parent of a node, if any
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Children of an element (empty for text nodes and unknown ids)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Element { children, .. }) => children,
            _ => &[],
        }
    }

    /// Element tag, if `id` is an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).and_then(|n| n.tag())
    }

    /// Text content of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).and_then(|n| n.text())
    }

    /// Overwrite the content of a text node. Not observed.
    pub fn set_text(&mut self, id: NodeId, content: &str) -> Result<(), DomError> {
        match self.nodes.get_mut(&id) {
            Some(Node {
                kind: NodeKind::Text { content: c },
                ..
            }) => {
                *c = content.to_string();
                Ok(())
            }
            Some(_) => Err(DomError::NotAText(id)),
            None => Err(DomError::NodeNotFound(id)),
        }
    }

    /// Read an attribute on an element
    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs.get(key).map(String::as_str),
            _ => None,
        }
    }

    /// Set an attribute on an element. Not observed.
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) -> Result<(), DomError> {
        match self.nodes.get_mut(&id) {
            Some(Node {
                kind: NodeKind::Element { attrs, .. },
                ..
            }) => {
                attrs.insert(key.to_string(), value.to_string());
                Ok(())
            }
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::NodeNotFound(id)),
        }
    }

    /// Whether walking parent links from `id` reaches the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    fn is_ancestor_of(&self, maybe_ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if n == maybe_ancestor {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is moved, keeping its identity.
    /// Subscribers are notified only when the child ends up attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.nodes.contains_key(&child) {
            return Err(DomError::NodeNotFound(child));
        }
        if self.is_ancestor_of(child, parent) {
            return Err(DomError::CircularInsertion(child));
        }
        self.unlink(child);
        match self.nodes.get_mut(&parent) {
            Some(Node {
                kind: NodeKind::Element { children, .. },
                ..
            }) => children.push(child),
            Some(_) => return Err(DomError::NotAnElement(parent)),
            None => return Err(DomError::NodeNotFound(parent)),
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        if self.is_attached(child) {
            self.notify(MutationEvent::SubtreeAdded(child));
        }
        Ok(())
    }

    /// Remove `id` from its parent's child list without touching the arena
    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(Node {
                kind: NodeKind::Element { children, .. },
                ..
            }) = self.nodes.get_mut(&parent)
            {
                children.retain(|c| *c != id);
            }
            if let Some(n) = self.nodes.get_mut(&id) {
                n.parent = None;
            }
        }
    }

    /// Detach a subtree and drop it from the arena
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        if !self.nodes.contains_key(&id) {
            return Err(DomError::NodeNotFound(id));
        }
        self.unlink(id);
        self.drop_subtree(id);
        Ok(())
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.nodes.remove(&cur) {
                if let NodeKind::Element { children, .. } = node.kind {
                    stack.extend(children);
                }
            }
        }
    }

    /// Replace `target` with `replacements` at the same position, dropping
    /// the target subtree. Subscribers see one `SubtreeAdded` per replacement
    /// when the position is attached.
    pub fn replace_with(
        &mut self,
        target: NodeId,
        replacements: Vec<NodeId>,
    ) -> Result<(), DomError> {
        let parent = self
            .nodes
            .get(&target)
            .ok_or(DomError::NodeNotFound(target))?
            .parent
            .ok_or(DomError::Detached(target))?;
        for &r in &replacements {
            if !self.nodes.contains_key(&r) {
                return Err(DomError::NodeNotFound(r));
            }
        }
        match self.nodes.get_mut(&parent) {
            Some(Node {
                kind: NodeKind::Element { children, .. },
                ..
            }) => {
                let idx = children
                    .iter()
                    .position(|c| *c == target)
                    .ok_or(DomError::Detached(target))?;
                children.splice(idx..=idx, replacements.iter().copied());
            }
            Some(_) => return Err(DomError::NotAnElement(parent)),
            None => return Err(DomError::NodeNotFound(parent)),
        }
        for &r in &replacements {
            if let Some(n) = self.nodes.get_mut(&r) {
                n.parent = Some(parent);
            }
        }
        self.drop_subtree(target);
        if self.is_attached(parent) {
            for &r in &replacements {
                self.notify(MutationEvent::SubtreeAdded(r));
            }
        }
        Ok(())
    }

    /// All nodes under `root` (inclusive), depth-first
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(cur) = stack.pop() {
            if !self.nodes.contains_key(&cur) {
                continue;
            }
            out.push(cur);
            let children = self.children(cur);
            for &c in children.iter().rev() {
                stack.push(c);
            }
        }
        out
    }

    /// Text nodes under `root` (inclusive if `root` is itself text), in
    /// document order
    pub fn text_descendants(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.text(*id).is_some())
            .collect()
    }

    /// Concatenated text of all text descendants
    pub fn text_content(&self, root: NodeId) -> String {
        let mut out = String::new();
        for id in self.text_descendants(root) {
            if let Some(t) = self.text(id) {
                out.push_str(t);
            }
        }
        out
    }

    /// Number of nodes in the arena
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
