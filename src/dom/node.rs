//! Node representation in the document tree

use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a new random NodeId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a NodeId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Element attributes
pub type Attrs = HashMap<String, String>;

/// What a node holds: element structure or raw text
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// An element with a (lowercased) tag, attributes, and ordered children
    Element {
        tag: String,
        attrs: Attrs,
        children: Vec<NodeId>,
    },
    /// A text node carrying its content
    Text { content: String },
}

/// A node in the document tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Parent node, `None` while detached (or for the root)
    pub parent: Option<NodeId>,
    /// Element or text payload
    pub kind: NodeKind,
}

impl Node {
    /// Whether this node is a text node
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. })
    }

    /// Element tag, if this is an element
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text { .. } => None,
        }
    }

    /// Text content, if this is a text node
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { content } => Some(content),
            NodeKind::Element { .. } => None,
        }
    }
}
