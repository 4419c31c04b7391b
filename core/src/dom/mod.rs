//! An owned, addressable XML tree. Materialized matches are stored as a
//! [`Document`] so that predicates and transformers can navigate them freely
//! without touching the reader they were read from.

use std::fmt::{Display, Formatter};

pub mod write;

/// Identifies a node inside a [`Document`]. Nodes are allocated in document
/// order, so comparing two IDs compares their position in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An attribute of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute's qualified name (including a prefix if there is one)
    pub name: String,

    /// The unescaped attribute value
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the attribute's name without its prefix
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }
}

/// The kind of a node and its kind-specific data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node. There is exactly one and it is always the root.
    Document,

    /// An element with its qualified name and attributes
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },

    /// Character data (adjacent text and CDATA sections are merged)
    Text(String),

    /// A comment
    Comment(String),
}

/// A node in the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }
}

/// A self-contained XML tree rooted at a document node. The document node has
/// exactly one element child, the document element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Returns the document node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the document element, i.e. the element the document was built
    /// from
    pub fn document_element(&self) -> NodeId {
        self.nodes[0]
            .children
            .iter()
            .copied()
            .find(|&c| self.node(c).is_element())
            .unwrap_or(NodeId(0))
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Returns the qualified name of an element or [`None`] for other nodes
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the name of an element without its prefix
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id).map(local_part)
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Looks up an attribute of an element by its qualified name
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns the content of a text or comment node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the concatenated text of all text nodes below the given node
    /// (the node's own text for text and comment nodes)
    pub fn string_value(&self, id: NodeId) -> String {
        match &self.node(id).kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => t.clone(),
            NodeKind::Document | NodeKind::Element { .. } => self
                .descendants(id)
                .filter_map(|d| match &self.node(d).kind {
                    NodeKind::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Iterates over all descendants of the given node in document order.
    /// The node itself is not included.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Returns the ancestors of the given node, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            result.push(p);
            current = self.parent(p);
        }
        result
    }

    /// Sets an attribute on an element, replacing an existing value. Does
    /// nothing if the node is not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.0].kind {
            match attributes.iter_mut().find(|a| a.name == name) {
                Some(a) => a.value = value.to_string(),
                None => attributes.push(Attribute::new(name, value)),
            }
        }
    }

    /// Replaces the content of a text node. Does nothing for other nodes.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeKind::Text(t) = &mut self.nodes[id.0].kind {
            *t = text.to_string();
        }
    }
}

/// Pre-order iterator returned by [`Document::descendants`]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Builds a [`Document`] from a sequence of start, end, and content calls
pub struct DocumentBuilder {
    nodes: Vec<Node>,
    open: Vec<NodeId>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            open: vec![NodeId(0)],
        }
    }
}

impl DocumentBuilder {
    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(NodeId(0))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = self.current();
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Opens a new element as a child of the current one
    pub fn start_element(&mut self, name: String, attributes: Vec<Attribute>) -> NodeId {
        let id = self.push(NodeKind::Element { name, attributes });
        self.open.push(id);
        id
    }

    /// Closes the current element
    pub fn end_element(&mut self) {
        if self.open.len() > 1 {
            self.open.pop();
        }
    }

    /// Appends character data to the current element, merging it with a
    /// directly preceding text node
    pub fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let current = self.current();
        if let Some(&last) = self.nodes[current.0].children.last() {
            if let NodeKind::Text(t) = &mut self.nodes[last.0].kind {
                t.push_str(text);
                return;
            }
        }
        self.push(NodeKind::Text(text.to_string()));
    }

    pub fn comment(&mut self, text: &str) {
        self.push(NodeKind::Comment(text.to_string()));
    }

    /// Returns the number of currently open elements
    pub fn depth(&self) -> usize {
        self.open.len() - 1
    }

    pub fn finish(self) -> Document {
        Document { nodes: self.nodes }
    }
}

/// Strips the prefix from a qualified name
pub(crate) fn local_part(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}
