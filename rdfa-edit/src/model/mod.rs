//! The editable document tree.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Parent/child relationships are plain id fields, so upward
//! walks (used heavily by the update engine) never fight the borrow checker.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;

use crate::rdfa::attrs::RdfaAttrs;

mod document;
mod fragment;
pub mod html;
pub mod walk;

pub use document::Document;
pub use fragment::Fragment;

/// Stable address of a node inside a [`Document`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The document root always occupies the first arena slot.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An inline annotation applied to a run of text.
///
/// Marks are not a containment relation: they decorate text nodes, and two
/// adjacent text nodes carrying equal mark sets are merged.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mark {
    pub name: String,
    pub attrs: BTreeMap<String, String>,
}

impl Mark {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

pub type MarkSet = BTreeSet<Mark>;

/// An element: tag name, ordered attributes and an optional RDFa role.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: IndexMap<String, String>,
    pub rdfa: Option<RdfaAttrs>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: IndexMap::new(),
            rdfa: None,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Elements carrying an RDFa role or marked non-editable must not be
    /// split in two: both halves would claim the same node identity.
    pub fn is_splittable(&self) -> bool {
        self.rdfa.is_none() && self.attr("contenteditable") != Some("false")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    pub value: String,
    pub marks: MarkSet,
}

impl Text {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            marks: MarkSet::new(),
        }
    }

    pub fn with_marks(value: impl Into<String>, marks: MarkSet) -> Self {
        Self {
            value: value.into(),
            marks,
        }
    }

    /// Length in characters, the unit used for positions inside text.
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Element(Element),
    Text(Text),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }

    /// Units this node occupies in path addressing: 1 for an element,
    /// the character count for text.
    pub fn path_len(&self) -> usize {
        match &self.kind {
            NodeKind::Element(_) => 1,
            NodeKind::Text(text) => text.len(),
        }
    }
}

/// Converts a character offset into a byte offset of `s`.
pub(crate) fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices()
        .nth(chars)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}
