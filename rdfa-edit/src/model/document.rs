use crate::Error;
use crate::position::Position;

use super::walk::TreeWalker;
use super::{Element, Fragment, Node, NodeId, NodeKind, Text, char_to_byte};

/// Arena-backed document tree.
///
/// The root lives at [`NodeId::ROOT`]. Nodes created with
/// [`Document::create`] start out detached; they become part of the tree once
/// inserted under an attached parent. Removing a node frees its slot, so a
/// stale id resolves to [`Error::NodeNotFound`] rather than to another node.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Option<Node>>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            nodes: vec![Some(Node::new(NodeKind::Element(root)))],
        }
    }

    /// An empty editing root, the shape used for fragment documents.
    pub fn empty() -> Self {
        Self::new(Element::new("div"))
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, Error> {
        self.get(id).ok_or(Error::NodeNotFound { node: id })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, Error> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(Error::NodeNotFound { node: id })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.index()).and_then(Option::as_mut) {
            Some(Node {
                kind: NodeKind::Element(el),
                ..
            }) => Some(el),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&Text> {
        self.get(id).and_then(Node::as_text)
    }

    pub(crate) fn text_mut(&mut self, id: NodeId) -> Option<&mut Text> {
        match self.nodes.get_mut(id.index()).and_then(Option::as_mut) {
            Some(Node {
                kind: NodeKind::Text(text),
                ..
            }) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or_default()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Ancestors from the immediate parent up to the node's root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// The topmost ancestor of `id` (itself when parentless).
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(id) && self.root_of(id) == self.root()
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// All attached nodes in document order, root first.
    pub fn descendants(&self, id: NodeId) -> TreeWalker<'_> {
        TreeWalker::new(self, id)
    }

    /// Allocates a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Some(Node::new(kind)));
        id
    }

    /// Allocates a detached subtree mirroring `fragment`.
    pub fn instantiate(&mut self, fragment: &Fragment) -> NodeId {
        match fragment {
            Fragment::Text(text) => self.create(NodeKind::Text(text.clone())),
            Fragment::Element { element, children } => {
                let id = self.create(NodeKind::Element(element.clone()));
                let child_ids: Vec<NodeId> =
                    children.iter().map(|c| self.instantiate(c)).collect();
                for &child in &child_ids {
                    if let Some(Some(node)) = self.nodes.get_mut(child.index()) {
                        node.parent = Some(id);
                    }
                }
                if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
                    node.children = child_ids;
                }
                id
            }
        }
    }

    /// Captures an owned copy of the subtree at `id`.
    pub fn snapshot(&self, id: NodeId) -> Result<Fragment, Error> {
        let node = self.node(id)?;
        Ok(match &node.kind {
            NodeKind::Text(text) => Fragment::Text(text.clone()),
            NodeKind::Element(el) => Fragment::Element {
                element: el.clone(),
                children: node
                    .children
                    .iter()
                    .map(|&c| self.snapshot(c))
                    .collect::<Result<_, _>>()?,
            },
        })
    }

    /// Inserts detached nodes as children of `parent` starting at `index`.
    pub fn insert_children(
        &mut self,
        parent: NodeId,
        index: usize,
        ids: &[NodeId],
    ) -> Result<(), Error> {
        let parent_node = self.node(parent)?;
        if parent_node.is_text() {
            return Err(Error::NotAnElement { node: parent });
        }
        if index > parent_node.children.len() {
            return Err(Error::ChildIndexOutOfBounds {
                node: parent,
                index,
            });
        }
        for &id in ids {
            let node = self.node(id)?;
            if node.parent.is_some() || id == self.root() {
                return Err(Error::NodeAttached { node: id });
            }
            if id == parent || self.ancestors(parent).any(|a| a == id) {
                return Err(Error::CyclicInsertion { node: id });
            }
        }

        for &id in ids {
            self.node_mut(id)?.parent = Some(parent);
        }
        let parent_node = self.node_mut(parent)?;
        parent_node.children.splice(index..index, ids.iter().copied());
        Ok(())
    }

    /// Unlinks `id` from its parent; the subtree stays allocated.
    pub fn detach(&mut self, id: NodeId) -> Result<(), Error> {
        let parent = self.node(id)?.parent.ok_or(Error::NoParent { node: id })?;
        self.node_mut(parent)?.children.retain(|&c| c != id);
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    /// Unlinks and frees the subtree at `id`, returning what it held.
    pub fn discard(&mut self, id: NodeId) -> Result<Fragment, Error> {
        let snapshot = self.snapshot(id)?;
        if self.node(id)?.parent.is_some() {
            self.detach(id)?;
        }
        self.free(id);
        Ok(snapshot)
    }

    fn free(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.free(child);
        }
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            *slot = None;
        }
    }

    /// Size of a node in absolute addressing: opening and closing token
    /// plus content for elements, the character count for text.
    pub fn node_size(&self, id: NodeId) -> usize {
        match self.get(id) {
            Some(Node {
                kind: NodeKind::Text(text),
                ..
            }) => text.len(),
            Some(_) => self.content_size(id) + 2,
            None => 0,
        }
    }

    pub fn content_size(&self, id: NodeId) -> usize {
        self.children(id).iter().map(|&c| self.node_size(c)).sum()
    }

    /// Position directly before `id`.
    pub fn node_start(&self, id: NodeId) -> Result<Position, Error> {
        let parent = self.node(id)?.parent.ok_or(Error::NoParent { node: id })?;
        let content_start = self.content_start(parent)?;
        let preceding: usize = self
            .children(parent)
            .iter()
            .take_while(|&&c| c != id)
            .map(|&c| self.node_size(c))
            .sum();
        Ok(content_start.shifted(preceding))
    }

    /// Position directly after `id`.
    pub fn node_end(&self, id: NodeId) -> Result<Position, Error> {
        Ok(self.node_start(id)?.shifted(self.node_size(id)))
    }

    /// First position inside an element's content.
    pub fn content_start(&self, id: NodeId) -> Result<Position, Error> {
        let node = self.node(id)?;
        if node.is_text() {
            return Err(Error::NotAnElement { node: id });
        }
        match node.parent {
            None => Ok(Position::in_root(id, 0)),
            Some(_) => Ok(self.node_start(id)?.shifted(1)),
        }
    }

    /// Last position inside an element's content.
    pub fn content_end(&self, id: NodeId) -> Result<Position, Error> {
        Ok(self.content_start(id)?.shifted(self.content_size(id)))
    }

    /// Concatenated text of every text node under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(&text.value);
            }
        }
        out
    }

    /// Splits a text node at a character offset, returning the new right
    /// half. Offsets at either end split nothing and return `None`.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<Option<NodeId>, Error> {
        let text = self.text(id).ok_or(Error::NotText { node: id })?;
        let len = text.len();
        if offset > len {
            return Err(Error::TextOffsetOutOfBounds { node: id, offset });
        }
        if offset == 0 || offset == len {
            return Ok(None);
        }
        let parent = self.node(id)?.parent.ok_or(Error::NoParent { node: id })?;
        let index = self
            .index_in_parent(id)
            .ok_or(Error::NoParent { node: id })?;

        let text = self.text_mut(id).ok_or(Error::NotText { node: id })?;
        let byte = char_to_byte(&text.value, offset);
        let right_value = text.value.split_off(byte);
        let right = Text::with_marks(right_value, text.marks.clone());

        let right_id = self.create(NodeKind::Text(right));
        self.insert_children(parent, index + 1, &[right_id])?;
        Ok(Some(right_id))
    }

    /// Splits an element before the child at `index`. The children from
    /// `index` on move to a new sibling directly after the element, which
    /// receives a copy of its attributes.
    pub fn split_element(&mut self, id: NodeId, index: usize) -> Result<NodeId, Error> {
        let element = self.element(id).ok_or(Error::NotAnElement { node: id })?;
        if !element.is_splittable() {
            return Err(Error::NotSplittable { node: id });
        }
        let parent = self.node(id)?.parent.ok_or(Error::NoParent { node: id })?;
        let position = self
            .index_in_parent(id)
            .ok_or(Error::NoParent { node: id })?;
        if index > self.children(id).len() {
            return Err(Error::ChildIndexOutOfBounds { node: id, index });
        }

        let copy = Element {
            tag: element.tag.clone(),
            attrs: element.attrs.clone(),
            rdfa: None,
        };
        let right = self.create(NodeKind::Element(copy));
        let moved = self.node_mut(id)?.children.split_off(index);
        for &child in &moved {
            self.node_mut(child)?.parent = Some(right);
        }
        self.node_mut(right)?.children = moved;
        self.insert_children(parent, position + 1, &[right])?;
        Ok(right)
    }

    /// Whether two nodes are adjacent-mergeable text nodes.
    pub fn can_merge(&self, left: NodeId, right: NodeId) -> bool {
        match (self.text(left), self.text(right)) {
            (Some(l), Some(r)) => l.marks == r.marks,
            _ => false,
        }
    }

    /// Merges `right` into `left`; `right` is freed.
    pub(crate) fn merge_pair(&mut self, left: NodeId, right: NodeId) -> Result<(), Error> {
        let value = self
            .text(right)
            .ok_or(Error::NotText { node: right })?
            .value
            .clone();
        self.text_mut(left)
            .ok_or(Error::NotText { node: left })?
            .value
            .push_str(&value);
        self.discard(right)?;
        Ok(())
    }

    /// Merges mergeable text siblings among `parent`'s children in the
    /// inclusive index window `[from, to]`. Returns the surviving nodes that
    /// absorbed a neighbour.
    pub fn merge_text_run(
        &mut self,
        parent: NodeId,
        from: usize,
        to: usize,
    ) -> Result<Vec<NodeId>, Error> {
        let mut survivors = Vec::new();
        let mut index = from;
        let mut last = to;
        while index < last && index + 1 < self.children(parent).len() {
            let left = self.children(parent)[index];
            let right = self.children(parent)[index + 1];
            if self.can_merge(left, right) {
                self.merge_pair(left, right)?;
                if !survivors.contains(&left) {
                    survivors.push(left);
                }
                last -= 1;
            } else {
                index += 1;
            }
        }
        Ok(survivors)
    }

    /// Merges every adjacent mergeable text pair under `parent`.
    /// Running this twice has no further effect.
    pub fn merge_text_nodes(&mut self, parent: NodeId) -> Result<Vec<NodeId>, Error> {
        let count = self.children(parent).len();
        if count < 2 {
            return Ok(Vec::new());
        }
        self.merge_text_run(parent, 0, count - 1)
    }

    /// Merges a node with mergeable neighbours on either side.
    pub fn merge_around(&mut self, id: NodeId) -> Result<NodeId, Error> {
        let Some(parent) = self.parent(id) else {
            return Ok(id);
        };
        let Some(index) = self.index_in_parent(id) else {
            return Ok(id);
        };
        let from = index.saturating_sub(1);
        let survivors = self.merge_text_run(parent, from, index + 1)?;
        Ok(survivors
            .first()
            .copied()
            .filter(|_| !self.contains(id))
            .unwrap_or(id))
    }

    /// Iterator over attached elements carrying an RDFa role.
    pub fn rdfa_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(self.root())
            .filter(|&id| self.element(id).is_some_and(|el| el.rdfa.is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mark, MarkSet};

    fn doc_with(children: &[Fragment]) -> Document {
        let mut doc = Document::empty();
        let ids: Vec<NodeId> = children.iter().map(|f| doc.instantiate(f)).collect();
        doc.insert_children(doc.root(), 0, &ids).unwrap();
        doc
    }

    #[test]
    fn sizes_follow_absolute_addressing() {
        let doc = doc_with(&[
            Fragment::text("ab"),
            Fragment::element("p").with_child(Fragment::text("cde")),
        ]);
        let p = doc.children(doc.root())[1];
        assert_eq!(doc.node_size(p), 5);
        assert_eq!(doc.content_size(doc.root()), 7);
        assert_eq!(doc.node_start(p).unwrap().offset(), 2);
        assert_eq!(doc.content_start(p).unwrap().offset(), 3);
        assert_eq!(doc.node_end(p).unwrap().offset(), 7);
    }

    #[test]
    fn split_text_keeps_marks() {
        let marks: MarkSet = [Mark::new("strong")].into_iter().collect();
        let mut doc = doc_with(&[Fragment::Text(Text::with_marks("hello", marks.clone()))]);
        let text = doc.children(doc.root())[0];
        let right = doc.split_text(text, 2).unwrap().unwrap();
        assert_eq!(doc.text(text).unwrap().value, "he");
        assert_eq!(doc.text(right).unwrap().value, "llo");
        assert_eq!(doc.text(right).unwrap().marks, marks);
        assert_eq!(doc.split_text(text, 0).unwrap(), None);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut doc = doc_with(&[
            Fragment::text("a"),
            Fragment::text("b"),
            Fragment::element("br"),
            Fragment::text("c"),
            Fragment::text("d"),
        ]);
        doc.merge_text_nodes(doc.root()).unwrap();
        let once = doc.snapshot(doc.root()).unwrap();
        doc.merge_text_nodes(doc.root()).unwrap();
        let twice = doc.snapshot(doc.root()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(doc.children(doc.root()).len(), 3);
        assert_eq!(doc.text_content(doc.root()), "abcd");
    }

    #[test]
    fn discard_frees_subtree() {
        let mut doc = doc_with(&[Fragment::element("p").with_child(Fragment::text("x"))]);
        let p = doc.children(doc.root())[0];
        let text = doc.children(p)[0];
        let snapshot = doc.discard(p).unwrap();
        assert!(!doc.contains(p));
        assert!(!doc.contains(text));
        assert_eq!(snapshot.text_content(), "x");
    }

    #[test]
    fn insertion_rejects_cycles() {
        let mut doc = doc_with(&[Fragment::element("p")]);
        let p = doc.children(doc.root())[0];
        doc.detach(p).unwrap();
        let inner = doc.instantiate(&Fragment::element("span"));
        doc.insert_children(p, 0, &[inner]).unwrap();
        doc.detach(inner).unwrap();
        assert!(matches!(
            doc.insert_children(p, 0, &[p]),
            Err(Error::CyclicInsertion { .. })
        ));
    }
}
