//! Lazy depth-first traversal.
//!
//! [`TreeWalker`] is a pull-style cursor that can be told to skip the
//! subtree it just yielded.

use super::{Document, NodeId};

/// Pre-order iterator over a subtree, the root included.
pub struct TreeWalker<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
    last: Option<NodeId>,
}

impl<'d> TreeWalker<'d> {
    pub fn new(doc: &'d Document, root: NodeId) -> Self {
        let stack = if doc.contains(root) { vec![root] } else { Vec::new() };
        Self {
            doc,
            stack,
            last: None,
        }
    }

    /// Do not descend into the node most recently returned by `next`.
    pub fn skip_children(&mut self) {
        self.last = None;
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if let Some(last) = self.last.take() {
            self.stack
                .extend(self.doc.children(last).iter().rev().copied());
        }
        let next = self.stack.pop()?;
        self.last = Some(next);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fragment;

    fn sample() -> Document {
        let mut doc = Document::empty();
        let p = doc.instantiate(
            &Fragment::element("p")
                .with_child(Fragment::text("a"))
                .with_child(Fragment::element("em").with_child(Fragment::text("b"))),
        );
        let tail = doc.instantiate(&Fragment::text("c"));
        doc.insert_children(doc.root(), 0, &[p, tail]).unwrap();
        doc
    }

    fn label(doc: &Document, id: NodeId) -> String {
        match (doc.element(id), doc.text(id)) {
            (Some(el), _) => el.tag.clone(),
            (_, Some(text)) => text.value.clone(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn walker_skips_subtrees() {
        let doc = sample();
        let mut walker = doc.descendants(doc.root());
        let mut seen = Vec::new();
        while let Some(id) = walker.next() {
            let name = label(&doc, id);
            if name == "em" {
                walker.skip_children();
            }
            seen.push(name);
        }
        assert_eq!(seen, ["div", "p", "a", "em", "c"]);
    }
}
