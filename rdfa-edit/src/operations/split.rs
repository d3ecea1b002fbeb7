use crate::Error;
use crate::events::ChangeKind;
use crate::mapping::{Bias, RangeMapper, StepMap};
use crate::model::{Document, NodeId};
use crate::position::{Position, Range};

use super::{Operation, OperationOutcome, split_text_at};

/// Tags an ancestor-chain split never crosses.
pub const DEFAULT_SPLIT_BOUNDARIES: &[&str] = &[
    "html", "body", "div", "section", "article", "blockquote", "ul", "ol", "li", "table",
    "tbody", "thead", "tr", "td", "th",
];

/// Splits the tree at one or both ends of a range.
///
/// Without `split_parent` only the text node under a position is split,
/// which leaves offsets untouched. With it, every ancestor up to the first
/// structural boundary is split as well; each element split adds a closing
/// and an opening token.
#[derive(Clone, Debug)]
pub struct SplitOperation {
    pub range: Range,
    pub split_parent: bool,
    pub boundaries: Vec<String>,
}

impl SplitOperation {
    pub fn new(range: Range, split_parent: bool) -> Self {
        Self {
            range,
            split_parent,
            boundaries: DEFAULT_SPLIT_BOUNDARIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn with_boundaries(mut self, boundaries: Vec<String>) -> Self {
        self.boundaries = boundaries;
        self
    }

    /// Elements that splitting at `pos` would cut in two, innermost first.
    fn chain(&self, doc: &Document, pos: Position) -> Result<Vec<NodeId>, Error> {
        let resolved = doc.resolve(pos)?;
        if !self.split_parent {
            return Ok(Vec::new());
        }
        let mut chain = Vec::new();
        let mut node = resolved.parent;
        while node != pos.root() {
            let element = doc.element(node).ok_or(Error::NotAnElement { node })?;
            if self.boundaries.iter().any(|b| *b == element.tag) {
                break;
            }
            if !element.is_splittable() {
                return Err(Error::NotSplittable { node });
            }
            chain.push(node);
            node = doc.parent(node).ok_or(Error::NoParent { node })?;
        }
        Ok(chain)
    }

    fn split_at(
        &self,
        doc: &mut Document,
        pos: Position,
        created: &mut Vec<NodeId>,
    ) -> Result<RangeMapper, Error> {
        let chain = self.chain(doc, pos)?;
        split_text_at(doc, pos)?;

        let mut mapper = RangeMapper::identity();
        let mut cur = pos;
        for node in chain {
            let resolved = doc.resolve(cur)?;
            if resolved.parent != node {
                return Err(Error::Internal {
                    message: format!("split point {cur} left {node}"),
                });
            }
            created.push(doc.split_element(node, resolved.index)?);
            mapper.push(StepMap::insertion(cur, 2));
            cur = cur.shifted(1);
        }
        Ok(mapper)
    }
}

impl Operation for SplitOperation {
    fn kind(&self) -> ChangeKind {
        ChangeKind::Split
    }

    fn range(&self) -> Range {
        self.range
    }

    fn execute(self, doc: &mut Document) -> Result<OperationOutcome, Error> {
        tracing::debug!(range = %self.range, split_parent = self.split_parent, "split");
        // Both chains are checked up front so a failure leaves the tree alone.
        self.chain(doc, self.range.start)?;
        self.chain(doc, self.range.end)?;

        let mut created = Vec::new();
        let mapper = if self.range.is_collapsed() {
            self.split_at(doc, self.range.start, &mut created)?
        } else {
            let end_mapper = self.split_at(doc, self.range.end, &mut created)?;
            let start = end_mapper.map_position(self.range.start, Bias::Left);
            let start_mapper = self.split_at(doc, start, &mut created)?;
            end_mapper.then(&start_mapper)
        };

        let range = if self.range.is_collapsed() {
            Range::collapsed(mapper.map_position(self.range.start, Bias::Right))
        } else {
            Range::new(
                mapper.map_position(self.range.start, Bias::Right),
                mapper.map_position(self.range.end, Bias::Left),
            )
        };
        Ok(OperationOutcome {
            range,
            mapper,
            inserted_nodes: created,
            overwritten_nodes: Vec::new(),
            mark_check_nodes: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fragment;
    use crate::rdfa::attrs::{LiteralAttrs, RdfaAttrs};

    // <div><p>ab<em>cd</em></p></div>
    fn sample() -> Document {
        let mut doc = Document::empty();
        let p = doc.instantiate(
            &Fragment::element("p")
                .with_child(Fragment::text("ab"))
                .with_child(Fragment::element("em").with_child(Fragment::text("cd"))),
        );
        doc.insert_children(doc.root(), 0, &[p]).unwrap();
        doc
    }

    #[test]
    fn text_split_keeps_offsets() {
        let mut doc = sample();
        let outcome = SplitOperation::new(Range::between(2, 2), false)
            .execute(&mut doc)
            .unwrap();
        assert!(outcome.mapper.is_identity());
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.children(p).len(), 3);
    }

    #[test]
    fn parent_split_stops_at_boundary() {
        let mut doc = sample();
        // inside "cd", between c and d
        let outcome = SplitOperation::new(Range::between(5, 5), true)
            .execute(&mut doc)
            .unwrap();
        // em and p are both split, the root div is a boundary
        assert_eq!(doc.children(doc.root()).len(), 2);
        assert_eq!(outcome.inserted_nodes.len(), 2);
        assert_eq!(doc.content_size(doc.root()), 8 + 4);
        // the cursor lands at the start of the right half of em
        assert_eq!(outcome.range, Range::between(9, 9));
        let right_p = doc.children(doc.root())[1];
        assert_eq!(doc.text_content(right_p), "d");
    }

    #[test]
    fn ranges_split_end_first() {
        let mut doc = sample();
        let outcome = SplitOperation::new(Range::between(2, 5), true)
            .execute(&mut doc)
            .unwrap();
        let texts: Vec<String> = doc
            .children(doc.root())
            .iter()
            .map(|&p| doc.text_content(p))
            .collect();
        assert_eq!(texts, ["a", "bc", "d"]);
        assert_eq!(doc.text_in_range(&outcome.range).unwrap(), "bc");
    }

    #[test]
    fn non_splittable_elements_are_fatal() {
        let mut doc = sample();
        let p = doc.children(doc.root())[0];
        doc.element_mut(p).unwrap().rdfa = Some(RdfaAttrs::Literal(LiteralAttrs::new("lit")));
        let before = doc.snapshot(doc.root()).unwrap();
        let result = SplitOperation::new(Range::between(2, 2), true).execute(&mut doc);
        assert!(matches!(result, Err(Error::NotSplittable { node }) if node == p));
        assert_eq!(doc.snapshot(doc.root()).unwrap(), before);
    }
}
