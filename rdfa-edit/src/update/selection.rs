use crate::Error;
use crate::mapping::{Bias, RangeMapper};
use crate::model::{Document, NodeId};
use crate::position::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectedNode {
    pub node: NodeId,
    pub range: Range,
}

/// What the update engine acts on: matched nodes, and for a highlight the
/// character range over the document text that was selected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub selections: Vec<SelectedNode>,
    pub highlight: Option<(usize, usize)>,
}

impl Selection {
    /// A context selection of whole nodes.
    pub fn of_nodes(doc: &Document, nodes: &[NodeId]) -> Result<Self, Error> {
        let selections = nodes
            .iter()
            .map(|&node| {
                Ok(SelectedNode {
                    node,
                    range: doc.range_around(node)?,
                })
            })
            .collect::<Result<_, Error>>()?;
        Ok(Self {
            selections,
            highlight: None,
        })
    }

    /// A highlight over characters `start..end` of the document text, with
    /// the leaves it overlaps.
    pub fn highlight(doc: &Document, start: usize, end: usize) -> Result<Self, Error> {
        let mut selection = Self {
            selections: Vec::new(),
            highlight: Some((start.min(end), start.max(end))),
        };
        let range = selection.highlight_range(doc)?;
        for id in doc.descendants(doc.root()) {
            if id == doc.root() || !doc.children(id).is_empty() {
                continue;
            }
            let around = doc.range_around(id)?;
            let overlaps = if range.is_collapsed() {
                around.start <= range.start && range.start <= around.end
            } else {
                around.start < range.end && range.start < around.end
            };
            if overlaps {
                selection.selections.push(SelectedNode {
                    node: id,
                    range: around,
                });
            }
        }
        Ok(selection)
    }

    pub fn is_highlight(&self) -> bool {
        self.highlight.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.selections.iter().map(|s| s.node)
    }

    /// The highlight as a document range; for context selections the span
    /// from the first to the last selected node.
    pub fn highlight_range(&self, doc: &Document) -> Result<Range, Error> {
        if let Some((start, end)) = self.highlight {
            let text = doc.text_with_mapping(&doc.content_range(doc.root())?)?;
            let at = |index: usize, bias: Bias| {
                text.position_at(index.min(text.len()), bias)
                    .ok_or(Error::PositionOutOfBounds {
                        offset: index,
                        size: text.len(),
                    })
            };
            return Ok(Range::new(at(start, Bias::Right)?, at(end, Bias::Left)?));
        }
        let first = self.selections.first().map(|s| s.range);
        let last = self.selections.last().map(|s| s.range);
        match (first, last) {
            (Some(first), Some(last)) => Ok(Range::new(first.start, last.end)),
            _ => doc.content_range(doc.root()).map(|r| r.collapse(true)),
        }
    }

    /// Carries node ranges through an edit; nodes that no longer exist are
    /// dropped.
    pub fn map(&self, doc: &Document, mapper: &RangeMapper) -> Self {
        Self {
            selections: self
                .selections
                .iter()
                .filter(|s| doc.contains(s.node))
                .map(|s| SelectedNode {
                    node: s.node,
                    range: mapper.map_range(&s.range),
                })
                .collect(),
            highlight: self.highlight,
        }
    }
}
