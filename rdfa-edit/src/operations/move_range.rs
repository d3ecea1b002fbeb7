use crate::Error;
use crate::events::ChangeKind;
use crate::mapping::{Bias, RangeMapper, StepMap};
use crate::model::{Document, NodeId};
use crate::position::{Position, Range};

use super::{Operation, OperationOutcome, neighbours, split_text_at};

/// Relocates the content of `range` to `target`. Moved nodes keep their ids.
#[derive(Clone, Debug)]
pub struct MoveOperation {
    pub range: Range,
    pub target: Position,
}

impl MoveOperation {
    pub fn new(range: Range, target: Position) -> Self {
        Self { range, target }
    }
}

impl Operation for MoveOperation {
    fn kind(&self) -> ChangeKind {
        ChangeKind::Move
    }

    fn range(&self) -> Range {
        self.range
    }

    fn target(&self) -> Option<Position> {
        Some(self.target)
    }

    fn execute(self, doc: &mut Document) -> Result<OperationOutcome, Error> {
        tracing::debug!(range = %self.range, target = %self.target, "move");
        if self.target.root() != self.range.root() {
            return Err(Error::DifferentRoots);
        }
        if self.range.strictly_contains(self.target) {
            return Err(Error::MoveIntoSelf {
                start: self.range.start.offset(),
                end: self.range.end.offset(),
                target: self.target.offset(),
            });
        }
        doc.resolve(self.target)?;
        let pieces = doc.minimum_confined_ranges(&self.range)?;
        if pieces.is_empty() {
            return Ok(OperationOutcome::unchanged(Range::collapsed(self.target)));
        }

        let mut groups: Vec<Vec<NodeId>> = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            let (parent, from) = split_text_at(doc, piece.start)?;
            let (_, to) = split_text_at(doc, piece.end)?;
            groups.push(doc.children(parent)[from..to].to_vec());
        }

        let mut mapper = RangeMapper::identity();
        let mut mark_check = Vec::new();
        for (piece, ids) in pieces.iter().zip(&groups).rev() {
            mark_check.extend(neighbours(doc, ids));
            for &id in ids {
                doc.detach(id)?;
            }
            mapper.push(StepMap::deletion(piece));
        }

        let moved: Vec<NodeId> = groups.into_iter().flatten().collect();
        let size: usize = moved.iter().map(|&id| doc.node_size(id)).sum();
        let at = mapper.map_position(self.target, Bias::Left);
        let (parent, index) = split_text_at(doc, at)?;
        doc.insert_children(parent, index, &moved)?;
        mapper.push(StepMap::insertion(at, size));

        mark_check.extend(neighbours(doc, &moved));
        mark_check.extend(moved.iter().copied());
        mark_check.retain(|&id| doc.contains(id));

        Ok(OperationOutcome {
            range: Range::new(at, at.shifted(size)),
            mapper,
            inserted_nodes: moved,
            overwritten_nodes: Vec::new(),
            mark_check_nodes: mark_check,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fragment;

    // <div><p>ab</p><p>cd</p></div>
    fn sample() -> Document {
        let mut doc = Document::empty();
        let ids = [
            doc.instantiate(&Fragment::element("p").with_child(Fragment::text("ab"))),
            doc.instantiate(&Fragment::element("p").with_child(Fragment::text("cd"))),
        ];
        doc.insert_children(doc.root(), 0, &ids).unwrap();
        doc
    }

    #[test]
    fn moving_into_itself_fails_without_mutation() {
        let mut doc = sample();
        let before = doc.snapshot(doc.root()).unwrap();
        let result = MoveOperation::new(Range::between(0, 8), Position::new(5)).execute(&mut doc);
        assert!(matches!(result, Err(Error::MoveIntoSelf { target: 5, .. })));
        assert_eq!(doc.snapshot(doc.root()).unwrap(), before);
    }

    #[test]
    fn moves_content_and_keeps_ids() {
        let mut doc = sample();
        let first = doc.children(doc.root())[0];
        // move the first paragraph to the end
        let outcome = MoveOperation::new(Range::between(0, 4), Position::new(8))
            .execute(&mut doc)
            .unwrap();
        assert_eq!(doc.text_content(doc.root()), "cdab");
        assert_eq!(doc.children(doc.root())[1], first);
        assert_eq!(outcome.range, Range::between(4, 8));
        // "c" sat at 5 and now sits at 1
        assert_eq!(outcome.mapper.map(Position::new(5)), Position::new(1));
    }

    #[test]
    fn moving_nothing_collapses_at_target() {
        let mut doc = sample();
        let outcome = MoveOperation::new(Range::between(2, 2), Position::new(6))
            .execute(&mut doc)
            .unwrap();
        assert_eq!(outcome.range, Range::between(6, 6));
        assert!(outcome.mapper.is_identity());
    }
}
