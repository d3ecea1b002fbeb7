//! Atomic tree mutators.
//!
//! An operation is a value describing an edit. Executing it mutates the
//! [`Document`] and yields an [`OperationOutcome`] whose [`RangeMapper`]
//! carries positions from before the edit to after it. Operations check
//! their preconditions before touching the tree; an `Err` means nothing was
//! changed.

use crate::Error;
use crate::events::ChangeKind;
use crate::mapping::{RangeMapper, StepMap};
use crate::model::{Document, Fragment, NodeId};
use crate::position::{Position, Range};

mod insert;
mod mark;
mod move_range;
mod remove;
mod split;

pub use insert::{InsertOperation, InsertTextOperation};
pub use mark::{DEFAULT_PLACEHOLDER, MarkAction, MarkOperation};
pub use move_range::MoveOperation;
pub use remove::RemoveOperation;
pub use split::{DEFAULT_SPLIT_BOUNDARIES, SplitOperation};

pub trait Operation {
    fn kind(&self) -> ChangeKind;

    /// The range this operation targets, in pre-edit coordinates.
    fn range(&self) -> Range;

    fn target(&self) -> Option<Position> {
        None
    }

    fn execute(self, doc: &mut Document) -> Result<OperationOutcome, Error>;
}

#[derive(Clone, Debug)]
pub struct OperationOutcome {
    /// Selection to use once the edit is applied.
    pub range: Range,
    pub mapper: RangeMapper,
    pub inserted_nodes: Vec<NodeId>,
    pub overwritten_nodes: Vec<Fragment>,
    /// Nodes next to the edit that may now be mergeable with a neighbour.
    pub mark_check_nodes: Vec<NodeId>,
}

impl OperationOutcome {
    pub(crate) fn unchanged(range: Range) -> Self {
        Self {
            range,
            mapper: RangeMapper::identity(),
            inserted_nodes: Vec::new(),
            overwritten_nodes: Vec::new(),
            mark_check_nodes: Vec::new(),
        }
    }
}

/// Splits the text node under `pos`, if there is one, and returns the parent
/// element and the child index the position now sits before. Absolute
/// offsets are not affected by text splits.
pub(crate) fn split_text_at(doc: &mut Document, pos: Position) -> Result<(NodeId, usize), Error> {
    let resolved = doc.resolve(pos)?;
    match resolved.text {
        Some((text, offset)) => {
            doc.split_text(text, offset)?;
            Ok((resolved.parent, resolved.index + 1))
        }
        None => Ok((resolved.parent, resolved.index)),
    }
}

/// The siblings directly around a run of adjacent nodes.
pub(crate) fn neighbours(doc: &Document, ids: &[NodeId]) -> Vec<NodeId> {
    let mut out = Vec::new();
    if let Some(before) = ids.first().and_then(|&id| doc.previous_sibling(id)) {
        out.push(before);
    }
    if let Some(after) = ids.last().and_then(|&id| doc.next_sibling(id)) {
        out.push(after);
    }
    out
}

#[derive(Debug, Default)]
pub(crate) struct Removed {
    pub mapper: RangeMapper,
    pub overwritten: Vec<Fragment>,
    pub mark_check: Vec<NodeId>,
}

fn remove_confined(doc: &mut Document, range: &Range, removed: &mut Removed) -> Result<(), Error> {
    let (parent, from) = split_text_at(doc, range.start)?;
    let (end_parent, to) = split_text_at(doc, range.end)?;
    if parent != end_parent {
        return Err(Error::Internal {
            message: format!("range {range} is not confined"),
        });
    }

    let ids = doc.children(parent)[from..to].to_vec();
    let mut overwritten = Vec::with_capacity(ids.len());
    for id in ids {
        overwritten.push(doc.discard(id)?);
    }
    removed.overwritten.splice(0..0, overwritten);

    let children = doc.children(parent);
    if let Some(&before) = from.checked_sub(1).and_then(|i| children.get(i)) {
        removed.mark_check.push(before);
    }
    if let Some(&after) = children.get(from) {
        removed.mark_check.push(after);
    }
    removed.mapper.push(StepMap::deletion(range));
    Ok(())
}

/// Deletes the content of an arbitrary range. The range is decomposed into
/// confined pieces which are removed last to first, so earlier pieces keep
/// their coordinates.
pub(crate) fn remove_range(doc: &mut Document, range: &Range) -> Result<Removed, Error> {
    let pieces = doc.minimum_confined_ranges(range)?;
    let mut removed = Removed::default();
    for piece in pieces.iter().rev() {
        remove_confined(doc, piece, &mut removed)?;
    }
    Ok(removed)
}

/// Inserts fragments at `pos`, returning the new node ids and the step.
pub(crate) fn insert_at(
    doc: &mut Document,
    pos: Position,
    fragments: &[Fragment],
) -> Result<(Vec<NodeId>, StepMap), Error> {
    let (parent, index) = split_text_at(doc, pos)?;
    let ids: Vec<NodeId> = fragments.iter().map(|f| doc.instantiate(f)).collect();
    doc.insert_children(parent, index, &ids)?;
    let size = fragments.iter().map(Fragment::size).sum();
    Ok((ids, StepMap::insertion(pos, size)))
}
