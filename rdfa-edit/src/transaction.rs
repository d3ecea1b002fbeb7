//! Grouping operations into one edit.
//!
//! A [`Transaction`] borrows the document mutably for its lifetime, applies
//! operations one after another and accumulates their mappers and events.
//! Text merging around edits is deferred to [`Transaction::finish`], so node
//! ids handed out by earlier steps stay valid for later ones.

use crate::Error;
use crate::events::{ChangeKind, ContentChanged};
use crate::mapping::RangeMapper;
use crate::model::{Document, Element, NodeId};
use crate::operations::{Operation, OperationOutcome};
use crate::rdfa::attrs::RdfaAttrs;
use crate::rdfa::projection::sync_element;

pub struct Transaction<'d> {
    doc: &'d mut Document,
    mapper: RangeMapper,
    events: Vec<ContentChanged>,
    merge_candidates: Vec<NodeId>,
}

impl<'d> Transaction<'d> {
    pub fn new(doc: &'d mut Document) -> Self {
        Self {
            doc,
            mapper: RangeMapper::identity(),
            events: Vec::new(),
            merge_candidates: Vec::new(),
        }
    }

    pub fn doc(&self) -> &Document {
        self.doc
    }

    pub fn apply(&mut self, op: impl Operation) -> Result<OperationOutcome, Error> {
        let kind = op.kind();
        let old_range = op.range();
        let target_position = op.target();
        let outcome = op.execute(self.doc)?;

        self.mapper.append(&outcome.mapper);
        self.merge_candidates
            .extend(outcome.mark_check_nodes.iter().copied());
        self.events.push(ContentChanged {
            kind,
            old_range,
            new_range: outcome.range,
            inserted_nodes: outcome.inserted_nodes.clone(),
            overwritten_nodes: outcome.overwritten_nodes.clone(),
            mark_check_nodes: outcome.mark_check_nodes.clone(),
            target_position,
        });
        Ok(outcome)
    }

    /// Mutates the attributes of an element in place. The closure sees raw
    /// attributes; the RDFa role, if any, is left as it is.
    pub fn update_element<T>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Element) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let range = self.doc.range_around(id)?;
        let element = self
            .doc
            .element_mut(id)
            .ok_or(Error::NotAnElement { node: id })?;
        let value = f(element)?;
        self.push_attribute_event(id, range);
        Ok(value)
    }

    /// Mutates the RDFa role of an element and re-projects its attributes.
    /// Returns `None` when the element has no role.
    pub fn update_role<T>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut RdfaAttrs) -> T,
    ) -> Result<Option<T>, Error> {
        let range = self.doc.range_around(id)?;
        let element = self
            .doc
            .element_mut(id)
            .ok_or(Error::NotAnElement { node: id })?;
        let Some(rdfa) = element.rdfa.as_mut() else {
            return Ok(None);
        };
        let value = f(rdfa);
        sync_element(element)?;
        self.push_attribute_event(id, range);
        Ok(Some(value))
    }

    fn push_attribute_event(&mut self, id: NodeId, range: crate::position::Range) {
        self.events.push(ContentChanged {
            kind: ChangeKind::Attributes,
            old_range: range,
            new_range: range,
            inserted_nodes: Vec::new(),
            overwritten_nodes: Vec::new(),
            mark_check_nodes: vec![id],
            target_position: None,
        });
    }

    /// Mapper from the document as it was when the transaction began.
    pub fn mapper(&self) -> &RangeMapper {
        &self.mapper
    }

    pub fn events(&self) -> &[ContentChanged] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Merges text runs the edits left mergeable and hands back the mapper
    /// and events. Merging never moves offsets.
    pub fn finish(self) -> Result<(RangeMapper, Vec<ContentChanged>), Error> {
        for id in self.merge_candidates {
            if self.doc.contains(id) {
                self.doc.merge_around(id)?;
            }
        }
        Ok((self.mapper, self.events))
    }
}
