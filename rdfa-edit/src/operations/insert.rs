use crate::Error;
use crate::events::ChangeKind;
use crate::mapping::Bias;
use crate::model::{Document, Fragment, MarkSet, Text};
use crate::position::Range;

use super::{Operation, OperationOutcome, Removed, insert_at, neighbours, remove_range};

/// Replaces the content of a range with a sequence of fragments. With no
/// fragments this is a removal.
#[derive(Clone, Debug)]
pub struct InsertOperation {
    pub range: Range,
    pub fragments: Vec<Fragment>,
}

impl InsertOperation {
    pub fn new(range: Range, fragments: Vec<Fragment>) -> Self {
        Self { range, fragments }
    }
}

impl Operation for InsertOperation {
    fn kind(&self) -> ChangeKind {
        if self.fragments.is_empty() {
            ChangeKind::Remove
        } else {
            ChangeKind::Insert
        }
    }

    fn range(&self) -> Range {
        self.range
    }

    fn execute(self, doc: &mut Document) -> Result<OperationOutcome, Error> {
        tracing::debug!(range = %self.range, fragments = self.fragments.len(), "insert");
        let removed = if self.range.is_collapsed() {
            doc.resolve(self.range.start)?;
            Removed::default()
        } else {
            remove_range(doc, &self.range)?
        };

        let at = removed.mapper.map_position(self.range.start, Bias::Left);
        let mut mark_check: Vec<_> = removed
            .mark_check
            .into_iter()
            .filter(|&id| doc.contains(id))
            .collect();
        if self.fragments.is_empty() {
            return Ok(OperationOutcome {
                range: Range::collapsed(at),
                mapper: removed.mapper,
                inserted_nodes: Vec::new(),
                overwritten_nodes: removed.overwritten,
                mark_check_nodes: mark_check,
            });
        }

        let (inserted, step) = insert_at(doc, at, &self.fragments)?;
        let mut mapper = removed.mapper;
        mapper.push(step);
        mark_check.extend(neighbours(doc, &inserted));
        mark_check.extend(inserted.iter().copied());

        Ok(OperationOutcome {
            range: Range::new(at, at.shifted(step.inserted)),
            mapper,
            inserted_nodes: inserted,
            overwritten_nodes: removed.overwritten,
            mark_check_nodes: mark_check,
        })
    }
}

/// Inserts a single run of text carrying `marks`, merging it into mergeable
/// neighbouring text.
#[derive(Clone, Debug)]
pub struct InsertTextOperation {
    pub range: Range,
    pub text: String,
    pub marks: MarkSet,
}

impl InsertTextOperation {
    pub fn new(range: Range, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
            marks: MarkSet::new(),
        }
    }

    pub fn with_marks(mut self, marks: MarkSet) -> Self {
        self.marks = marks;
        self
    }
}

impl Operation for InsertTextOperation {
    fn kind(&self) -> ChangeKind {
        if self.text.is_empty() {
            ChangeKind::Remove
        } else {
            ChangeKind::Insert
        }
    }

    fn range(&self) -> Range {
        self.range
    }

    fn execute(self, doc: &mut Document) -> Result<OperationOutcome, Error> {
        let fragments = if self.text.is_empty() {
            Vec::new()
        } else {
            vec![Fragment::Text(Text::with_marks(self.text, self.marks))]
        };
        let mut outcome = InsertOperation::new(self.range, fragments).execute(doc)?;
        if let Some(&inserted) = outcome.inserted_nodes.first() {
            let survivor = doc.merge_around(inserted)?;
            outcome.inserted_nodes = vec![survivor];
            outcome.mark_check_nodes.retain(|&id| doc.contains(id));
        }
        outcome.range = outcome.range.collapse(false);
        Ok(outcome)
    }
}
