use std::collections::BTreeMap;

use crate::Error;
use crate::events::ChangeKind;
use crate::mapping::RangeMapper;
use crate::model::{Document, Fragment, Mark, MarkSet, NodeId, Text};
use crate::position::Range;

use super::{Operation, OperationOutcome, insert_at, neighbours, split_text_at};

/// Zero-width space, inserted so a collapsed selection has something to
/// carry the requested marks.
pub const DEFAULT_PLACEHOLDER: &str = "\u{200B}";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkAction {
    Add,
    Remove,
}

impl MarkAction {
    /// Marks are matched by name: adding replaces a same-named mark.
    fn apply(self, marks: &mut MarkSet, mark: &Mark) {
        marks.retain(|m| m.name != mark.name);
        if self == MarkAction::Add {
            marks.insert(mark.clone());
        }
    }
}

#[derive(Clone, Debug)]
pub struct MarkOperation {
    pub range: Range,
    pub mark: Mark,
    pub action: MarkAction,
    pub placeholder: String,
}

impl MarkOperation {
    pub fn new(range: Range, mark: Mark, action: MarkAction) -> Self {
        Self {
            range,
            mark,
            action,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    fn execute_collapsed(self, doc: &mut Document) -> Result<OperationOutcome, Error> {
        let at = self.range.start;
        let resolved = doc.resolve(at)?;
        let inherited = match resolved.text {
            Some((text, _)) => doc.text(text).map(|t| t.marks.clone()),
            None => resolved
                .index
                .checked_sub(1)
                .map(|i| doc.children(resolved.parent)[i])
                .and_then(|prev| doc.text(prev))
                .map(|t| t.marks.clone()),
        };
        let mut marks = inherited.unwrap_or_default();
        self.action.apply(&mut marks, &self.mark);

        let placeholder = Fragment::Text(Text::with_marks(self.placeholder, marks));
        let (inserted, step) = insert_at(doc, at, &[placeholder])?;
        let mut mark_check = neighbours(doc, &inserted);
        mark_check.extend(inserted.iter().copied());
        Ok(OperationOutcome {
            range: Range::collapsed(at.shifted(step.inserted)),
            mapper: RangeMapper::from_step(step),
            inserted_nodes: inserted,
            overwritten_nodes: Vec::new(),
            mark_check_nodes: mark_check,
        })
    }
}

impl Operation for MarkOperation {
    fn kind(&self) -> ChangeKind {
        ChangeKind::Mark
    }

    fn range(&self) -> Range {
        self.range
    }

    fn execute(self, doc: &mut Document) -> Result<OperationOutcome, Error> {
        tracing::debug!(range = %self.range, mark = %self.mark.name, action = ?self.action, "mark");
        if self.range.is_collapsed() {
            return self.execute_collapsed(doc);
        }

        let pieces = doc.minimum_confined_ranges(&self.range)?;
        let mut touched = Vec::new();
        for piece in &pieces {
            let (parent, from) = split_text_at(doc, piece.start)?;
            let (_, to) = split_text_at(doc, piece.end)?;
            for &child in &doc.children(parent)[from..to] {
                touched.extend(doc.descendants(child).filter(|&id| doc.text(id).is_some()));
            }
        }

        let mut mark_check = neighbours(doc, &touched);
        mark_check.extend(touched.iter().copied());

        // Index window per parent, so merging only looks at the edited runs.
        let mut windows: BTreeMap<NodeId, (usize, usize)> = BTreeMap::new();
        for &id in &touched {
            let text = doc.text_mut(id).ok_or(Error::NotText { node: id })?;
            self.action.apply(&mut text.marks, &self.mark);
            if let (Some(parent), Some(index)) = (doc.parent(id), doc.index_in_parent(id)) {
                let window = windows.entry(parent).or_insert((index, index));
                window.0 = window.0.min(index);
                window.1 = window.1.max(index);
            }
        }
        for (parent, (min, max)) in windows {
            doc.merge_text_run(parent, min.saturating_sub(1), max + 1)?;
        }
        mark_check.retain(|&id| doc.contains(id));

        Ok(OperationOutcome {
            mark_check_nodes: mark_check,
            ..OperationOutcome::unchanged(self.range)
        })
    }
}
