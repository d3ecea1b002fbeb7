use crate::Error;
use crate::events::ChangeKind;
use crate::mapping::Bias;
use crate::model::Document;
use crate::position::Range;

use super::{Operation, OperationOutcome, remove_range};

#[derive(Clone, Debug)]
pub struct RemoveOperation {
    pub range: Range,
}

impl RemoveOperation {
    pub fn new(range: Range) -> Self {
        Self { range }
    }
}

impl Operation for RemoveOperation {
    fn kind(&self) -> ChangeKind {
        ChangeKind::Remove
    }

    fn range(&self) -> Range {
        self.range
    }

    fn execute(self, doc: &mut Document) -> Result<OperationOutcome, Error> {
        tracing::debug!(range = %self.range, "remove");
        if self.range.is_collapsed() {
            doc.resolve(self.range.start)?;
            return Ok(OperationOutcome::unchanged(self.range));
        }
        let removed = remove_range(doc, &self.range)?;
        let at = removed.mapper.map_position(self.range.start, Bias::Left);
        Ok(OperationOutcome {
            range: Range::collapsed(at),
            mapper: removed.mapper,
            inserted_nodes: Vec::new(),
            overwritten_nodes: removed.overwritten,
            mark_check_nodes: removed
                .mark_check
                .into_iter()
                .filter(|&id| doc.contains(id))
                .collect(),
        })
    }
}
