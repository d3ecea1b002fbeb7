use std::collections::VecDeque;

use crate::model::Document;
use crate::position::Range;

/// A document state to return to.
#[derive(Clone, Debug)]
pub struct Entry {
    pub doc: Document,
    pub selection: Option<Range>,
}

/// Undo and redo stacks of whole-document snapshots, one per transaction.
#[derive(Clone, Debug)]
pub struct History {
    undo: VecDeque<Entry>,
    redo: Vec<Entry>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    /// Records the state before an edit. New edits invalidate redo.
    pub fn record(&mut self, entry: Entry) {
        self.redo.clear();
        if self.limit == 0 {
            return;
        }
        self.undo.push_back(entry);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    pub fn undo(&mut self, current: Entry) -> Option<Entry> {
        let entry = self.undo.pop_back()?;
        self.redo.push(current);
        Some(entry)
    }

    pub fn redo(&mut self, current: Entry) -> Option<Entry> {
        let entry = self.redo.pop()?;
        self.undo.push_back(current);
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str) -> Entry {
        Entry {
            doc: Document::from_fragment(text).unwrap(),
            selection: None,
        }
    }

    #[test]
    fn limit_drops_oldest_and_new_edits_clear_redo() {
        let mut history = History::new(2);
        history.record(entry("a"));
        history.record(entry("b"));
        history.record(entry("c"));

        let back = history.undo(entry("d")).unwrap();
        assert_eq!(back.doc.text_content(back.doc.root()), "c");
        assert!(history.can_redo());
        history.undo(entry("c")).unwrap();
        assert!(!history.can_undo());

        history.record(entry("x"));
        assert!(!history.can_redo());
    }
}
