//! One editing session over one document.
//!
//! The [`Editor`] owns the document together with everything that has to
//! follow it across edits: the content-changed bus, the cached RDFa index,
//! the re-index scheduler, the highlight registry, the selection and the
//! undo history. All edits go through [`Editor::transact`], which applies a
//! group of operations atomically: on error the document is restored as it
//! was before the group began.

use std::cell::OnceCell;
use std::fmt;

use crate::Error;
use crate::commands;
use crate::config::EditorConfig;
use crate::events::{ContentChanged, EventBus};
use crate::mapping::RangeMapper;
use crate::model::{Document, NodeId};
use crate::operations::{Operation, OperationOutcome};
use crate::position::Range;
use crate::rdfa::attrs::OutgoingTriple;
use crate::rdfa::{RdfaGraph, extract};
use crate::sanitize::{AllowListSanitizer, Sanitizer};
use crate::transaction::Transaction;
use crate::update::{Selection, Strategy, UpdateEngine, UpdateReport, UpdateSpec};

mod highlights;
mod history;
mod scheduler;

pub use highlights::{Highlight, HighlightId, HighlightRegistry};
pub use history::{Entry, History};
pub use scheduler::{ReindexScheduler, Ticket};

pub struct Editor {
    doc: Document,
    config: EditorConfig,
    events: EventBus,
    selection: Option<Range>,
    index: OnceCell<RdfaGraph>,
    scheduler: ReindexScheduler,
    highlights: HighlightRegistry,
    history: History,
    sanitizer: Box<dyn Sanitizer>,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("events", &self.events)
            .field("indexed", &self.index.get().is_some())
            .finish_non_exhaustive()
    }
}

impl Editor {
    pub fn new(doc: Document, config: EditorConfig) -> Self {
        let history = History::new(config.history_limit);
        Self {
            doc,
            config,
            events: EventBus::new(),
            selection: None,
            index: OnceCell::new(),
            scheduler: ReindexScheduler::new(),
            highlights: HighlightRegistry::new(),
            history,
            sanitizer: Box::new(AllowListSanitizer),
        }
    }

    pub fn from_html(html: &str, config: EditorConfig) -> Result<Self, Error> {
        Ok(Self::new(Document::from_html(html)?, config))
    }

    pub fn with_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.sanitizer = Box::new(sanitizer);
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> Option<Range> {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Option<Range>) {
        self.selection = selection;
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn highlights(&self) -> &HighlightRegistry {
        &self.highlights
    }

    pub fn highlights_mut(&mut self) -> &mut HighlightRegistry {
        &mut self.highlights
    }

    pub fn scheduler(&self) -> &ReindexScheduler {
        &self.scheduler
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// The RDFa index of the current document, built on first access after
    /// a change.
    pub fn index(&self) -> Result<&RdfaGraph, Error> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        let graph = extract(&self.doc, &self.config.processor)?;
        Ok(self.index.get_or_init(|| graph))
    }

    /// Runs the pending re-index, if any. Returns whether a fresh index was
    /// stored.
    pub fn flush_reindex(&mut self) -> Result<bool, Error> {
        let Some(ticket) = self.scheduler.begin() else {
            return Ok(false);
        };
        let graph = extract(&self.doc, &self.config.processor)?;
        if !self.scheduler.complete(ticket) {
            return Ok(false);
        }
        self.index = OnceCell::from(graph);
        Ok(true)
    }

    fn run<T>(
        &mut self,
        f: impl FnOnce(&mut Transaction<'_>, &EditorConfig, &dyn Sanitizer) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let before = self.doc.clone();
        let mut tx = Transaction::new(&mut self.doc);
        let result = f(&mut tx, &self.config, self.sanitizer.as_ref())
            .and_then(|value| Ok((value, tx.finish()?)));
        match result {
            Ok((value, (mapper, events))) => {
                if !events.is_empty() {
                    self.commit(before, &mapper, &events);
                }
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(%err, "transaction failed, restoring document");
                self.doc = before;
                Err(err)
            }
        }
    }

    fn commit(&mut self, before: Document, mapper: &RangeMapper, events: &[ContentChanged]) {
        self.history.record(Entry {
            doc: before,
            selection: self.selection,
        });
        self.index.take();
        self.scheduler.request();
        self.highlights.map(mapper);
        self.selection = self.selection.map(|range| mapper.map_range(&range));
        for event in events {
            self.events.emit(event);
        }
    }

    /// Applies a group of operations and commands as one edit.
    pub fn transact<T>(
        &mut self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.run(|tx, _, _| f(tx))
    }

    pub fn apply(&mut self, op: impl Operation) -> Result<OperationOutcome, Error> {
        self.transact(|tx| tx.apply(op))
    }

    pub fn update(
        &mut self,
        selection: &Selection,
        spec: &UpdateSpec,
        force: Option<Strategy>,
    ) -> Result<UpdateReport, Error> {
        self.run(|tx, config, sanitizer| {
            UpdateEngine::new(config, sanitizer).run(tx, selection, spec, force)
        })
    }

    pub fn add_property(&mut self, subject: &str, triple: OutgoingTriple) -> Result<bool, Error> {
        self.transact(|tx| commands::add_property(tx, subject, triple))
    }

    pub fn remove_property(&mut self, subject: &str, index: usize) -> Result<bool, Error> {
        self.transact(|tx| commands::remove_property(tx, subject, index))
    }

    pub fn remove_property_by_value(
        &mut self,
        subject: &str,
        triple: &OutgoingTriple,
    ) -> Result<bool, Error> {
        self.transact(|tx| commands::remove_property_by_value(tx, subject, triple))
    }

    pub fn remove_backlink(&mut self, target: NodeId, index: usize) -> Result<bool, Error> {
        self.transact(|tx| commands::remove_backlink(tx, target, index))
    }

    fn restore(&mut self, entry: Entry) {
        self.doc = entry.doc;
        self.selection = entry.selection;
        self.index.take();
        self.scheduler.request();
    }

    pub fn undo(&mut self) -> bool {
        let current = Entry {
            doc: self.doc.clone(),
            selection: self.selection,
        };
        match self.history.undo(current) {
            Some(entry) => {
                self.restore(entry);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = Entry {
            doc: self.doc.clone(),
            selection: self.selection,
        };
        match self.history.redo(current) {
            Some(entry) => {
                self.restore(entry);
                true
            }
            None => false,
        }
    }

    pub fn to_html(&self) -> Result<String, Error> {
        self.doc.to_html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeKind;
    use crate::operations::{InsertTextOperation, MoveOperation};
    use crate::position::Position;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn editor(html: &str) -> Editor {
        Editor::new(Document::from_fragment(html).unwrap(), EditorConfig::default())
    }

    #[test]
    fn failed_transactions_leave_the_document_alone() {
        let mut editor = editor("<p>abc</p><p>def</p>");
        let before = editor.to_html().unwrap();
        let result = editor.transact(|tx| {
            tx.apply(InsertTextOperation::new(Range::between(1, 1), "x"))?;
            tx.apply(MoveOperation::new(Range::between(0, 6), Position::new(2)))
        });
        assert!(matches!(result, Err(Error::MoveIntoSelf { .. })));
        assert_eq!(editor.to_html().unwrap(), before);
        assert!(!editor.can_undo());
    }

    #[test]
    fn commits_notify_listeners_and_remap_state() {
        let mut editor = editor("<p>abc</p>");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        editor
            .events_mut()
            .subscribe(move |event| sink.borrow_mut().push(event.kind));
        editor.set_selection(Some(Range::between(2, 3)));
        let highlight = editor.highlights_mut().add(Range::between(3, 4), "hl");

        editor
            .apply(InsertTextOperation::new(Range::between(1, 1), "xy"))
            .unwrap();

        assert_eq!(*seen.borrow(), [ChangeKind::Insert]);
        assert_eq!(editor.selection(), Some(Range::between(4, 5)));
        assert_eq!(
            editor.highlights().get(highlight).unwrap().range,
            Range::between(5, 6)
        );
        assert!(editor.scheduler().is_pending());
    }

    #[test]
    fn index_is_rebuilt_after_changes() {
        let mut editor = editor(r#"<p about="http://ex/1" property="http://ex/name">Al</p>"#);
        assert_eq!(editor.index().unwrap().graph().len(), 1);

        editor
            .apply(InsertTextOperation::new(Range::between(3, 3), "ice"))
            .unwrap();
        let graph = editor.index().unwrap().graph();
        assert_eq!(graph.len(), 1);
        assert!(graph.iter().any(|t| t.to_string().contains("\"Alice\"")));

        assert!(editor.flush_reindex().unwrap());
        assert!(!editor.flush_reindex().unwrap());
    }

    #[test]
    fn undo_and_redo_restore_snapshots() {
        let mut editor = editor("<p>ab</p>");
        editor
            .apply(InsertTextOperation::new(Range::between(3, 3), "c"))
            .unwrap();
        assert_eq!(editor.to_html().unwrap(), "<div><p>abc</p></div>");

        assert!(editor.undo());
        assert_eq!(editor.to_html().unwrap(), "<div><p>ab</p></div>");
        assert!(editor.redo());
        assert_eq!(editor.to_html().unwrap(), "<div><p>abc</p></div>");
        assert!(!editor.redo());
    }
}
