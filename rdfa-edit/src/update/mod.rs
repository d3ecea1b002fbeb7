//! Turning a selection plus a change spec into tree edits.
//!
//! The engine picks a [`Strategy`] with [`new_context_heuristic`], carries it
//! out inside the caller's [`Transaction`] and then applies the relative
//! insertions (`before`, `after`, `append`, `prepend`) to the nodes the
//! strategy produced. Shapes it cannot handle are logged and left alone.

use crate::Error;
use crate::config::EditorConfig;
use crate::model::NodeId;
use crate::sanitize::Sanitizer;
use crate::transaction::Transaction;

pub mod attributes;
pub mod heuristic;
pub mod selection;
pub mod spec;
mod strategies;

pub use heuristic::new_context_heuristic;
pub use selection::{SelectedNode, Selection};
pub use spec::{AttrMap, AttrValue, RdfaKey, RegexValue, RemovalPattern, Strategy, UpdateSpec};

/// What an update did. `strategy` is `None` when the request was rejected
/// as a no-op.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub strategy: Option<Strategy>,
    /// The context nodes after the edit: updated nodes, new wrappers, new
    /// containers or the replacement content.
    pub nodes: Vec<NodeId>,
}

impl UpdateReport {
    fn skipped() -> Self {
        Self::default()
    }
}

pub struct UpdateEngine<'a> {
    config: &'a EditorConfig,
    sanitizer: &'a dyn Sanitizer,
}

impl<'a> UpdateEngine<'a> {
    pub fn new(config: &'a EditorConfig, sanitizer: &'a dyn Sanitizer) -> Self {
        Self { config, sanitizer }
    }

    pub fn run(
        &self,
        tx: &mut Transaction<'_>,
        selection: &Selection,
        spec: &UpdateSpec,
        force: Option<Strategy>,
    ) -> Result<UpdateReport, Error> {
        let removals = spec.removals()?;
        if selection.is_empty() {
            tracing::warn!("update requested on an empty selection");
            return Ok(UpdateReport::skipped());
        }

        let strategy = new_context_heuristic(tx.doc(), selection, spec, force);
        tracing::debug!(?strategy, desc = spec.desc.as_deref(), "running update");
        let nodes = match strategy {
            Strategy::Replace => self.replace(tx, selection, spec)?,
            Strategy::Wrap if selection.is_highlight() => {
                self.wrap_highlight(tx, selection, spec)?
            }
            Strategy::Wrap => self.wrap_nodes(tx, selection, spec)?,
            Strategy::Nest => self.nest(tx, selection, spec)?,
            Strategy::Update => self.update_in_place(tx, selection, spec, &removals)?,
        };
        let Some(nodes) = nodes else {
            return Ok(UpdateReport::skipped());
        };

        self.insert_relative(tx, &nodes, spec)?;
        Ok(UpdateReport {
            strategy: Some(strategy),
            nodes,
        })
    }
}
