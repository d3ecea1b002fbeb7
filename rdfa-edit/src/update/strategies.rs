use crate::Error;
use crate::mapping::{Bias, RangeMapper};
use crate::model::html::parse_fragment;
use crate::model::{Document, Element, Fragment, NodeId};
use crate::operations::{InsertOperation, MoveOperation, SplitOperation};
use crate::position::{Position, Range};
use crate::transaction::Transaction;

use super::UpdateEngine;
use super::attributes::{apply_removals, apply_values};
use super::selection::Selection;
use super::spec::{AttrMap, RdfaKey, RemovalPattern, UpdateSpec};

/// Attributes that chain a subject to its object and follow the wrapper.
const CHAINING_ATTRS: &[&str] = &["rel", "rev"];

#[derive(Clone, Copy, Debug)]
enum Placement {
    Before,
    After,
    Prepend,
    Append,
}

fn inner_html(map: Option<&AttrMap>) -> Option<String> {
    map?.get(&RdfaKey::InnerHtml)?.as_text()
}

fn covers(range: &Range, start: Position, end: Position) -> bool {
    range.start <= start && end <= range.end
}

/// Whole nodes inside `range`, top-most first, one run per confined piece.
fn covered_nodes(doc: &Document, range: &Range) -> Result<Vec<NodeId>, Error> {
    let mut out = Vec::new();
    for piece in doc.minimum_confined_ranges(range)? {
        let resolved = doc.resolve(piece.start)?;
        for &child in &doc.children(resolved.parent)[resolved.index..] {
            if doc.node_end(child)? > piece.end {
                break;
            }
            out.push(child);
        }
    }
    Ok(out)
}

/// Raises each selected leaf to its highest ancestor whose content lies
/// inside `range`. The flag is false for leaves only partly covered.
fn lift(
    doc: &Document,
    selection: &Selection,
    range: &Range,
) -> Result<Vec<(NodeId, bool)>, Error> {
    let mut lifted: Vec<(NodeId, bool)> = Vec::new();
    for leaf in selection.nodes() {
        let full = covers(range, doc.node_start(leaf)?, doc.node_end(leaf)?);
        let mut node = leaf;
        if full {
            while let Some(parent) = doc.parent(node).filter(|&p| p != doc.root()) {
                if !covers(range, doc.content_start(parent)?, doc.content_end(parent)?) {
                    break;
                }
                node = parent;
            }
        }
        if !lifted.iter().any(|&(id, _)| id == node) {
            lifted.push((node, full));
        }
    }
    Ok(lifted)
}

impl UpdateEngine<'_> {
    fn sanitized(&self, html: &str) -> Result<Vec<Fragment>, Error> {
        let clean = self.sanitizer.sanitize(
            html,
            &self.config.allowed_tags,
            &self.config.allowed_attributes,
        );
        parse_fragment(&clean)
    }

    /// A fresh element carrying the `add` and `set` attributes of `spec`.
    fn wrapper(&self, spec: &UpdateSpec) -> Option<Element> {
        let tag = spec.tag().unwrap_or_else(|| "span".to_string());
        if !self.config.allows_wrapper(&tag) {
            tracing::warn!(tag, "wrapper tag is not allowed");
            return None;
        }
        let mut element = Element::new(tag.to_ascii_lowercase());
        if let Some(add) = &spec.add {
            apply_values(&mut element, add, false);
        }
        if let Some(set) = &spec.set {
            apply_values(&mut element, set, true);
        }
        Some(element)
    }

    /// Inserts an empty element at `at` and returns its id.
    fn insert_element(
        &self,
        tx: &mut Transaction<'_>,
        at: Position,
        element: Element,
    ) -> Result<(NodeId, RangeMapper), Error> {
        let outcome = tx.apply(InsertOperation::new(
            Range::collapsed(at),
            vec![Fragment::from_element(element)],
        ))?;
        let id = outcome
            .inserted_nodes
            .first()
            .copied()
            .ok_or_else(|| Error::Internal {
                message: format!("insertion at {at} produced no node"),
            })?;
        Ok((id, outcome.mapper))
    }

    pub(super) fn replace(
        &self,
        tx: &mut Transaction<'_>,
        selection: &Selection,
        spec: &UpdateSpec,
    ) -> Result<Option<Vec<NodeId>>, Error> {
        let range = selection.highlight_range(tx.doc())?;
        let html = inner_html(spec.set.as_ref()).unwrap_or_default();
        let content = self.sanitized(&html)?;
        if range.is_collapsed() {
            let outcome = tx.apply(InsertOperation::new(range, content))?;
            return Ok(Some(outcome.inserted_nodes));
        }

        // Splitting text leaves offsets alone, so `range` stays valid.
        tx.apply(SplitOperation::new(range, false))?;
        let candidates = covered_nodes(tx.doc(), &range)?;
        let target = candidates
            .iter()
            .position(|&id| tx.doc().text(id).is_none_or(|t| !t.is_empty()))
            .unwrap_or(0);
        let Some(&first) = candidates.get(target) else {
            let outcome = tx.apply(InsertOperation::new(range, content))?;
            return Ok(Some(outcome.inserted_nodes));
        };

        let around = tx.doc().range_around(first)?;
        let outcome = tx.apply(InsertOperation::new(around, content))?;
        for (i, &id) in candidates.iter().enumerate().rev() {
            if i == target || !tx.doc().contains(id) {
                continue;
            }
            let around = tx.doc().range_around(id)?;
            tx.apply(InsertOperation::new(around, Vec::new()))?;
        }
        Ok(Some(outcome.inserted_nodes))
    }

    pub(super) fn wrap_highlight(
        &self,
        tx: &mut Transaction<'_>,
        selection: &Selection,
        spec: &UpdateSpec,
    ) -> Result<Option<Vec<NodeId>>, Error> {
        let doc = tx.doc();
        let range = selection.highlight_range(doc)?;
        let lifted = lift(doc, selection, &range)?;
        let (Some(&(first, first_full)), Some(&(last, last_full))) =
            (lifted.first(), lifted.last())
        else {
            tracing::warn!("highlight covers no content");
            return Ok(None);
        };
        let parent = doc.parent(first);
        if lifted.iter().any(|&(id, _)| doc.parent(id) != parent) {
            tracing::warn!(%range, "highlight spans several parents, not wrapping");
            return Ok(None);
        }
        let Some(wrapper) = self.wrapper(spec) else {
            return Ok(None);
        };

        let start = if first_full {
            doc.node_start(first)?
        } else {
            range.start
        };
        let end = if last_full {
            doc.node_end(last)?
        } else {
            range.end
        };
        let (id, mapper) = self.insert_element(tx, start, wrapper)?;
        let end = mapper.map_position(end, Bias::Right);
        let from = tx.doc().node_end(id)?;
        if from < end {
            let target = tx.doc().content_end(id)?;
            tx.apply(MoveOperation::new(Range::new(from, end), target))?;
        }
        Ok(Some(vec![id]))
    }

    pub(super) fn wrap_nodes(
        &self,
        tx: &mut Transaction<'_>,
        selection: &Selection,
        spec: &UpdateSpec,
    ) -> Result<Option<Vec<NodeId>>, Error> {
        let Some(template) = self.wrapper(spec) else {
            return Ok(None);
        };
        let mut wrappers = Vec::new();
        for node in selection.nodes() {
            if !tx.doc().contains(node) || tx.doc().parent(node).is_none() {
                tracing::warn!(%node, "cannot wrap a detached node or the root");
                continue;
            }
            let mut wrapper = template.clone();
            if let Some(element) = tx.doc().element(node) {
                for &name in CHAINING_ATTRS {
                    if let Some(value) = element.attr(name) {
                        wrapper.attrs.insert(name.to_string(), value.to_string());
                    }
                }
                if CHAINING_ATTRS.iter().any(|name| element.has_attr(name)) {
                    tx.update_element(node, |el| {
                        for name in CHAINING_ATTRS {
                            el.attrs.shift_remove(*name);
                        }
                        Ok(())
                    })?;
                }
            }

            let at = tx.doc().node_start(node)?;
            let (id, _) = self.insert_element(tx, at, wrapper)?;
            let around = tx.doc().range_around(node)?;
            let target = tx.doc().content_end(id)?;
            tx.apply(MoveOperation::new(around, target))?;
            wrappers.push(id);
        }
        Ok((!wrappers.is_empty()).then_some(wrappers))
    }

    pub(super) fn nest(
        &self,
        tx: &mut Transaction<'_>,
        selection: &Selection,
        spec: &UpdateSpec,
    ) -> Result<Option<Vec<NodeId>>, Error> {
        let Some(template) = self.wrapper(spec) else {
            return Ok(None);
        };
        let mut containers = Vec::new();
        for node in selection.nodes() {
            if tx.doc().element(node).is_none() {
                tracing::warn!(%node, "cannot nest inside a text node, skipping");
                continue;
            }
            let at = tx.doc().content_start(node)?;
            let (id, _) = self.insert_element(tx, at, template.clone())?;
            let from = tx.doc().node_end(id)?;
            let to = tx.doc().content_end(node)?;
            if from < to {
                let target = tx.doc().content_end(id)?;
                tx.apply(MoveOperation::new(Range::new(from, to), target))?;
            }
            containers.push(id);
        }
        Ok((!containers.is_empty()).then_some(containers))
    }

    pub(super) fn update_in_place(
        &self,
        tx: &mut Transaction<'_>,
        selection: &Selection,
        spec: &UpdateSpec,
        removals: &[(RdfaKey, RemovalPattern)],
    ) -> Result<Option<Vec<NodeId>>, Error> {
        let html = inner_html(spec.set.as_ref()).or_else(|| inner_html(spec.add.as_ref()));
        let clears_html = removals.iter().any(|(key, pattern)| {
            *key == RdfaKey::InnerHtml && matches!(pattern, RemovalPattern::All)
        });

        let mut updated = Vec::new();
        for node in selection.nodes() {
            if tx.doc().element(node).is_none() {
                tracing::warn!(%node, "attributes can only be updated on elements");
                continue;
            }
            tx.update_element(node, |element| {
                apply_removals(element, removals);
                if let Some(add) = &spec.add {
                    apply_values(element, add, false);
                }
                if let Some(set) = &spec.set {
                    apply_values(element, set, true);
                }
                Ok(())
            })?;

            let content = tx.doc().content_range(node)?;
            if let Some(html) = &html {
                tx.apply(InsertOperation::new(content, self.sanitized(html)?))?;
            } else if clears_html && !content.is_collapsed() {
                tx.apply(InsertOperation::new(content, Vec::new()))?;
            }
            updated.push(node);
        }
        Ok(Some(updated))
    }

    fn synthesize(&self, map: &AttrMap) -> Result<Option<Fragment>, Error> {
        let tag = map
            .get(&RdfaKey::Tag)
            .and_then(|v| v.as_text())
            .unwrap_or_else(|| "span".to_string());
        if !self.config.allows_wrapper(&tag) {
            tracing::warn!(tag, "element tag is not allowed");
            return Ok(None);
        }
        let mut element = Element::new(tag.to_ascii_lowercase());
        apply_values(&mut element, map, true);
        let children = match inner_html(Some(map)) {
            Some(html) => self.sanitized(&html)?,
            None => Vec::new(),
        };
        Ok(Some(Fragment::Element { element, children }))
    }

    /// Creates the `before`/`after`/`prepend`/`append` elements around
    /// each resulting node.
    pub(super) fn insert_relative(
        &self,
        tx: &mut Transaction<'_>,
        nodes: &[NodeId],
        spec: &UpdateSpec,
    ) -> Result<(), Error> {
        let placements = [
            (Placement::Before, &spec.before),
            (Placement::After, &spec.after),
            (Placement::Prepend, &spec.prepend),
            (Placement::Append, &spec.append),
        ];
        for (placement, map) in placements {
            let Some(map) = map else { continue };
            for &node in nodes {
                if !tx.doc().contains(node) {
                    continue;
                }
                let is_element = tx.doc().element(node).is_some();
                let at = match placement {
                    Placement::Before => tx.doc().node_start(node)?,
                    Placement::After => tx.doc().node_end(node)?,
                    Placement::Prepend if is_element => tx.doc().content_start(node)?,
                    Placement::Append if is_element => tx.doc().content_end(node)?,
                    Placement::Prepend | Placement::Append => {
                        tracing::warn!(%node, ?placement, "text nodes have no content to extend");
                        continue;
                    }
                };
                let Some(fragment) = self.synthesize(map)? else {
                    continue;
                };
                tx.apply(InsertOperation::new(Range::collapsed(at), vec![fragment]))?;
            }
        }
        Ok(())
    }
}
